//! Transactional outbox.
//!
//! Events are enqueued in the same transaction as the state change that
//! produced them, then drained to the broker by [`OutboxRelay`]. The
//! store contract gives relays lease-based claims so several instances
//! can run without double-delivery while a lease holds; delivery to the
//! broker stays at-least-once either way.

pub mod config;
pub mod error;
pub mod memory;
pub mod record;
pub mod relay;
pub mod store;

pub use config::RelayConfig;
pub use error::OutboxError;
pub use memory::InMemoryOutboxStore;
pub use record::{DeadLetterRecord, NewOutboxRecord, OutboxRecord, OutboxStatus};
pub use relay::OutboxRelay;
pub use store::OutboxStore;
