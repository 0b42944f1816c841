//! Write-side application layer.
//!
//! Command handlers load the arena aggregate through a unit of work,
//! apply one transition, and hand the resulting events to a publisher
//! that enqueues them in the transactional outbox. State change and
//! event enqueue commit or roll back together; nothing talks to the
//! broker from here.

pub mod error;
pub mod handler;
pub mod memory;
pub mod ports;
pub mod publisher;

pub use error::ApplicationError;
pub use handler::{CommandHandler, CreateArena, LifecycleCommand};
pub use memory::{InMemoryTx, InMemoryUnitOfWork};
pub use ports::{ArenaTx, EventPublisher, UnitOfWork};
pub use publisher::{NoopPublisher, OutboxPublisher};
