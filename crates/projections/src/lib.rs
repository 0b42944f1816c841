//! Read side of the arena system.
//!
//! The projector consumes event envelopes and maintains a denormalized
//! key-value view of arenas plus secondary indexes by status and by
//! creation time. Processing is idempotent under at-least-once
//! delivery: a processed-marker keyed by event id suppresses
//! duplicates.

pub mod error;
pub mod memory;
pub mod projector;
pub mod read_repository;
pub mod read_store;
pub mod view;

pub use error::ProjectionError;
pub use memory::InMemoryReadStore;
pub use projector::ArenaProjector;
pub use read_repository::ArenaReadRepository;
pub use read_store::{ReadStore, WriteOp};
pub use view::ArenaView;
