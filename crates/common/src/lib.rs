//! Shared types for the arena system.
//!
//! This crate provides the identifier newtypes used across the write
//! side, the outbox, and the read side, plus the [`Clock`] seam so that
//! business logic never reads wall time from ambient process state.

pub mod clock;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use types::{ActionId, ArenaId, EventId, PlayerId};
