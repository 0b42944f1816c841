//! Domain layer for the arena system.
//!
//! This crate provides the write-side model:
//! - The [`Arena`] aggregate and its lifecycle state machine
//! - Tagged [`ArenaEvent`] domain events with stable wire names
//! - Configuration and grid value objects with whole-config validation
//! - Participant and scheduled-action models
//!
//! The aggregate buffers the events it produces; the command handler
//! that mutated it drains them exactly once per transaction.

pub mod arena;
pub mod error;

pub use arena::{
    ActionPayload, AntibioticKind, Area, Arena, ArenaConfig, ArenaEvent, ArenaStatus, OrganismKind,
    Player, PlayerAction, PlayerRole, Point, RehydrateState, Temperature, TemperatureUnit,
};
pub use error::ArenaError;
