//! Domain error types.

use thiserror::Error;

/// Errors produced by the arena aggregate.
///
/// Validation, state, and permission errors are all surfaced to the
/// caller verbatim and are never retried automatically.
#[derive(Debug, Error, PartialEq)]
pub enum ArenaError {
    /// Arena name is missing or shorter than 3 trimmed characters.
    #[error("invalid arena name")]
    InvalidName,

    /// Configuration failed one of its range checks.
    #[error("invalid arena config: {0}")]
    InvalidConfig(String),

    /// Operation requires the arena to be pending.
    #[error("arena is not pending")]
    NotPending,

    /// Operation requires the arena to be running.
    #[error("arena is not running")]
    NotRunning,

    /// Operation requires the arena to be paused.
    #[error("arena is not paused")]
    NotPaused,

    /// The arena has finished; lifecycle transitions are closed.
    #[error("arena is finished")]
    Finished,

    /// The acting player lacks the admin role.
    #[error("permission denied")]
    PermissionDenied,

    /// The player is already a participant of this arena.
    #[error("player already joined")]
    PlayerAlreadyJoined,

    /// The player is not a participant of this arena.
    #[error("player not found")]
    PlayerNotFound,

    /// An action payload failed validation against the arena config.
    #[error("invalid action payload: {0}")]
    InvalidAction(String),

    /// An action was scheduled for a tick that has already passed.
    #[error("applyAtTick {apply_at_tick} is behind current tick {current_tick}")]
    ActionTickTooOld { apply_at_tick: i64, current_tick: i64 },

    /// Rehydration received a status string outside the known set.
    #[error("invalid arena status: {0:?}")]
    InvalidStatus(String),

    /// Rehydration received a record missing required fields.
    #[error("rehydrate: missing required fields")]
    IncompleteState,
}
