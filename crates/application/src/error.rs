//! Application-layer error taxonomy.
//!
//! Domain rejections pass through unchanged so callers can map them to
//! client errors; infrastructure failures are wrapped with enough
//! context to log.

use thiserror::Error;

use common::types::ArenaId;
use domain::ArenaError;
use outbox::OutboxError;

#[derive(Debug, Error)]
pub enum ApplicationError {
    /// Input rejected before any transaction was opened.
    #[error("invalid command: {0}")]
    Validation(String),

    /// The referenced arena does not exist.
    #[error("arena not found: {0}")]
    NotFound(ArenaId),

    /// The aggregate refused the transition.
    #[error(transparent)]
    Domain(#[from] ArenaError),

    /// The write store failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The outbox could not accept the events.
    #[error(transparent)]
    Outbox(#[from] OutboxError),

    /// The publisher failed before the outbox was reached.
    #[error("publish failure: {0}")]
    Publish(String),

    #[error("serialization failure: {0}")]
    Serialization(#[from] serde_json::Error),
}
