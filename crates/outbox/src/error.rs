//! Outbox error types.

use thiserror::Error;

use common::types::EventId;

#[derive(Debug, Error)]
pub enum OutboxError {
    /// The backing store rejected or failed the operation.
    #[error("outbox store failure: {0}")]
    Store(String),

    /// A mark operation referenced a record that does not exist.
    #[error("outbox record not found: {0}")]
    RecordNotFound(EventId),

    /// A record could not be serialized for storage.
    #[error("outbox serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
