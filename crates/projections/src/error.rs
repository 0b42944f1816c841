//! Projection error types.

use thiserror::Error;

use messaging::HandlerError;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// The envelope is missing identity fields or carries a payload
    /// that does not match its event type.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The read store failed.
    #[error("read store failure: {0}")]
    Store(String),

    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}

impl From<ProjectionError> for HandlerError {
    fn from(err: ProjectionError) -> Self {
        HandlerError::new(err.to_string())
    }
}
