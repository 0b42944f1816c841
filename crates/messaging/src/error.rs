//! Messaging error types.

use thiserror::Error;

/// Errors surfaced by a broker implementation.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// The broker could not be reached or rejected the request.
    #[error("broker unavailable: {0}")]
    Unavailable(String),

    /// The topic or stream no longer exists.
    #[error("topic closed: {0}")]
    Closed(String),
}

/// Errors that terminate the consumer loop.
///
/// Processing failures never appear here: they are retried and then
/// dead-lettered so the stream keeps advancing. Only fetch/commit
/// infrastructure failures are fatal.
#[derive(Debug, Error)]
pub enum ConsumerError {
    #[error("fetch failed: {0}")]
    Fetch(#[source] BrokerError),

    #[error("offset commit failed: {0}")]
    Commit(#[source] BrokerError),
}

/// Error returned by an envelope handler.
///
/// The consumer treats every handler error as transient and retriable;
/// handlers that know better (e.g. the projector) still return this and
/// rely on the retry bound plus the dead-letter queue.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}
