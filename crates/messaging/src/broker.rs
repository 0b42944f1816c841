//! Broker seams.
//!
//! The real deployment speaks to Kafka-compatible infrastructure; the
//! core only depends on these two narrow traits plus [`RawMessage`],
//! so tests run against the in-memory broker.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrokerError;

/// One message as fetched from a topic partition.
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    pub payload: Vec<u8>,
}

/// Produces messages onto a topic.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publishes one message. Messages with the same key land on the
    /// same partition, which is what gives one aggregate's events a
    /// single ordered stream.
    async fn publish(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError>;
}

/// One logical stream of messages with explicit offset commits.
///
/// A source is owned by exactly one consumer loop; consumer-group
/// partition assignment (for horizontal scale) happens behind this
/// trait, not in front of it.
#[async_trait]
pub trait MessageSource: Send {
    /// Fetches the next uncommitted message, waiting at most
    /// `max_wait`. Returns `Ok(None)` on timeout.
    async fn fetch(&mut self, max_wait: Duration) -> Result<Option<RawMessage>, BrokerError>;

    /// Marks the stream position past `message`.
    async fn commit(&mut self, message: &RawMessage) -> Result<(), BrokerError>;
}
