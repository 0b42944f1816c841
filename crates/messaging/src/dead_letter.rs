//! Dead-letter queue writer.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use common::clock::Clock;

use crate::broker::MessagePublisher;
use crate::error::BrokerError;

/// What lands on the dead-letter topic: the original message plus
/// enough context to triage it without replaying the stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEnvelope {
    pub original_topic: String,
    pub original_partition: i32,
    pub original_offset: i64,
    pub error: String,
    pub timestamp: DateTime<Utc>,
    /// The original payload. Decoded JSON when possible, otherwise the
    /// raw bytes as a lossy string so nothing is silently dropped.
    pub raw_value: serde_json::Value,
}

impl DeadLetterEnvelope {
    /// Wraps a failed message. Payloads that are not valid JSON (the
    /// poison case) are preserved as a string.
    pub fn wrap(
        topic: &str,
        partition: i32,
        offset: i64,
        payload: &[u8],
        error: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let raw_value = serde_json::from_slice(payload)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(payload).into_owned()));
        Self {
            original_topic: topic.to_string(),
            original_partition: partition,
            original_offset: offset,
            error: error.into(),
            timestamp: now,
            raw_value,
        }
    }
}

/// Publishes dead-letter envelopes to a dedicated topic.
pub struct DeadLetterWriter {
    publisher: Arc<dyn MessagePublisher>,
    topic: String,
    clock: Arc<dyn Clock>,
}

impl DeadLetterWriter {
    pub fn new(publisher: Arc<dyn MessagePublisher>, topic: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            clock,
        }
    }

    /// Writes one failed message to the dead-letter topic.
    pub async fn write(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
        payload: &[u8],
        error: &str,
    ) -> Result<(), BrokerError> {
        let envelope =
            DeadLetterEnvelope::wrap(topic, partition, offset, payload, error, self.clock.now());
        let bytes = match serde_json::to_vec(&envelope) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Cannot happen for the types above, but losing the DLQ
                // write must never take the consumer down.
                warn!(error = %err, "failed to encode dead-letter envelope");
                return Ok(());
            }
        };
        self.publisher.publish(&self.topic, None, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBroker;
    use common::clock::SystemClock;

    #[tokio::test]
    async fn wraps_json_payload_as_value() {
        let envelope = DeadLetterEnvelope::wrap(
            "arena.events",
            0,
            7,
            br#"{"eventType":"ArenaCreated"}"#,
            "handler failed",
            Utc::now(),
        );
        assert_eq!(envelope.original_offset, 7);
        assert_eq!(envelope.raw_value["eventType"], "ArenaCreated");
    }

    #[tokio::test]
    async fn wraps_non_json_payload_as_string() {
        let envelope = DeadLetterEnvelope::wrap(
            "arena.events",
            0,
            3,
            b"not json at all",
            "decode failed",
            Utc::now(),
        );
        assert_eq!(
            envelope.raw_value,
            serde_json::Value::String("not json at all".to_string())
        );
    }

    #[tokio::test]
    async fn writes_to_configured_topic() {
        let broker = InMemoryBroker::new();
        let writer = DeadLetterWriter::new(
            Arc::new(broker.clone()),
            "arena.events.dlq",
            Arc::new(SystemClock),
        );

        writer
            .write("arena.events", 0, 12, b"{}", "boom")
            .await
            .unwrap();

        assert_eq!(broker.len("arena.events.dlq").await, 1);
        let payloads = broker.payloads("arena.events.dlq").await;
        let parsed: DeadLetterEnvelope = serde_json::from_slice(&payloads[0]).unwrap();
        assert_eq!(parsed.original_topic, "arena.events");
        assert_eq!(parsed.error, "boom");
    }
}
