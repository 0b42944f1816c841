//! In-memory broker implementation for testing.
//!
//! Single-partition topics backed by append-only logs, with per-group
//! cursors and committed offsets inspectable from tests. Provides the
//! same seams as the real broker client.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Notify, RwLock};

use crate::broker::{MessagePublisher, MessageSource, RawMessage};
use crate::error::BrokerError;

#[derive(Default)]
struct BrokerState {
    topics: HashMap<String, Vec<RawMessage>>,
    // (topic, group) -> offset of the next message to hand out
    committed: HashMap<(String, String), i64>,
}

/// In-memory single-partition broker.
#[derive(Clone, Default)]
pub struct InMemoryBroker {
    state: Arc<RwLock<BrokerState>>,
    notify: Arc<Notify>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a consuming handle over `topic` for a consumer group.
    pub fn consumer(&self, topic: impl Into<String>, group: impl Into<String>) -> InMemoryConsumer {
        InMemoryConsumer {
            broker: self.clone(),
            topic: topic.into(),
            group: group.into(),
            next_offset: 0,
        }
    }

    /// Returns every payload published to `topic`, in order.
    pub async fn payloads(&self, topic: &str) -> Vec<Vec<u8>> {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .map(|log| log.iter().map(|m| m.payload.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the number of messages on `topic`.
    pub async fn len(&self, topic: &str) -> usize {
        self.state
            .read()
            .await
            .topics
            .get(topic)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Returns the committed position of a consumer group, if any.
    pub async fn committed(&self, topic: &str, group: &str) -> Option<i64> {
        self.state
            .read()
            .await
            .committed
            .get(&(topic.to_string(), group.to_string()))
            .copied()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(
        &self,
        topic: &str,
        key: Option<&[u8]>,
        payload: Vec<u8>,
    ) -> Result<(), BrokerError> {
        let mut state = self.state.write().await;
        let log = state.topics.entry(topic.to_string()).or_default();
        let offset = log.len() as i64;
        log.push(RawMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: key.map(<[u8]>::to_vec),
            payload,
        });
        drop(state);
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Consuming handle produced by [`InMemoryBroker::consumer`].
pub struct InMemoryConsumer {
    broker: InMemoryBroker,
    topic: String,
    group: String,
    next_offset: i64,
}

impl InMemoryConsumer {
    async fn peek(&self) -> Option<RawMessage> {
        self.broker
            .state
            .read()
            .await
            .topics
            .get(&self.topic)
            .and_then(|log| log.get(self.next_offset as usize))
            .cloned()
    }
}

#[async_trait]
impl MessageSource for InMemoryConsumer {
    async fn fetch(&mut self, max_wait: Duration) -> Result<Option<RawMessage>, BrokerError> {
        let deadline = tokio::time::Instant::now() + max_wait;
        loop {
            // Register for wakeups before checking the log so a publish
            // between the check and the wait is not missed.
            let notified = self.broker.notify.notified();
            if let Some(message) = self.peek().await {
                self.next_offset = message.offset + 1;
                return Ok(Some(message));
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
        }
    }

    async fn commit(&mut self, message: &RawMessage) -> Result<(), BrokerError> {
        let mut state = self.broker.state.write().await;
        state
            .committed
            .insert((self.topic.clone(), self.group.clone()), message.offset + 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_fetch() {
        let broker = InMemoryBroker::new();
        broker
            .publish("arena.events", Some(b"a-1"), b"hello".to_vec())
            .await
            .unwrap();

        let mut consumer = broker.consumer("arena.events", "projector");
        let msg = consumer
            .fetch(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload, b"hello");
        assert_eq!(msg.offset, 0);
        assert_eq!(msg.key.as_deref(), Some(b"a-1".as_slice()));
    }

    #[tokio::test]
    async fn fetch_times_out_on_empty_topic() {
        let broker = InMemoryBroker::new();
        let mut consumer = broker.consumer("arena.events", "projector");
        let fetched = consumer.fetch(Duration::from_millis(10)).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn fetch_wakes_up_on_publish() {
        let broker = InMemoryBroker::new();
        let mut consumer = broker.consumer("arena.events", "projector");

        let producer = broker.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            producer
                .publish("arena.events", None, b"late".to_vec())
                .await
                .unwrap();
        });

        let msg = consumer
            .fetch(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(msg.payload, b"late");
    }

    #[tokio::test]
    async fn commit_records_group_position() {
        let broker = InMemoryBroker::new();
        broker
            .publish("arena.events", None, b"one".to_vec())
            .await
            .unwrap();

        let mut consumer = broker.consumer("arena.events", "projector");
        let msg = consumer
            .fetch(Duration::from_millis(50))
            .await
            .unwrap()
            .unwrap();
        consumer.commit(&msg).await.unwrap();

        assert_eq!(broker.committed("arena.events", "projector").await, Some(1));
        assert_eq!(broker.committed("arena.events", "other").await, None);
    }

    #[tokio::test]
    async fn consumers_in_different_groups_see_all_messages() {
        let broker = InMemoryBroker::new();
        broker
            .publish("arena.events", None, b"one".to_vec())
            .await
            .unwrap();

        let mut a = broker.consumer("arena.events", "group-a");
        let mut b = broker.consumer("arena.events", "group-b");
        assert!(a.fetch(Duration::from_millis(50)).await.unwrap().is_some());
        assert!(b.fetch(Duration::from_millis(50)).await.unwrap().is_some());
    }
}
