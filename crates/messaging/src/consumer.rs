//! Fetch-process-commit consumer loop.
//!
//! The loop favors stream liveness over zero message loss: a message
//! that still fails after the retry budget is written to the DLQ and
//! its offset is committed, so one bad message can never wedge the
//! partition. Only broker infrastructure failures stop the loop.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use common::clock::Clock;

use crate::broker::{MessageSource, RawMessage};
use crate::config::ConsumerConfig;
use crate::dead_letter::DeadLetterWriter;
use crate::envelope::EventEnvelope;
use crate::error::ConsumerError;
use crate::handler::EnvelopeHandler;

enum ProcessOutcome {
    Applied,
    Failed(String),
    Cancelled,
}

/// Drives one [`MessageSource`] through an [`EnvelopeHandler`].
pub struct Consumer<S, H> {
    source: S,
    handler: H,
    dlq: DeadLetterWriter,
    config: ConsumerConfig,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
}

impl<S, H> Consumer<S, H>
where
    S: MessageSource,
    H: EnvelopeHandler,
{
    pub fn new(
        source: S,
        handler: H,
        dlq: DeadLetterWriter,
        config: ConsumerConfig,
        clock: Arc<dyn Clock>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            source,
            handler,
            dlq,
            config,
            clock,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled or the broker fails.
    pub async fn run(mut self) -> Result<(), ConsumerError> {
        info!(
            topic = %self.config.topic,
            group = %self.config.group_id,
            "consumer starting"
        );
        loop {
            if *self.shutdown.borrow() {
                info!(topic = %self.config.topic, "consumer shutting down");
                return Ok(());
            }

            let fetched = tokio::select! {
                _ = self.shutdown.changed() => continue,
                fetched = self.source.fetch(self.config.fetch_timeout) => fetched,
            };

            let message = match fetched {
                Ok(Some(message)) => message,
                Ok(None) => continue,
                Err(err) => {
                    error!(error = %err, topic = %self.config.topic, "fetch failed");
                    return Err(ConsumerError::Fetch(err));
                }
            };

            match self.process(&message).await {
                ProcessOutcome::Applied => {
                    counter!("consumer_messages_applied").increment(1);
                }
                ProcessOutcome::Failed(reason) => {
                    counter!("consumer_messages_dead_lettered").increment(1);
                    warn!(
                        offset = message.offset,
                        reason = %reason,
                        "message exhausted retries, writing to DLQ"
                    );
                    if let Err(err) = self
                        .dlq
                        .write(
                            &message.topic,
                            message.partition,
                            message.offset,
                            &message.payload,
                            &reason,
                        )
                        .await
                    {
                        // A DLQ outage must not stop the stream; the
                        // message is lost and that is logged loudly.
                        error!(
                            error = %err,
                            offset = message.offset,
                            "dead-letter write failed, dropping message"
                        );
                    }
                }
                ProcessOutcome::Cancelled => {
                    // Leave the offset uncommitted so the message is
                    // redelivered after restart.
                    info!(offset = message.offset, "shutdown during processing");
                    return Ok(());
                }
            }

            if let Err(err) = self.source.commit(&message).await {
                error!(error = %err, offset = message.offset, "offset commit failed");
                return Err(ConsumerError::Commit(err));
            }
        }
    }

    async fn process(&mut self, message: &RawMessage) -> ProcessOutcome {
        let mut envelope: EventEnvelope = match serde_json::from_slice(&message.payload) {
            Ok(envelope) => envelope,
            // Poison message: retrying a decode failure cannot succeed.
            Err(err) => return ProcessOutcome::Failed(format!("envelope decode failed: {err}")),
        };
        if envelope.occurred_at.is_none() {
            envelope.occurred_at = Some(self.clock.now());
        }

        let mut last_error = String::new();
        for attempt in 1..=self.config.max_retries.max(1) {
            match self.handler.apply(envelope.clone()).await {
                Ok(()) => return ProcessOutcome::Applied,
                Err(err) => {
                    debug!(
                        attempt,
                        event_id = %envelope.event_id,
                        error = %err,
                        "handler attempt failed"
                    );
                    last_error = err.to_string();
                }
            }
            if attempt < self.config.max_retries {
                let backoff = self.config.retry_backoff * attempt;
                let deadline = tokio::time::Instant::now() + backoff;
                // Watch notifications fire on every send; only a true
                // value is a shutdown, anything else keeps waiting out
                // the full backoff.
                loop {
                    tokio::select! {
                        _ = self.shutdown.changed() => {
                            if *self.shutdown.borrow() {
                                return ProcessOutcome::Cancelled;
                            }
                        }
                        _ = tokio::time::sleep_until(deadline) => break,
                    }
                }
            }
        }
        ProcessOutcome::Failed(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::MessagePublisher;
    use crate::error::HandlerError;
    use crate::memory::InMemoryBroker;
    use async_trait::async_trait;
    use common::clock::SystemClock;
    use std::sync::Mutex;
    use std::time::Duration;

    struct RecordingHandler {
        fail_first: u32,
        calls: Arc<Mutex<Vec<EventEnvelope>>>,
        failures: Arc<Mutex<u32>>,
    }

    #[async_trait]
    impl EnvelopeHandler for RecordingHandler {
        async fn apply(&self, envelope: EventEnvelope) -> Result<(), HandlerError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures < self.fail_first {
                *failures += 1;
                return Err(HandlerError::new("transient"));
            }
            self.calls.lock().unwrap().push(envelope);
            Ok(())
        }
    }

    fn test_config() -> ConsumerConfig {
        ConsumerConfig {
            retry_backoff: Duration::from_millis(1),
            fetch_timeout: Duration::from_millis(20),
            ..ConsumerConfig::default()
        }
    }

    fn consumer_with(
        broker: &InMemoryBroker,
        handler: RecordingHandler,
        config: ConsumerConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Consumer<crate::memory::InMemoryConsumer, RecordingHandler> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let dlq = DeadLetterWriter::new(
            Arc::new(broker.clone()),
            config.dlq_topic.clone(),
            clock.clone(),
        );
        let source = broker.consumer(config.topic.clone(), config.group_id.clone());
        Consumer::new(source, handler, dlq, config, clock, shutdown)
    }

    fn envelope_bytes(event_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "eventId": event_id,
            "eventType": "ArenaCreated",
            "aggregateId": "a-1",
            "version": 1,
            "payload": {"name": "Dish-1"},
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn applies_message_and_commits_offset() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        broker
            .publish(&config.topic, None, envelope_bytes("e-1"))
            .await
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            fail_first: 0,
            calls: calls.clone(),
            failures: Arc::new(Mutex::new(0)),
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = consumer_with(&broker, handler, config.clone(), stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        let applied = calls.lock().unwrap().clone();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].event_id, "e-1");
        // The consumer defaults occurredAt when the producer omits it.
        assert!(applied[0].occurred_at.is_some());
        assert_eq!(
            broker.committed(&config.topic, &config.group_id).await,
            Some(1)
        );
        assert_eq!(broker.len(&config.dlq_topic).await, 0);
    }

    #[tokio::test]
    async fn retries_transient_failures() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        broker
            .publish(&config.topic, None, envelope_bytes("e-1"))
            .await
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            fail_first: 2,
            calls: calls.clone(),
            failures: Arc::new(Mutex::new(0)),
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = consumer_with(&broker, handler, config.clone(), stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert_eq!(calls.lock().unwrap().len(), 1);
        assert_eq!(broker.len(&config.dlq_topic).await, 0);
    }

    #[tokio::test]
    async fn dead_letters_after_retry_budget_and_keeps_going() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        broker
            .publish(&config.topic, None, envelope_bytes("e-bad"))
            .await
            .unwrap();
        broker
            .publish(&config.topic, None, envelope_bytes("e-good"))
            .await
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            fail_first: u32::MAX, // first message never succeeds
            calls: calls.clone(),
            failures: Arc::new(Mutex::new(0)),
        };
        // fail_first counts total failures across calls, so cap retries
        // to make only the first message exhaust them.
        let config = ConsumerConfig {
            max_retries: 3,
            ..config
        };
        let handler = RecordingHandler {
            fail_first: 3,
            ..handler
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = consumer_with(&broker, handler, config.clone(), stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(150)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        // First message dead-lettered, second applied, both committed.
        assert_eq!(broker.len(&config.dlq_topic).await, 1);
        let applied = calls.lock().unwrap().clone();
        assert_eq!(applied.len(), 1);
        assert_eq!(applied[0].event_id, "e-good");
        assert_eq!(
            broker.committed(&config.topic, &config.group_id).await,
            Some(2)
        );
    }

    #[tokio::test]
    async fn poison_message_goes_straight_to_dlq() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        broker
            .publish(&config.topic, None, b"this is not json".to_vec())
            .await
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            fail_first: 0,
            calls: calls.clone(),
            failures: Arc::new(Mutex::new(0)),
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = consumer_with(&broker, handler, config.clone(), stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(50)).await;
        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(broker.len(&config.dlq_topic).await, 1);
        assert_eq!(
            broker.committed(&config.topic, &config.group_id).await,
            Some(1)
        );
    }

    /// Publisher whose every publish fails, standing in for a broker
    /// that lost its dead-letter topic.
    struct UnavailablePublisher;

    #[async_trait]
    impl crate::broker::MessagePublisher for UnavailablePublisher {
        async fn publish(
            &self,
            _topic: &str,
            _key: Option<&[u8]>,
            _payload: Vec<u8>,
        ) -> Result<(), crate::error::BrokerError> {
            Err(crate::error::BrokerError::Unavailable(
                "dlq down".to_string(),
            ))
        }
    }

    #[tokio::test]
    async fn dlq_outage_is_swallowed_and_offset_still_commits() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        broker
            .publish(&config.topic, None, envelope_bytes("e-1"))
            .await
            .unwrap();

        let calls = Arc::new(Mutex::new(Vec::new()));
        let handler = RecordingHandler {
            fail_first: u32::MAX,
            calls: calls.clone(),
            failures: Arc::new(Mutex::new(0)),
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let dlq = DeadLetterWriter::new(
            Arc::new(UnavailablePublisher),
            config.dlq_topic.clone(),
            clock.clone(),
        );
        let source = broker.consumer(config.topic.clone(), config.group_id.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = Consumer::new(source, handler, dlq, config.clone(), clock, stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(100)).await;
        stop_tx.send(true).unwrap();
        // The loop survives the DLQ outage and exits via shutdown, not
        // via an error.
        task.await.unwrap().unwrap();

        // Message is gone for good, but the stream advanced.
        assert_eq!(
            broker.committed(&config.topic, &config.group_id).await,
            Some(1)
        );
        assert!(calls.lock().unwrap().is_empty());
    }

    /// Fails twice, then records when the successful apply happened.
    struct TimingHandler {
        failures: Arc<Mutex<u32>>,
        applied_at: Arc<Mutex<Option<tokio::time::Instant>>>,
    }

    #[async_trait]
    impl EnvelopeHandler for TimingHandler {
        async fn apply(&self, _envelope: EventEnvelope) -> Result<(), HandlerError> {
            let mut failures = self.failures.lock().unwrap();
            if *failures < 2 {
                *failures += 1;
                return Err(HandlerError::new("transient"));
            }
            *self.applied_at.lock().unwrap() = Some(tokio::time::Instant::now());
            Ok(())
        }
    }

    #[tokio::test]
    async fn spurious_watch_notification_neither_cancels_nor_skips_backoff() {
        let broker = InMemoryBroker::new();
        let config = ConsumerConfig {
            retry_backoff: Duration::from_millis(30),
            ..test_config()
        };
        broker
            .publish(&config.topic, None, envelope_bytes("e-1"))
            .await
            .unwrap();

        let applied_at = Arc::new(Mutex::new(None));
        let handler = TimingHandler {
            failures: Arc::new(Mutex::new(0)),
            applied_at: applied_at.clone(),
        };
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let dlq = DeadLetterWriter::new(
            Arc::new(broker.clone()),
            config.dlq_topic.clone(),
            clock.clone(),
        );
        let source = broker.consumer(config.topic.clone(), config.group_id.clone());
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = Consumer::new(source, handler, dlq, config.clone(), clock, stop_rx);
        let started = tokio::time::Instant::now();
        let task = tokio::spawn(consumer.run());

        // Keep poking the watch channel with non-shutdown values while
        // the retries are backing off.
        for _ in 0..30 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let _ = stop_tx.send(false);
        }
        stop_tx.send(true).unwrap();
        task.await.unwrap().unwrap();

        // Applied on the third attempt only after both full backoff
        // waits (30ms + 60ms); a skipped sleep would land near zero.
        let when = applied_at.lock().unwrap().expect("message never applied");
        assert!(when - started >= Duration::from_millis(90));
        assert!(broker.len(&config.dlq_topic).await == 0);
    }

    #[tokio::test]
    async fn shutdown_on_idle_topic_exits_cleanly() {
        let broker = InMemoryBroker::new();
        let config = test_config();
        let handler = RecordingHandler {
            fail_first: 0,
            calls: Arc::new(Mutex::new(Vec::new())),
            failures: Arc::new(Mutex::new(0)),
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let consumer = consumer_with(&broker, handler, config, stop_rx);
        let task = tokio::spawn(consumer.run());

        tokio::time::sleep(Duration::from_millis(10)).await;
        stop_tx.send(true).unwrap();
        let finished = tokio::time::timeout(Duration::from_secs(2), task).await;
        finished.unwrap().unwrap().unwrap();
    }
}
