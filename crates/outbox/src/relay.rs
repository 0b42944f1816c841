//! Outbox relay: drains claimed rows to the broker.
//!
//! A relay polls its store, claims a batch under a lease, turns each
//! row into an [`EventEnvelope`], and publishes it keyed by aggregate
//! id so one arena's events stay on one partition. Delivery failures
//! are pushed back into the store's retry schedule; the relay itself
//! never gives up on the stream.

use std::sync::Arc;

use metrics::counter;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use messaging::{EventEnvelope, MessagePublisher};

use crate::config::RelayConfig;
use crate::error::OutboxError;
use crate::record::OutboxRecord;
use crate::store::OutboxStore;

/// Moves rows from an [`OutboxStore`] to a [`MessagePublisher`].
pub struct OutboxRelay {
    store: Arc<dyn OutboxStore>,
    publisher: Arc<dyn MessagePublisher>,
    config: RelayConfig,
    shutdown: watch::Receiver<bool>,
}

impl OutboxRelay {
    pub fn new(
        store: Arc<dyn OutboxStore>,
        publisher: Arc<dyn MessagePublisher>,
        config: RelayConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            store,
            publisher,
            config,
            shutdown,
        }
    }

    /// Runs until shutdown is signalled. Store failures are logged and
    /// retried on the next poll rather than crashing the relay.
    pub async fn run(mut self) -> Result<(), OutboxError> {
        info!(worker_id = %self.config.worker_id, "outbox relay starting");
        loop {
            if *self.shutdown.borrow() {
                info!(worker_id = %self.config.worker_id, "outbox relay shutting down");
                return Ok(());
            }

            let batch = match self
                .store
                .claim_batch(
                    &self.config.worker_id,
                    self.config.batch_size,
                    self.config.lease_ttl,
                )
                .await
            {
                Ok(batch) => batch,
                Err(err) => {
                    error!(error = %err, "outbox claim failed");
                    self.idle().await;
                    continue;
                }
            };

            if batch.is_empty() {
                self.idle().await;
                continue;
            }

            debug!(count = batch.len(), "claimed outbox batch");
            for record in batch {
                // Store bookkeeping failures are not fatal either: the
                // lease expires and the row comes back on a later poll.
                if let Err(err) = self.deliver(record).await {
                    error!(error = %err, "outbox status update failed");
                }
            }
        }
    }

    async fn idle(&mut self) {
        let interval = self.config.poll_interval;
        tokio::select! {
            _ = self.shutdown.changed() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }

    async fn deliver(&self, record: OutboxRecord) -> Result<(), OutboxError> {
        let id = record.id;
        let envelope = build_envelope(&record);
        let bytes = serde_json::to_vec(&envelope)?;
        let key = record.aggregate_id.as_bytes();

        match self.publisher.publish(&record.topic, Some(key), bytes).await {
            Ok(()) => {
                counter!("outbox_records_published").increment(1);
                self.store.mark_published(id).await
            }
            Err(err) => {
                counter!("outbox_records_failed").increment(1);
                warn!(
                    event_id = %id,
                    error = %err,
                    attempts = record.attempts,
                    "outbox delivery failed"
                );
                self.store
                    .mark_failed(id, &err.to_string(), self.config.base_backoff)
                    .await
            }
        }
    }
}

/// Builds the wire envelope for one outbox row. Transport metadata the
/// row schema does not model directly (occurredAt, schemaVersion) rides
/// in the headers column.
fn build_envelope(record: &OutboxRecord) -> EventEnvelope {
    let occurred_at = record
        .headers
        .get("occurredAt")
        .and_then(|v| v.as_str())
        .and_then(|raw| raw.parse().ok());
    let version = record
        .headers
        .get("schemaVersion")
        .and_then(|v| v.as_i64())
        .unwrap_or(1) as i32;
    EventEnvelope {
        event_id: record.id.to_string(),
        event_type: record.event_type.clone(),
        aggregate_id: record.aggregate_id.clone(),
        occurred_at,
        version,
        payload: record.payload.clone(),
    }
}
