//! Event publishers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use common::clock::Clock;
use common::types::EventId;
use domain::ArenaEvent;
use outbox::NewOutboxRecord;

use crate::error::ApplicationError;
use crate::ports::{ArenaTx, EventPublisher};

const AGGREGATE_TYPE: &str = "arena";
const SCHEMA_VERSION: i64 = 1;

/// Publisher backed by the transactional outbox. Each event becomes one
/// `Pending` row staged in the caller's transaction.
pub struct OutboxPublisher {
    topic: String,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
}

impl OutboxPublisher {
    pub fn new(topic: impl Into<String>, max_attempts: u32, clock: Arc<dyn Clock>) -> Self {
        Self {
            topic: topic.into(),
            max_attempts,
            clock,
        }
    }

    fn record_for(&self, event: &ArenaEvent) -> Result<NewOutboxRecord, ApplicationError> {
        let occurred_at = event.occurred_at();
        Ok(NewOutboxRecord {
            id: EventId::new(),
            aggregate_type: AGGREGATE_TYPE.to_string(),
            aggregate_id: event.arena_id().to_string(),
            event_type: event.event_type().to_string(),
            topic: self.topic.clone(),
            payload: event.payload()?,
            headers: serde_json::json!({
                "occurredAt": occurred_at.to_rfc3339(),
                "schemaVersion": SCHEMA_VERSION,
            }),
            correlation_id: None,
            causation_id: None,
            idempotency_key: None,
            max_attempts: self.max_attempts,
            next_attempt_at: self.clock.now(),
        })
    }
}

#[async_trait]
impl<Tx: ArenaTx> EventPublisher<Tx> for OutboxPublisher {
    async fn publish(&self, tx: &mut Tx, events: Vec<ArenaEvent>) -> Result<(), ApplicationError> {
        if events.is_empty() {
            return Ok(());
        }
        let records = events
            .iter()
            .map(|event| self.record_for(event))
            .collect::<Result<Vec<_>, _>>()?;
        tx.enqueue_outbox(records).await
    }
}

/// Publisher that drops events on the floor.
///
/// Degraded mode for deployments without the outbox table: commands
/// still commit, but the read side never hears about them. Every drop
/// is logged.
pub struct NoopPublisher;

#[async_trait]
impl<Tx: ArenaTx> EventPublisher<Tx> for NoopPublisher {
    async fn publish(&self, _tx: &mut Tx, events: Vec<ArenaEvent>) -> Result<(), ApplicationError> {
        if !events.is_empty() {
            warn!(count = events.len(), "event publishing disabled, dropping events");
        }
        Ok(())
    }
}
