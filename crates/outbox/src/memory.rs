//! In-memory outbox store.
//!
//! Mirrors the semantics of the SQL-backed store closely enough that
//! the relay and the command handler can be exercised end to end in
//! tests: lease mutual exclusion, linear backoff, and the dead-letter
//! mirror all behave as they would against the database.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use tokio::sync::Mutex;

use common::clock::Clock;
use common::types::EventId;

use crate::error::OutboxError;
use crate::record::{DeadLetterRecord, NewOutboxRecord, OutboxRecord, OutboxStatus};
use crate::store::OutboxStore;

#[derive(Default)]
struct State {
    rows: HashMap<EventId, OutboxRecord>,
    // insertion order, so claims drain oldest-first like the SQL query
    order: Vec<EventId>,
    dead_letters: Vec<DeadLetterRecord>,
}

/// Outbox store backed by a mutex-guarded map.
#[derive(Clone)]
pub struct InMemoryOutboxStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryOutboxStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Snapshot of one row, for assertions.
    pub async fn get(&self, id: EventId) -> Option<OutboxRecord> {
        self.state.lock().await.rows.get(&id).cloned()
    }

    /// All rows in insertion order, for assertions.
    pub async fn all(&self) -> Vec<OutboxRecord> {
        let state = self.state.lock().await;
        state
            .order
            .iter()
            .filter_map(|id| state.rows.get(id).cloned())
            .collect()
    }

    /// Rows currently in the given status.
    pub async fn with_status(&self, status: OutboxStatus) -> Vec<OutboxRecord> {
        self.all()
            .await
            .into_iter()
            .filter(|row| row.status == status)
            .collect()
    }

    /// The dead-letter mirror, for assertions.
    pub async fn dead_letters(&self) -> Vec<DeadLetterRecord> {
        self.state.lock().await.dead_letters.clone()
    }
}

fn chrono_ttl(ttl: Duration) -> ChronoDuration {
    ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::seconds(30))
}

#[async_trait]
impl OutboxStore for InMemoryOutboxStore {
    async fn enqueue(&self, records: Vec<NewOutboxRecord>) -> Result<(), OutboxError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        for new in records {
            let id = new.id;
            let row = OutboxRecord {
                id,
                aggregate_type: new.aggregate_type,
                aggregate_id: new.aggregate_id,
                event_type: new.event_type,
                topic: new.topic,
                payload: new.payload,
                headers: new.headers,
                correlation_id: new.correlation_id,
                causation_id: new.causation_id,
                idempotency_key: new.idempotency_key,
                status: OutboxStatus::Pending,
                attempts: 0,
                max_attempts: new.max_attempts,
                next_attempt_at: new.next_attempt_at,
                published_at: None,
                locked_by: None,
                locked_at: None,
                lock_expires_at: None,
                created_at: now,
                updated_at: now,
            };
            state.rows.insert(id, row);
            state.order.push(id);
        }
        Ok(())
    }

    async fn claim_batch(
        &self,
        worker_id: &str,
        batch_size: usize,
        lease_ttl: Duration,
    ) -> Result<Vec<OutboxRecord>, OutboxError> {
        let now = self.clock.now();
        let expires = now + chrono_ttl(lease_ttl);
        let mut state = self.state.lock().await;
        let due: Vec<EventId> = state
            .order
            .iter()
            .filter(|id| {
                state
                    .rows
                    .get(id)
                    .map(|row| row.is_claimable(now))
                    .unwrap_or(false)
            })
            .take(batch_size)
            .copied()
            .collect();

        let mut claimed = Vec::with_capacity(due.len());
        for id in due {
            if let Some(row) = state.rows.get_mut(&id) {
                row.status = OutboxStatus::Processing;
                row.locked_by = Some(worker_id.to_string());
                row.locked_at = Some(now);
                row.lock_expires_at = Some(expires);
                row.updated_at = now;
                claimed.push(row.clone());
            }
        }
        Ok(claimed)
    }

    async fn mark_published(&self, id: EventId) -> Result<(), OutboxError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(OutboxError::RecordNotFound(id))?;
        row.status = OutboxStatus::Published;
        row.published_at = Some(now);
        row.locked_by = None;
        row.locked_at = None;
        row.lock_expires_at = None;
        row.updated_at = now;
        Ok(())
    }

    async fn mark_failed(
        &self,
        id: EventId,
        error: &str,
        base_backoff: Duration,
    ) -> Result<(), OutboxError> {
        let now = self.clock.now();
        let mut state = self.state.lock().await;
        let row = state
            .rows
            .get_mut(&id)
            .ok_or(OutboxError::RecordNotFound(id))?;
        row.attempts += 1;
        row.locked_by = None;
        row.locked_at = None;
        row.lock_expires_at = None;
        row.updated_at = now;

        if row.attempts >= row.max_attempts {
            row.status = OutboxStatus::Failed;
            let dead = DeadLetterRecord {
                id: EventId::new(),
                outbox_event_id: row.id,
                aggregate_type: row.aggregate_type.clone(),
                aggregate_id: row.aggregate_id.clone(),
                event_type: row.event_type.clone(),
                topic: row.topic.clone(),
                payload: row.payload.clone(),
                headers: row.headers.clone(),
                attempts: row.attempts,
                last_error: error.to_string(),
                created_at: now,
            };
            state.dead_letters.push(dead);
        } else {
            row.status = OutboxStatus::Pending;
            row.next_attempt_at =
                now + OutboxRecord::backoff_for(row.attempts, chrono_ttl(base_backoff));
        }
        Ok(())
    }
}
