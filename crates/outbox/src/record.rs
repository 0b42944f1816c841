//! Outbox row types.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use common::types::EventId;

/// Lifecycle of an outbox row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboxStatus {
    /// Enqueued, waiting for a relay to claim it.
    Pending,
    /// Claimed by a relay; the lease fields say by whom and until when.
    Processing,
    /// Delivered to the broker.
    Published,
    /// Retries exhausted; mirrored into the dead-letter table.
    Failed,
}

/// What the command side enqueues. The store fills in status, attempt
/// bookkeeping, and timestamps.
#[derive(Debug, Clone)]
pub struct NewOutboxRecord {
    pub id: EventId,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub topic: String,
    pub payload: serde_json::Value,
    /// Transport metadata (occurredAt, schemaVersion) carried alongside
    /// the payload so the relay can build the wire envelope.
    pub headers: serde_json::Value,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub max_attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
}

/// A full outbox row as held by the store.
#[derive(Debug, Clone)]
pub struct OutboxRecord {
    pub id: EventId,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub topic: String,
    pub payload: serde_json::Value,
    pub headers: serde_json::Value,
    pub correlation_id: Option<String>,
    pub causation_id: Option<String>,
    pub idempotency_key: Option<String>,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub max_attempts: u32,
    pub next_attempt_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub locked_at: Option<DateTime<Utc>>,
    pub lock_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OutboxRecord {
    /// True when a relay may claim this row at `now`: it is pending and
    /// due, or its previous claimant's lease has expired.
    pub fn is_claimable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            OutboxStatus::Pending => self.next_attempt_at <= now,
            OutboxStatus::Processing => self
                .lock_expires_at
                .map(|expires| expires <= now)
                .unwrap_or(true),
            OutboxStatus::Published | OutboxStatus::Failed => false,
        }
    }

    /// Linear backoff: attempt `n` is retried `n * base` after failing.
    pub fn backoff_for(attempts: u32, base: Duration) -> Duration {
        base * attempts as i32
    }
}

/// Terminal parking spot for rows that exhausted their attempts.
#[derive(Debug, Clone)]
pub struct DeadLetterRecord {
    pub id: EventId,
    pub outbox_event_id: EventId,
    pub aggregate_type: String,
    pub aggregate_id: String,
    pub event_type: String,
    pub topic: String,
    pub payload: serde_json::Value,
    pub headers: serde_json::Value,
    pub attempts: u32,
    pub last_error: String,
    pub created_at: DateTime<Utc>,
}
