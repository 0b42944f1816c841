//! Read store contract.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ProjectionError;
use crate::view::ArenaView;

/// One write against the view store. The projector collects the ops
/// for an event and applies them as one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Insert or replace the full record for an arena.
    PutRecord(ArenaView),
    /// Update only the status and updated-at fields.
    SetStatus {
        arena_id: String,
        status: String,
        updated_at: DateTime<Utc>,
    },
    /// Add an arena to a status index set.
    IndexAdd { status: String, arena_id: String },
    /// Remove an arena from a status index set.
    IndexRemove { status: String, arena_id: String },
    /// Record the arena in the creation-time index used for listing.
    CreatedIndexAdd {
        arena_id: String,
        created_at: DateTime<Utc>,
    },
}

/// Key-value store holding the denormalized views.
#[async_trait]
pub trait ReadStore: Send + Sync {
    /// Set-if-absent idempotency marker with a TTL, keyed by event id.
    /// Returns true when the marker was newly set, false when the event
    /// was already processed.
    async fn mark_processed(
        &self,
        event_id: &str,
        ttl: Duration,
    ) -> Result<bool, ProjectionError>;

    /// Current status of an arena, if the record exists.
    async fn get_status(&self, arena_id: &str) -> Result<Option<String>, ProjectionError>;

    /// Applies a batch of writes. The in-memory store applies them
    /// under one lock; a networked store pipelines them, so readers may
    /// observe intermediate states between ops.
    async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), ProjectionError>;
}
