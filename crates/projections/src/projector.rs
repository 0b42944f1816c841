//! Arena projector.
//!
//! Routes envelopes by event type into view writes. Unknown event
//! types are accepted and ignored so new producers can roll out ahead
//! of the read side.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use common::clock::Clock;
use messaging::{EnvelopeHandler, EventEnvelope, HandlerError};

use crate::error::ProjectionError;
use crate::read_store::{ReadStore, WriteOp};
use crate::view::ArenaView;

const STATUS_PENDING: &str = "PENDING";
const STATUS_RUNNING: &str = "RUNNING";
const STATUS_PAUSED: &str = "PAUSED";
const STATUS_FINISHED: &str = "FINISHED";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArenaCreatedPayload {
    name: String,
    config: serde_json::Value,
}

/// Projects arena events into the read store.
pub struct ArenaProjector<S> {
    store: S,
    clock: Arc<dyn Clock>,
    idempotency_ttl: Duration,
}

impl<S: ReadStore> ArenaProjector<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, idempotency_ttl: Duration) -> Self {
        Self {
            store,
            clock,
            idempotency_ttl,
        }
    }

    /// Applies one envelope. Safe to call more than once per event id:
    /// the idempotency marker turns repeats into no-ops.
    #[instrument(skip(self, envelope), fields(event_id = %envelope.event_id, event_type = %envelope.event_type))]
    pub async fn project(&self, envelope: &EventEnvelope) -> Result<(), ProjectionError> {
        if !envelope.has_required_fields() {
            return Err(ProjectionError::MalformedEnvelope(
                "missing eventId, eventType, or aggregateId".to_string(),
            ));
        }

        let fresh = self
            .store
            .mark_processed(&envelope.event_id, self.idempotency_ttl)
            .await?;
        if !fresh {
            counter!("projector_duplicates_skipped").increment(1);
            debug!("duplicate event skipped");
            return Ok(());
        }

        let occurred_at = envelope.occurred_at_or(self.clock.now());
        let ops = match envelope.event_type.as_str() {
            "ArenaCreated" => self.on_created(envelope, occurred_at)?,
            "ArenaStarted" | "ArenaResumed" => {
                self.on_status(&envelope.aggregate_id, STATUS_RUNNING, occurred_at)
                    .await?
            }
            "ArenaPaused" => {
                self.on_status(&envelope.aggregate_id, STATUS_PAUSED, occurred_at)
                    .await?
            }
            "ArenaStopped" | "ArenaFinished" => {
                self.on_status(&envelope.aggregate_id, STATUS_FINISHED, occurred_at)
                    .await?
            }
            other => {
                // Forward compatibility: commit and move on.
                debug!(event_type = other, "unhandled event type");
                counter!("projector_events_ignored").increment(1);
                return Ok(());
            }
        };

        self.store.apply(ops).await?;
        counter!("projector_events_applied").increment(1);
        Ok(())
    }

    fn on_created(
        &self,
        envelope: &EventEnvelope,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<WriteOp>, ProjectionError> {
        let payload: ArenaCreatedPayload = serde_json::from_value(envelope.payload.clone())?;
        if payload.name.trim().is_empty() {
            return Err(ProjectionError::MalformedEnvelope(
                "ArenaCreated payload has a blank name".to_string(),
            ));
        }

        let view = ArenaView {
            id: envelope.aggregate_id.clone(),
            name: payload.name,
            status: STATUS_PENDING.to_string(),
            created_at: occurred_at,
            updated_at: occurred_at,
            config_json: payload.config.to_string(),
        };
        Ok(vec![
            WriteOp::PutRecord(view),
            WriteOp::IndexAdd {
                status: STATUS_PENDING.to_string(),
                arena_id: envelope.aggregate_id.clone(),
            },
            WriteOp::CreatedIndexAdd {
                arena_id: envelope.aggregate_id.clone(),
                created_at: occurred_at,
            },
        ])
    }

    /// Status move as read-then-write: fetch the old status, then batch
    /// the record update with the index move. Between the read and the
    /// apply another projector instance could interleave, leaving a
    /// stale index entry; the record itself is always last-write-wins
    /// correct, and a sweep can reconcile indexes offline.
    async fn on_status(
        &self,
        arena_id: &str,
        status: &str,
        occurred_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<WriteOp>, ProjectionError> {
        let old = self.store.get_status(arena_id).await?;
        if old.is_none() {
            warn!(arena_id, "status event for unknown arena, creating stub");
        }

        let mut ops = vec![WriteOp::SetStatus {
            arena_id: arena_id.to_string(),
            status: status.to_string(),
            updated_at: occurred_at,
        }];
        if let Some(old_status) = old {
            if old_status != status && !old_status.is_empty() {
                ops.push(WriteOp::IndexRemove {
                    status: old_status,
                    arena_id: arena_id.to_string(),
                });
            }
        }
        ops.push(WriteOp::IndexAdd {
            status: status.to_string(),
            arena_id: arena_id.to_string(),
        });
        Ok(ops)
    }
}

#[async_trait]
impl<S: ReadStore> EnvelopeHandler for ArenaProjector<S> {
    async fn apply(&self, envelope: EventEnvelope) -> Result<(), HandlerError> {
        self.project(&envelope).await.map_err(HandlerError::from)
    }
}
