//! Outbox store contract.

use std::time::Duration;

use async_trait::async_trait;

use common::types::EventId;

use crate::error::OutboxError;
use crate::record::{NewOutboxRecord, OutboxRecord};

/// Durable storage for outbox rows.
///
/// `enqueue` is called inside the command transaction; the remaining
/// operations are the relay's side of the contract.
#[async_trait]
pub trait OutboxStore: Send + Sync {
    /// Appends rows as `Pending`. Atomic with the surrounding command
    /// transaction in a real database; atomic per batch in memory.
    async fn enqueue(&self, records: Vec<NewOutboxRecord>) -> Result<(), OutboxError>;

    /// Claims up to `batch_size` claimable rows for `worker_id`,
    /// marking them `Processing` with a lease of `lease_ttl`. Rows
    /// already leased by a live worker are skipped, so two relays never
    /// hold the same row at once.
    async fn claim_batch(
        &self,
        worker_id: &str,
        batch_size: usize,
        lease_ttl: Duration,
    ) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Marks a delivered row `Published` and releases its lease.
    async fn mark_published(&self, id: EventId) -> Result<(), OutboxError>;

    /// Records a delivery failure: increments attempts and reschedules
    /// with linear backoff, or at the attempt cap marks the row
    /// `Failed` and mirrors it into the dead-letter table.
    async fn mark_failed(
        &self,
        id: EventId,
        error: &str,
        base_backoff: Duration,
    ) -> Result<(), OutboxError>;
}
