//! Transactional seams of the write side.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use tracing::warn;

use common::types::ArenaId;
use domain::Arena;
use outbox::NewOutboxRecord;

use crate::error::ApplicationError;

/// One open write transaction.
///
/// Everything a command handler touches during a command goes through
/// this surface, so the arena save and the outbox enqueue share one
/// commit-or-rollback fate.
#[async_trait]
pub trait ArenaTx: Send {
    /// Loads an arena for update. The backing store takes a row lock
    /// here, serializing concurrent commands per aggregate.
    async fn get_arena(&mut self, id: ArenaId) -> Result<Option<Arena>, ApplicationError>;

    /// Stages the aggregate's new state.
    async fn save_arena(&mut self, arena: &Arena) -> Result<(), ApplicationError>;

    /// Stages outbox rows in the same transaction.
    async fn enqueue_outbox(
        &mut self,
        records: Vec<NewOutboxRecord>,
    ) -> Result<(), ApplicationError>;

    async fn commit(self) -> Result<(), ApplicationError>
    where
        Self: Sized;

    async fn rollback(self) -> Result<(), ApplicationError>
    where
        Self: Sized;
}

/// Opens transactions and runs closures inside them.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    type Tx: ArenaTx;

    async fn begin(&self) -> Result<Self::Tx, ApplicationError>;

    /// Runs `work` in a fresh transaction: commit on success, rollback
    /// on error. A rollback failure is logged but the original error is
    /// what the caller sees.
    async fn within_transaction<T, F>(&self, work: F) -> Result<T, ApplicationError>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut Self::Tx) -> BoxFuture<'t, Result<T, ApplicationError>> + Send,
    {
        let mut tx = self.begin().await?;
        match work(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Sends drained domain events toward the read side.
///
/// The production implementation writes to the transactional outbox;
/// delivery to the broker happens later, outside the transaction.
#[async_trait]
pub trait EventPublisher<Tx: ArenaTx>: Send + Sync {
    async fn publish(
        &self,
        tx: &mut Tx,
        events: Vec<domain::ArenaEvent>,
    ) -> Result<(), ApplicationError>;
}
