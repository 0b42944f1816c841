//! Command handlers for the arena write side.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use common::clock::Clock;
use common::types::{ArenaId, PlayerId};
use domain::{Arena, ArenaConfig, ArenaError};

use crate::error::ApplicationError;
use crate::ports::{ArenaTx, EventPublisher, UnitOfWork};

/// Create a new arena.
#[derive(Debug, Clone)]
pub struct CreateArena {
    pub name: String,
    pub config: ArenaConfig,
    pub created_by: Option<PlayerId>,
}

/// Start, pause, resume, or stop an existing arena.
#[derive(Debug, Clone, Copy)]
pub struct LifecycleCommand {
    pub arena_id: ArenaId,
    pub actor: Option<PlayerId>,
}

/// Executes commands against the arena aggregate.
///
/// Each command runs in one transaction: load (with a row lock), apply
/// the transition, drain the events, save, enqueue to the outbox,
/// commit. Draining happens before the save so persisted state never
/// carries undelivered events.
pub struct CommandHandler<U, P> {
    uow: U,
    publisher: P,
    clock: Arc<dyn Clock>,
}

impl<U, P> CommandHandler<U, P>
where
    U: UnitOfWork,
    P: EventPublisher<U::Tx>,
{
    pub fn new(uow: U, publisher: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            uow,
            publisher,
            clock,
        }
    }

    /// Creates an arena and returns its id.
    ///
    /// Name and config are validated before the transaction opens, so
    /// malformed input never costs a database round trip.
    #[instrument(skip(self, command), fields(name = %command.name))]
    pub async fn create_arena(&self, command: CreateArena) -> Result<ArenaId, ApplicationError> {
        if command.name.trim().chars().count() < 3 {
            return Err(ApplicationError::Validation(
                "arena name must be at least 3 characters".to_string(),
            ));
        }
        command
            .config
            .validate()
            .map_err(|err| ApplicationError::Validation(err.to_string()))?;

        let id = ArenaId::new();
        let now = self.clock.now();

        let mut tx = self.uow.begin().await?;
        let staged = async {
            let mut arena = Arena::new(id, command.name, command.config, now)?;
            let events = arena.drain_events();
            tx.save_arena(&arena).await?;
            self.publisher.publish(&mut tx, events).await?;
            Ok(())
        }
        .await;
        Self::finish(tx, staged).await?;

        info!(arena_id = %id, "arena created");
        Ok(id)
    }

    /// Starts a pending arena.
    #[instrument(skip(self), fields(arena_id = %command.arena_id))]
    pub async fn start_arena(&self, command: LifecycleCommand) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        self.transition(command, move |arena| arena.start(now, command.actor))
            .await
    }

    /// Pauses a running arena.
    #[instrument(skip(self), fields(arena_id = %command.arena_id))]
    pub async fn pause_arena(&self, command: LifecycleCommand) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        self.transition(command, move |arena| arena.pause(now, command.actor))
            .await
    }

    /// Resumes a paused arena.
    #[instrument(skip(self), fields(arena_id = %command.arena_id))]
    pub async fn resume_arena(&self, command: LifecycleCommand) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        self.transition(command, move |arena| arena.resume(now, command.actor))
            .await
    }

    /// Stops an arena. Stopping a finished arena is a no-op success.
    #[instrument(skip(self), fields(arena_id = %command.arena_id))]
    pub async fn stop_arena(&self, command: LifecycleCommand) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        self.transition(command, move |arena| arena.stop(now, command.actor))
            .await
    }

    async fn transition<F>(
        &self,
        command: LifecycleCommand,
        apply: F,
    ) -> Result<(), ApplicationError>
    where
        F: FnOnce(&mut Arena) -> Result<(), ArenaError> + Send,
    {
        let id = command.arena_id;
        let mut tx = self.uow.begin().await?;
        let staged = async {
            let mut arena = tx
                .get_arena(id)
                .await?
                .ok_or(ApplicationError::NotFound(id))?;
            apply(&mut arena)?;
            let events = arena.drain_events();
            tx.save_arena(&arena).await?;
            self.publisher.publish(&mut tx, events).await?;
            Ok(())
        }
        .await;
        Self::finish(tx, staged).await
    }

    /// Commits on success, rolls back on error. A rollback failure is
    /// logged; the caller sees the original error.
    async fn finish(tx: U::Tx, staged: Result<(), ApplicationError>) -> Result<(), ApplicationError> {
        match staged {
            Ok(()) => tx.commit().await,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}
