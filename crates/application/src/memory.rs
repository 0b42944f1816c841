//! In-memory unit of work.
//!
//! Backs the command handler in tests. Writes are staged on the
//! transaction and flushed to the shared maps on commit; a tokio mutex
//! stands in for the row lock, serializing whole transactions the way
//! row-level locking serializes per-aggregate commands.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use common::types::ArenaId;
use domain::Arena;
use outbox::{InMemoryOutboxStore, NewOutboxRecord, OutboxStore};

use crate::error::ApplicationError;
use crate::ports::{ArenaTx, UnitOfWork};

/// Unit of work over in-memory maps and an in-memory outbox store.
#[derive(Clone)]
pub struct InMemoryUnitOfWork {
    arenas: Arc<RwLock<HashMap<ArenaId, Arena>>>,
    outbox: Arc<InMemoryOutboxStore>,
    tx_lock: Arc<Mutex<()>>,
}

impl InMemoryUnitOfWork {
    pub fn new(outbox: Arc<InMemoryOutboxStore>) -> Self {
        Self {
            arenas: Arc::new(RwLock::new(HashMap::new())),
            outbox,
            tx_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Committed state of one arena, for assertions.
    pub async fn arena(&self, id: ArenaId) -> Option<Arena> {
        self.arenas.read().await.get(&id).cloned()
    }

    pub async fn arena_count(&self) -> usize {
        self.arenas.read().await.len()
    }
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, ApplicationError> {
        let guard = self.tx_lock.clone().lock_owned().await;
        Ok(InMemoryTx {
            arenas: self.arenas.clone(),
            outbox: self.outbox.clone(),
            staged_arenas: Vec::new(),
            staged_outbox: Vec::new(),
            _guard: guard,
        })
    }
}

/// One open in-memory transaction. Dropping it without committing
/// discards the staged writes, which is exactly rollback.
pub struct InMemoryTx {
    arenas: Arc<RwLock<HashMap<ArenaId, Arena>>>,
    outbox: Arc<InMemoryOutboxStore>,
    staged_arenas: Vec<Arena>,
    staged_outbox: Vec<NewOutboxRecord>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl ArenaTx for InMemoryTx {
    async fn get_arena(&mut self, id: ArenaId) -> Result<Option<Arena>, ApplicationError> {
        // Uncommitted writes from this transaction win over the shared map.
        if let Some(staged) = self.staged_arenas.iter().rev().find(|a| a.id() == id) {
            return Ok(Some(staged.clone()));
        }
        Ok(self.arenas.read().await.get(&id).cloned())
    }

    async fn save_arena(&mut self, arena: &Arena) -> Result<(), ApplicationError> {
        self.staged_arenas.push(arena.clone());
        Ok(())
    }

    async fn enqueue_outbox(
        &mut self,
        records: Vec<NewOutboxRecord>,
    ) -> Result<(), ApplicationError> {
        self.staged_outbox.extend(records);
        Ok(())
    }

    async fn commit(self) -> Result<(), ApplicationError> {
        {
            let mut arenas = self.arenas.write().await;
            for arena in self.staged_arenas {
                arenas.insert(arena.id(), arena);
            }
        }
        if !self.staged_outbox.is_empty() {
            self.outbox.enqueue(self.staged_outbox).await?;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), ApplicationError> {
        Ok(())
    }
}
