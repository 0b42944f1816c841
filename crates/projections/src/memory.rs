//! In-memory read store.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use common::clock::Clock;

use crate::error::ProjectionError;
use crate::read_store::{ReadStore, WriteOp};
use crate::view::ArenaView;

#[derive(Default)]
struct State {
    records: HashMap<String, ArenaView>,
    status_index: HashMap<String, BTreeSet<String>>,
    // creation instant -> arena ids, for stable listing order
    created_index: BTreeMap<DateTime<Utc>, BTreeSet<String>>,
    markers: HashMap<String, DateTime<Utc>>,
}

/// Read store backed by maps under a single lock, so each batch of
/// writes is observed atomically.
#[derive(Clone)]
pub struct InMemoryReadStore {
    state: Arc<Mutex<State>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryReadStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State::default())),
            clock,
        }
    }

    /// Snapshot of one record, for queries and assertions.
    pub async fn record(&self, arena_id: &str) -> Option<ArenaView> {
        self.state.lock().await.records.get(arena_id).cloned()
    }

    /// Members of one status index set.
    pub async fn status_members(&self, status: &str) -> Vec<String> {
        self.state
            .lock()
            .await
            .status_index
            .get(status)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) async fn list(
        &self,
        status: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> (Vec<ArenaView>, usize) {
        let state = self.state.lock().await;
        let ordered: Vec<&ArenaView> = state
            .created_index
            .values()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| state.records.get(id))
            .filter(|view| status.map(|s| view.status == s).unwrap_or(true))
            .collect();
        let total = ordered.len();
        let page = ordered
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        (page, total)
    }
}

#[async_trait]
impl ReadStore for InMemoryReadStore {
    async fn mark_processed(
        &self,
        event_id: &str,
        ttl: Duration,
    ) -> Result<bool, ProjectionError> {
        let now = self.clock.now();
        let expires = now
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(24));
        let mut state = self.state.lock().await;
        match state.markers.get(event_id) {
            Some(existing) if *existing > now => Ok(false),
            _ => {
                state.markers.insert(event_id.to_string(), expires);
                Ok(true)
            }
        }
    }

    async fn get_status(&self, arena_id: &str) -> Result<Option<String>, ProjectionError> {
        Ok(self
            .state
            .lock()
            .await
            .records
            .get(arena_id)
            .map(|view| view.status.clone()))
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), ProjectionError> {
        let mut state = self.state.lock().await;
        for op in ops {
            match op {
                WriteOp::PutRecord(view) => {
                    state.records.insert(view.id.clone(), view);
                }
                WriteOp::SetStatus {
                    arena_id,
                    status,
                    updated_at,
                } => {
                    // A status event can outrun its create event; keep a
                    // stub so the status is not lost.
                    let view = state.records.entry(arena_id.clone()).or_insert_with(|| {
                        ArenaView {
                            id: arena_id,
                            name: String::new(),
                            status: String::new(),
                            created_at: updated_at,
                            updated_at,
                            config_json: String::new(),
                        }
                    });
                    view.status = status;
                    view.updated_at = updated_at;
                }
                WriteOp::IndexAdd { status, arena_id } => {
                    state.status_index.entry(status).or_default().insert(arena_id);
                }
                WriteOp::IndexRemove { status, arena_id } => {
                    if let Some(set) = state.status_index.get_mut(&status) {
                        set.remove(&arena_id);
                    }
                }
                WriteOp::CreatedIndexAdd {
                    arena_id,
                    created_at,
                } => {
                    state
                        .created_index
                        .entry(created_at)
                        .or_default()
                        .insert(arena_id);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::clock::{FixedClock, SystemClock};

    fn view(id: &str, status: &str) -> ArenaView {
        ArenaView {
            id: id.to_string(),
            name: format!("arena {id}"),
            status: status.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            config_json: "{}".to_string(),
        }
    }

    #[tokio::test]
    async fn marker_is_set_once_until_expiry() {
        let clock = Arc::new(FixedClock::new(Utc::now()));
        let store = InMemoryReadStore::new(clock.clone());

        assert!(store
            .mark_processed("e-1", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!store
            .mark_processed("e-1", Duration::from_secs(60))
            .await
            .unwrap());

        clock.advance(chrono::Duration::seconds(61));
        assert!(store
            .mark_processed("e-1", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn batch_put_and_index_ops_apply_atomically() {
        let store = InMemoryReadStore::new(Arc::new(SystemClock));
        let v = view("a-1", "PENDING");
        store
            .apply(vec![
                WriteOp::PutRecord(v.clone()),
                WriteOp::IndexAdd {
                    status: "PENDING".to_string(),
                    arena_id: "a-1".to_string(),
                },
                WriteOp::CreatedIndexAdd {
                    arena_id: "a-1".to_string(),
                    created_at: v.created_at,
                },
            ])
            .await
            .unwrap();

        assert_eq!(store.record("a-1").await.unwrap().status, "PENDING");
        assert_eq!(store.status_members("PENDING").await, vec!["a-1"]);
        assert_eq!(store.get_status("a-1").await.unwrap().as_deref(), Some("PENDING"));
    }

    #[tokio::test]
    async fn set_status_on_missing_record_creates_a_stub() {
        let store = InMemoryReadStore::new(Arc::new(SystemClock));
        let now = Utc::now();
        store
            .apply(vec![WriteOp::SetStatus {
                arena_id: "a-ghost".to_string(),
                status: "RUNNING".to_string(),
                updated_at: now,
            }])
            .await
            .unwrap();

        let stub = store.record("a-ghost").await.unwrap();
        assert_eq!(stub.status, "RUNNING");
        assert!(stub.name.is_empty());
    }

    #[tokio::test]
    async fn index_remove_tolerates_absent_set() {
        let store = InMemoryReadStore::new(Arc::new(SystemClock));
        store
            .apply(vec![WriteOp::IndexRemove {
                status: "RUNNING".to_string(),
                arena_id: "a-1".to_string(),
            }])
            .await
            .unwrap();
        assert!(store.status_members("RUNNING").await.is_empty());
    }

    #[tokio::test]
    async fn list_orders_by_creation_and_paginates() {
        let store = InMemoryReadStore::new(Arc::new(SystemClock));
        let base = Utc::now();
        for (i, id) in ["a-1", "a-2", "a-3"].iter().enumerate() {
            let mut v = view(id, "PENDING");
            v.created_at = base + chrono::Duration::seconds(i as i64);
            store
                .apply(vec![
                    WriteOp::PutRecord(v.clone()),
                    WriteOp::CreatedIndexAdd {
                        arena_id: id.to_string(),
                        created_at: v.created_at,
                    },
                ])
                .await
                .unwrap();
        }

        let (page, total) = store.list(None, 2, 1).await;
        assert_eq!(total, 3);
        let ids: Vec<&str> = page.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a-2", "a-3"]);
    }
}
