//! Query surface over the read store.

use async_trait::async_trait;

use crate::error::ProjectionError;
use crate::memory::InMemoryReadStore;
use crate::view::ArenaView;

/// What the query side of the API reads. Listing is ordered by
/// creation time and returns the total alongside the page.
#[async_trait]
pub trait ArenaReadRepository: Send + Sync {
    async fn get_arena(&self, arena_id: &str) -> Result<Option<ArenaView>, ProjectionError>;

    async fn list_arenas(
        &self,
        status: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ArenaView>, usize), ProjectionError>;
}

#[async_trait]
impl ArenaReadRepository for InMemoryReadStore {
    async fn get_arena(&self, arena_id: &str) -> Result<Option<ArenaView>, ProjectionError> {
        Ok(self.record(arena_id).await)
    }

    async fn list_arenas(
        &self,
        status: Option<&str>,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<ArenaView>, usize), ProjectionError> {
        Ok(self.list(status, limit, offset).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_store::{ReadStore, WriteOp};
    use chrono::Utc;
    use common::clock::SystemClock;
    use std::sync::Arc;

    #[tokio::test]
    async fn list_filters_by_status() {
        let store = InMemoryReadStore::new(Arc::new(SystemClock));
        let base = Utc::now();
        for (i, (id, status)) in [("a-1", "PENDING"), ("a-2", "RUNNING"), ("a-3", "PENDING")]
            .iter()
            .enumerate()
        {
            let created_at = base + chrono::Duration::seconds(i as i64);
            store
                .apply(vec![
                    WriteOp::PutRecord(ArenaView {
                        id: id.to_string(),
                        name: format!("arena {id}"),
                        status: status.to_string(),
                        created_at,
                        updated_at: created_at,
                        config_json: "{}".to_string(),
                    }),
                    WriteOp::CreatedIndexAdd {
                        arena_id: id.to_string(),
                        created_at,
                    },
                ])
                .await
                .unwrap();
        }

        let (page, total) = store.list_arenas(Some("PENDING"), 10, 0).await.unwrap();
        assert_eq!(total, 2);
        let ids: Vec<&str> = page.iter().map(|v| v.id.as_str()).collect();
        assert_eq!(ids, vec!["a-1", "a-3"]);

        let missing = store.get_arena("a-404").await.unwrap();
        assert!(missing.is_none());
    }
}
