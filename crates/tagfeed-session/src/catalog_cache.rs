//! Shared tag catalog cache.
//!
//! Holds every tag the session can see or select, sorted by name. Create and
//! delete workflows patch it locally to avoid a round trip; `refresh()`
//! discards local state after a mutation failure.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use tagfeed_core::{ListTagsFilter, Result, Tag, TagStore};

struct CatalogState {
    tags: Vec<Tag>,
    last_refresh: Option<Instant>,
}

/// TTL-revalidated catalog of all visible tags.
pub struct TagCatalogCache {
    store: Arc<dyn TagStore>,
    ttl: Duration,
    state: RwLock<CatalogState>,
}

impl TagCatalogCache {
    pub fn new(store: Arc<dyn TagStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: RwLock::new(CatalogState {
                tags: Vec::new(),
                last_refresh: None,
            }),
        }
    }

    /// Current catalog; `[]` while unloaded.
    pub async fn list(&self) -> Vec<Tag> {
        self.state.read().await.tags.clone()
    }

    pub async fn is_stale(&self) -> bool {
        let state = self.state.read().await;
        match state.last_refresh {
            Some(at) => at.elapsed() > self.ttl,
            None => true,
        }
    }

    /// Load the catalog if stale.
    pub async fn load_if_stale(&self) -> Result<bool> {
        if !self.is_stale().await {
            return Ok(false);
        }
        self.refresh().await?;
        Ok(true)
    }

    /// Forced full refetch, discarding any local patches.
    pub async fn refresh(&self) -> Result<()> {
        let tags = self.store.list_tags(ListTagsFilter::default()).await?;
        let mut state = self.state.write().await;
        debug!(
            subsystem = "session",
            op = "catalog_refresh",
            result_count = tags.len(),
            "tag catalog refreshed"
        );
        state.tags = tags;
        state.last_refresh = Some(Instant::now());
        Ok(())
    }

    /// Append a confirmed tag, de-duping by name (first match wins; guards
    /// against double-submission races), then re-sort by name.
    pub async fn insert_local(&self, tag: Tag) {
        let mut state = self.state.write().await;
        if state.tags.iter().any(|t| t.name == tag.name) {
            debug!(
                subsystem = "session",
                op = "catalog_insert",
                tag_name = %tag.name,
                "duplicate name, insert skipped"
            );
            return;
        }
        state.tags.push(tag);
        state.tags.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Replace a renamed tag in place, then re-sort by name.
    pub async fn replace_local(&self, tag: Tag) {
        let mut state = self.state.write().await;
        if let Some(existing) = state.tags.iter_mut().find(|t| t.id == tag.id) {
            *existing = tag;
            state.tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }

    /// Filter out the given tag ids.
    pub async fn remove_local(&self, ids: &HashSet<Uuid>) {
        let mut state = self.state.write().await;
        state.tags.retain(|t| !ids.contains(&t.id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tagfeed_db::MemoryStore;

    fn tag(name: &str) -> Tag {
        Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
            created_by: "user-1".to_string(),
            usage_count: None,
        }
    }

    fn catalog() -> TagCatalogCache {
        TagCatalogCache::new(Arc::new(MemoryStore::new()), Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_list_empty_while_unloaded() {
        assert!(catalog().list().await.is_empty());
    }

    #[tokio::test]
    async fn test_insert_local_sorts_by_name() {
        let catalog = catalog();
        catalog.insert_local(tag("zebra")).await;
        catalog.insert_local(tag("alpha")).await;

        let names: Vec<String> = catalog.list().await.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }

    #[tokio::test]
    async fn test_insert_local_dedupes_by_name() {
        let catalog = catalog();
        let first = tag("work");
        catalog.insert_local(first.clone()).await;
        catalog.insert_local(tag("work")).await;

        let tags = catalog.list().await;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, first.id);
    }

    #[tokio::test]
    async fn test_remove_local_filters_ids() {
        let catalog = catalog();
        let keep = tag("keep");
        let drop = tag("drop");
        catalog.insert_local(keep.clone()).await;
        catalog.insert_local(drop.clone()).await;

        let ids: HashSet<Uuid> = [drop.id].into_iter().collect();
        catalog.remove_local(&ids).await;

        let tags = catalog.list().await;
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_replace_local_resorts() {
        let catalog = catalog();
        let a = tag("alpha");
        catalog.insert_local(a.clone()).await;
        catalog.insert_local(tag("middle")).await;

        let renamed = Tag {
            name: "zulu".to_string(),
            ..a
        };
        catalog.replace_local(renamed).await;

        let names: Vec<String> = catalog.list().await.iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["middle", "zulu"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_pulls_from_store() {
        let store = Arc::new(MemoryStore::new());
        store.create_tag("remote", "user-1").await.unwrap();

        let catalog = TagCatalogCache::new(store.clone(), Duration::from_secs(300));
        assert!(catalog.load_if_stale().await.unwrap());
        assert_eq!(catalog.list().await.len(), 1);

        // Fresh snapshot: second load is a no-op.
        assert!(!catalog.load_if_stale().await.unwrap());

        store.create_tag("later", "user-1").await.unwrap();
        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(catalog.load_if_stale().await.unwrap());
        assert_eq!(catalog.list().await.len(), 2);
    }
}
