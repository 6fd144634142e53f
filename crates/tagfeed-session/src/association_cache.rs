//! Shared chat→tags association cache.
//!
//! Single source of truth, per rendering cycle, for "which tags does chat X
//! currently show". Primed by one bulk snapshot fetch, patched directly by
//! mutation workflows, and revalidated on a long TTL since writes keep it
//! current. `bust()` forces the next prime to refetch, used when a tag
//! deletion cascades through associations the client cannot enumerate.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

use tagfeed_core::{Result, Tag, TagStore};

struct CacheState {
    by_chat: HashMap<Uuid, Vec<Tag>>,
    last_refresh: Option<Instant>,
}

/// Shared, TTL-revalidated `chat_id -> Vec<Tag>` snapshot.
pub struct AssociationCache {
    store: Arc<dyn TagStore>,
    ttl: Duration,
    state: RwLock<CacheState>,
}

impl AssociationCache {
    pub fn new(store: Arc<dyn TagStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            state: RwLock::new(CacheState {
                by_chat: HashMap::new(),
                last_refresh: None,
            }),
        }
    }

    /// True when the snapshot has never loaded, was busted, or outlived the
    /// TTL.
    pub async fn is_stale(&self) -> bool {
        let state = self.state.read().await;
        match state.last_refresh {
            Some(at) => at.elapsed() > self.ttl,
            None => true,
        }
    }

    /// Load the bulk association snapshot if stale; a fresh snapshot makes
    /// this a no-op.
    pub async fn prime(&self, user_id: &str) -> Result<()> {
        if !self.is_stale().await {
            debug!(subsystem = "session", op = "prime", "association snapshot fresh");
            return Ok(());
        }

        let snapshot = self.store.all_associations_for_user(user_id).await?;
        let mut state = self.state.write().await;
        debug!(
            subsystem = "session",
            op = "prime",
            user_id = user_id,
            result_count = snapshot.len(),
            "association snapshot loaded"
        );
        state.by_chat = snapshot;
        state.last_refresh = Some(Instant::now());
        Ok(())
    }

    /// Current tag list for a chat; `[]` when absent, never None.
    pub async fn get(&self, chat_id: Uuid) -> Vec<Tag> {
        let state = self.state.read().await;
        state.by_chat.get(&chat_id).cloned().unwrap_or_default()
    }

    /// Full snapshot for the filter engine.
    pub async fn snapshot(&self) -> HashMap<Uuid, Vec<Tag>> {
        self.state.read().await.by_chat.clone()
    }

    /// Replace one chat's tag list without touching other entries.
    /// Last-writer-wins at single-key granularity; duplicate tag ids are
    /// dropped (first occurrence wins).
    pub async fn patch(&self, chat_id: Uuid, tags: Vec<Tag>) {
        let mut deduped: Vec<Tag> = Vec::with_capacity(tags.len());
        for tag in tags {
            if !deduped.iter().any(|t| t.id == tag.id) {
                deduped.push(tag);
            }
        }

        let mut state = self.state.write().await;
        debug!(
            subsystem = "session",
            op = "patch",
            chat_id = %chat_id,
            result_count = deduped.len(),
            "association entry patched"
        );
        state.by_chat.insert(chat_id, deduped);
    }

    /// Drop the snapshot; the next `prime` refetches unconditionally.
    pub async fn bust(&self) {
        let mut state = self.state.write().await;
        debug!(subsystem = "session", op = "bust", "association snapshot busted");
        state.by_chat.clear();
        state.last_refresh = None;
    }

    /// TTL check followed by a re-prime when due. Returns whether a refresh
    /// happened.
    pub async fn revalidate_if_stale(&self, user_id: &str) -> Result<bool> {
        if self.is_stale().await {
            self.prime(user_id).await?;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
