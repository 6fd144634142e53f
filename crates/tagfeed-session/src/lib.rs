//! # tagfeed-session
//!
//! Per-user-session client-side state for tagfeed: the shared association and
//! catalog caches, the accumulating paginated chat feed, the ephemeral
//! selected-tag set, and the mutation workflows that keep all of them
//! consistent with the store.
//!
//! A [`Session`] bundles one instance of each, shares them via `Arc`, and
//! derives the filtered, date-grouped history view on demand. A patch made by
//! one consumer is immediately visible to every other consumer of the same
//! session; that shared-instance visibility is the consistency mechanism and
//! there is no push invalidation.

pub mod association_cache;
pub mod catalog_cache;
pub mod feed;
pub mod orchestrator;
pub mod selection;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::warn;

use tagfeed_core::defaults::CACHE_TTL_SECS;
use tagfeed_core::{filtered_view, ChatStore, FilteredView, Result, TagStore};

pub use association_cache::AssociationCache;
pub use catalog_cache::TagCatalogCache;
pub use feed::ChatFeed;
pub use orchestrator::{
    ChatTagOutcome, DeleteTagsOutcome, FailedTagOp, MutationOrchestrator, TagOp,
};
pub use selection::Selection;

/// One user's session: shared caches, feed, selection, and mutation
/// workflows over a pair of stores.
pub struct Session {
    user_id: String,
    pub associations: Arc<AssociationCache>,
    pub catalog: Arc<TagCatalogCache>,
    pub feed: Arc<ChatFeed>,
    pub selection: Arc<Selection>,
    pub mutations: MutationOrchestrator,
}

impl Session {
    /// Build a session with the default revalidation TTL.
    pub fn new(
        tag_store: Arc<dyn TagStore>,
        chat_store: Arc<dyn ChatStore>,
        user_id: impl Into<String>,
    ) -> Self {
        Self::with_ttl(
            tag_store,
            chat_store,
            user_id,
            Duration::from_secs(CACHE_TTL_SECS),
        )
    }

    pub fn with_ttl(
        tag_store: Arc<dyn TagStore>,
        chat_store: Arc<dyn ChatStore>,
        user_id: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        let user_id = user_id.into();
        let associations = Arc::new(AssociationCache::new(Arc::clone(&tag_store), ttl));
        let catalog = Arc::new(TagCatalogCache::new(Arc::clone(&tag_store), ttl));
        let feed = Arc::new(ChatFeed::new(chat_store, user_id.clone()));
        let selection = Arc::new(Selection::new());
        let mutations = MutationOrchestrator::new(
            tag_store,
            Arc::clone(&associations),
            Arc::clone(&catalog),
            Arc::clone(&selection),
            user_id.clone(),
        );

        Self {
            user_id,
            associations,
            catalog,
            feed,
            selection,
            mutations,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Prime both caches and load the first history page.
    pub async fn initialize(&self) -> Result<()> {
        self.associations.prime(&self.user_id).await?;
        self.catalog.load_if_stale().await?;
        self.feed.load_next_page().await?;
        Ok(())
    }

    /// TTL-driven revalidation of both caches; cheap when everything is
    /// fresh.
    pub async fn revalidate(&self) -> Result<()> {
        self.associations.revalidate_if_stale(&self.user_id).await?;
        self.catalog.load_if_stale().await?;
        Ok(())
    }

    /// Spawn a background task that revalidates both caches every `period`.
    /// Each pass is a no-op while the snapshots are within TTL. The returned
    /// handle lets the caller stop the task when the session ends.
    pub fn spawn_revalidator(self: &Arc<Self>, period: Duration) -> tokio::task::JoinHandle<()> {
        let session = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(err) = session.revalidate().await {
                    warn!(
                        subsystem = "session",
                        op = "revalidate",
                        error = %err,
                        "background revalidation failed"
                    );
                }
            }
        })
    }

    /// The chat subsystem deleted a chat; drop it from the accumulated feed
    /// without a refetch.
    pub async fn observe_chat_deleted(&self, chat_id: uuid::Uuid) {
        self.feed.remove_chat(chat_id).await;
    }

    /// Derive the filtered, date-grouped history view from current state.
    pub async fn view(&self, now: DateTime<Utc>) -> FilteredView {
        let chats = self.feed.chats().await;
        let selected = self.selection.selected().await;
        let associations = self.associations.snapshot().await;
        filtered_view(&chats, &selected, &associations, now)
    }
}
