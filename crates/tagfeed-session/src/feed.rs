//! Cursor-paginated chat feed with accumulation.
//!
//! Page 0 returns the newest chats; each later page requests chats strictly
//! older than the last chat of the previous page. Once any page reports
//! `has_more == false` the feed latches closed and no further requests are
//! issued. Chat deletion is observed locally without a refetch.

use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::debug;
use uuid::Uuid;

use tagfeed_core::defaults::PAGE_SIZE;
use tagfeed_core::{Chat, ChatStore, Result};

#[derive(Default)]
struct FeedState {
    chats: Vec<Chat>,
    reached_end: bool,
    pages_loaded: usize,
}

/// Accumulating view over the user's paginated chat history.
pub struct ChatFeed {
    store: Arc<dyn ChatStore>,
    user_id: String,
    page_size: usize,
    state: RwLock<FeedState>,
    /// Serializes page loads; renders may still read the accumulated state
    /// while a fetch is in flight.
    load_lock: Mutex<()>,
}

impl ChatFeed {
    pub fn new(store: Arc<dyn ChatStore>, user_id: impl Into<String>) -> Self {
        Self::with_page_size(store, user_id, PAGE_SIZE)
    }

    pub fn with_page_size(
        store: Arc<dyn ChatStore>,
        user_id: impl Into<String>,
        page_size: usize,
    ) -> Self {
        Self {
            store,
            user_id: user_id.into(),
            page_size,
            state: RwLock::new(FeedState::default()),
            load_lock: Mutex::new(()),
        }
    }

    /// Fetch and accumulate the next page. Returns the number of chats added;
    /// zero (without a store call) once the feed has reached its end.
    pub async fn load_next_page(&self) -> Result<usize> {
        let _guard = self.load_lock.lock().await;

        let cursor = {
            let state = self.state.read().await;
            if state.reached_end {
                return Ok(0);
            }
            state.chats.last().map(|chat| chat.id)
        };

        let page = self
            .store
            .list_chats(&self.user_id, self.page_size, cursor)
            .await?;

        let mut state = self.state.write().await;
        state.pages_loaded += 1;
        if !page.has_more {
            state.reached_end = true;
        }
        let added = page.chats.len();
        debug!(
            subsystem = "session",
            op = "load_page",
            user_id = %self.user_id,
            result_count = added,
            reached_end = state.reached_end,
            "chat page accumulated"
        );
        state.chats.extend(page.chats);
        Ok(added)
    }

    /// All accumulated chats, newest-first across pages.
    pub async fn chats(&self) -> Vec<Chat> {
        self.state.read().await.chats.clone()
    }

    /// Remove a deleted chat from the accumulated set by id.
    pub async fn remove_chat(&self, chat_id: Uuid) {
        let mut state = self.state.write().await;
        state.chats.retain(|chat| chat.id != chat_id);
    }

    /// True once a page has reported `has_more == false`.
    pub async fn reached_end(&self) -> bool {
        self.state.read().await.reached_end
    }

    /// True when at least one page loaded and nothing accumulated.
    pub async fn is_empty(&self) -> bool {
        let state = self.state.read().await;
        state.pages_loaded > 0 && state.chats.is_empty()
    }

    pub async fn total(&self) -> usize {
        self.state.read().await.chats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tagfeed_core::Visibility;
    use tagfeed_db::MemoryStore;

    async fn seeded_store(count: usize) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        for i in 0..count {
            store
                .insert_chat(
                    "user-1",
                    Chat {
                        id: Uuid::new_v4(),
                        created_at: Utc::now() - Duration::hours(i as i64),
                        title: format!("chat {}", i),
                        visibility: Visibility::Private,
                    },
                )
                .await;
        }
        store
    }

    #[tokio::test]
    async fn test_accumulates_pages_newest_first() {
        let store = seeded_store(5).await;
        let feed = ChatFeed::with_page_size(store, "user-1", 2);

        assert_eq!(feed.load_next_page().await.unwrap(), 2);
        assert_eq!(feed.load_next_page().await.unwrap(), 2);
        assert_eq!(feed.total().await, 4);

        let chats = feed.chats().await;
        for pair in chats.windows(2) {
            assert!(pair[0].created_at > pair[1].created_at);
        }
    }

    #[tokio::test]
    async fn test_termination_latch_stops_requests() {
        // Exactly one full page: the first fetch returns PAGE_SIZE chats with
        // has_more true (over-fetch can't see past the boundary), the second
        // returns an empty terminal page, and nothing is requested after that.
        let store = seeded_store(2).await;
        let feed = ChatFeed::with_page_size(store.clone(), "user-1", 2);

        assert_eq!(feed.load_next_page().await.unwrap(), 2);
        assert!(!feed.reached_end().await);

        assert_eq!(feed.load_next_page().await.unwrap(), 0);
        assert!(feed.reached_end().await);
        assert_eq!(store.chat_list_calls().await, 2);

        assert_eq!(feed.load_next_page().await.unwrap(), 0);
        assert_eq!(feed.load_next_page().await.unwrap(), 0);
        assert_eq!(store.chat_list_calls().await, 2);
    }

    #[tokio::test]
    async fn test_short_page_latches_immediately() {
        let store = seeded_store(3).await;
        let feed = ChatFeed::with_page_size(store.clone(), "user-1", 20);

        assert_eq!(feed.load_next_page().await.unwrap(), 3);
        assert!(feed.reached_end().await);
        assert_eq!(store.chat_list_calls().await, 1);
    }

    #[tokio::test]
    async fn test_remove_chat_drops_locally() {
        let store = seeded_store(3).await;
        let feed = ChatFeed::with_page_size(store.clone(), "user-1", 20);
        feed.load_next_page().await.unwrap();

        let victim = feed.chats().await[1].id;
        feed.remove_chat(victim).await;

        assert_eq!(feed.total().await, 2);
        assert!(feed.chats().await.iter().all(|c| c.id != victim));
        // No refetch happened.
        assert_eq!(store.chat_list_calls().await, 1);
    }

    #[tokio::test]
    async fn test_is_empty_requires_a_loaded_page() {
        let store = seeded_store(0).await;
        let feed = ChatFeed::with_page_size(store, "user-1", 20);

        assert!(!feed.is_empty().await);
        feed.load_next_page().await.unwrap();
        assert!(feed.is_empty().await);
        assert!(feed.reached_end().await);
    }
}
