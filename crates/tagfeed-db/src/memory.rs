//! In-memory store implementation.
//!
//! Implements the same contracts as the PostgreSQL stores over process-local
//! state. Always compiled (not `#[cfg(test)]`) so the session and API crates
//! can use it from their integration tests; also carries targeted failure
//! injection for exercising partial-failure reconciliation paths.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use tagfeed_core::defaults::validate_tag_name;
use tagfeed_core::{
    Chat, ChatPage, ChatStore, ChatTagAssociation, Error, ListTagsFilter, Result, Tag, TagStore,
};

#[derive(Default)]
struct MemoryState {
    tags: HashMap<Uuid, Tag>,
    /// `(chat_id, tag_id)` pairs; the uniqueness invariant is the set itself.
    associations: HashSet<(Uuid, Uuid)>,
    /// chat id -> (owning user, chat record)
    chats: HashMap<Uuid, (String, Chat)>,
    /// Tag ids whose attach/detach/delete calls fail with an injected error.
    fail_attach: HashSet<Uuid>,
    fail_detach: HashSet<Uuid>,
    fail_delete: HashSet<Uuid>,
    list_chat_calls: usize,
}

/// In-memory [`TagStore`] + [`ChatStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a chat owned by `user_id`.
    pub async fn insert_chat(&self, user_id: &str, chat: Chat) {
        let mut state = self.state.write().await;
        state.chats.insert(chat.id, (user_id.to_string(), chat));
    }

    /// Remove a chat and its associations (the owning subsystem deleted it).
    pub async fn delete_chat(&self, chat_id: Uuid) {
        let mut state = self.state.write().await;
        state.chats.remove(&chat_id);
        state.associations.retain(|(c, _)| *c != chat_id);
    }

    /// Make every subsequent attach of `tag_id` fail.
    pub async fn fail_attach_of(&self, tag_id: Uuid) {
        self.state.write().await.fail_attach.insert(tag_id);
    }

    /// Make every subsequent detach of `tag_id` fail.
    pub async fn fail_detach_of(&self, tag_id: Uuid) {
        self.state.write().await.fail_detach.insert(tag_id);
    }

    /// Make every subsequent delete of `tag_id` fail.
    pub async fn fail_delete_of(&self, tag_id: Uuid) {
        self.state.write().await.fail_delete.insert(tag_id);
    }

    /// Number of `list_chats` calls served so far.
    pub async fn chat_list_calls(&self) -> usize {
        self.state.read().await.list_chat_calls
    }

    /// Current association count (test assertions).
    pub async fn association_count(&self) -> usize {
        self.state.read().await.associations.len()
    }

    fn sorted_by_name(mut tags: Vec<Tag>) -> Vec<Tag> {
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags
    }
}

#[async_trait]
impl TagStore for MemoryStore {
    async fn list_tags(&self, filter: ListTagsFilter) -> Result<Vec<Tag>> {
        let state = self.state.read().await;

        let mut tags: Vec<Tag> = if let Some(name) = &filter.by_name {
            state
                .tags
                .values()
                .filter(|t| &t.name == name)
                .cloned()
                .collect()
        } else if let Some(creator) = &filter.by_creator {
            state
                .tags
                .values()
                .filter(|t| &t.created_by == creator)
                .cloned()
                .collect()
        } else if filter.active_only {
            let active: HashSet<Uuid> = state.associations.iter().map(|(_, t)| *t).collect();
            state
                .tags
                .values()
                .filter(|t| active.contains(&t.id))
                .cloned()
                .collect()
        } else {
            state.tags.values().cloned().collect()
        };

        if filter.with_usage_count {
            for tag in &mut tags {
                let count = state
                    .associations
                    .iter()
                    .filter(|(_, t)| *t == tag.id)
                    .count() as i64;
                tag.usage_count = Some(count);
            }
        }

        Ok(Self::sorted_by_name(tags))
    }

    async fn get_tag(&self, id: Uuid) -> Result<Tag> {
        let state = self.state.read().await;
        state.tags.get(&id).cloned().ok_or(Error::TagNotFound(id))
    }

    async fn create_tag(&self, name: &str, creator_id: &str) -> Result<Tag> {
        let name = validate_tag_name(name).map_err(Error::InvalidInput)?;
        let mut state = self.state.write().await;

        if state.tags.values().any(|t| t.name == name) {
            return Err(Error::Conflict(format!(
                "A tag named '{}' already exists",
                name
            )));
        }

        let tag = Tag::new(name, creator_id);
        state.tags.insert(tag.id, tag.clone());
        Ok(tag)
    }

    async fn update_tag(&self, id: Uuid, name: &str) -> Result<Tag> {
        let name = validate_tag_name(name).map_err(Error::InvalidInput)?;
        let mut state = self.state.write().await;

        if state.tags.values().any(|t| t.name == name && t.id != id) {
            return Err(Error::Conflict(format!(
                "A tag named '{}' already exists",
                name
            )));
        }

        let tag = state.tags.get_mut(&id).ok_or(Error::TagNotFound(id))?;
        tag.name = name.to_string();
        Ok(tag.clone())
    }

    async fn delete_tag(&self, id: Uuid) -> Result<Tag> {
        let mut state = self.state.write().await;

        if state.fail_delete.contains(&id) {
            return Err(Error::Internal("injected delete failure".to_string()));
        }

        let tag = state.tags.remove(&id).ok_or(Error::TagNotFound(id))?;
        state.associations.retain(|(_, t)| *t != id);
        Ok(tag)
    }

    async fn list_tags_for_chat(&self, chat_id: Uuid) -> Result<Vec<Tag>> {
        let state = self.state.read().await;
        let tags = state
            .associations
            .iter()
            .filter(|(c, _)| *c == chat_id)
            .filter_map(|(_, t)| state.tags.get(t).cloned())
            .collect();
        Ok(Self::sorted_by_name(tags))
    }

    async fn list_chats_for_tag(&self, tag_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .associations
            .iter()
            .filter(|(_, t)| *t == tag_id)
            .map(|(c, _)| *c)
            .collect())
    }

    async fn all_associations_for_user(
        &self,
        user_id: &str,
    ) -> Result<HashMap<Uuid, Vec<Tag>>> {
        let state = self.state.read().await;
        let mut by_chat: HashMap<Uuid, Vec<Tag>> = HashMap::new();

        for (chat_id, tag_id) in &state.associations {
            let owned = state
                .chats
                .get(chat_id)
                .map(|(owner, _)| owner == user_id)
                .unwrap_or(false);
            if !owned {
                continue;
            }
            if let Some(tag) = state.tags.get(tag_id) {
                by_chat.entry(*chat_id).or_default().push(tag.clone());
            }
        }

        for tags in by_chat.values_mut() {
            tags.sort_by(|a, b| a.name.cmp(&b.name));
        }
        Ok(by_chat)
    }

    async fn attach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<ChatTagAssociation> {
        let mut state = self.state.write().await;

        if state.fail_attach.contains(&tag_id) {
            return Err(Error::Internal("injected attach failure".to_string()));
        }
        if !state.tags.contains_key(&tag_id) {
            return Err(Error::TagNotFound(tag_id));
        }

        // Idempotent: inserting an existing pair leaves the set unchanged.
        state.associations.insert((chat_id, tag_id));
        Ok(ChatTagAssociation { chat_id, tag_id })
    }

    async fn detach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;

        if state.fail_detach.contains(&tag_id) {
            return Err(Error::Internal("injected detach failure".to_string()));
        }

        // Removing a non-existent pair is a no-op success.
        state.associations.remove(&(chat_id, tag_id));
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn list_chats(
        &self,
        user_id: &str,
        limit: usize,
        ending_before: Option<Uuid>,
    ) -> Result<ChatPage> {
        let mut state = self.state.write().await;
        state.list_chat_calls += 1;

        let mut chats: Vec<Chat> = state
            .chats
            .values()
            .filter(|(owner, _)| owner == user_id)
            .map(|(_, chat)| chat.clone())
            .collect();
        chats.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(cursor) = ending_before {
            let cursor_created_at = state
                .chats
                .get(&cursor)
                .map(|(_, chat)| chat.created_at)
                .ok_or(Error::ChatNotFound(cursor))?;
            chats.retain(|c| c.created_at < cursor_created_at);
        }

        if limit == 0 {
            return Ok(ChatPage {
                chats: Vec::new(),
                has_more: false,
            });
        }

        chats.truncate(limit);
        let has_more = chats.len() == limit;
        Ok(ChatPage { chats, has_more })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tagfeed_core::Visibility;

    fn chat_at(offset_hours: i64) -> Chat {
        Chat {
            id: Uuid::new_v4(),
            created_at: Utc::now() - Duration::hours(offset_hours),
            title: "chat".to_string(),
            visibility: Visibility::Private,
        }
    }

    #[tokio::test]
    async fn test_attach_is_idempotent() {
        let store = MemoryStore::new();
        let tag = store.create_tag("work", "user-1").await.unwrap();
        let chat_id = Uuid::new_v4();

        for _ in 0..3 {
            store.attach(chat_id, tag.id).await.unwrap();
        }

        assert_eq!(store.association_count().await, 1);
        assert_eq!(store.list_tags_for_chat(chat_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_detach_missing_pair_is_noop() {
        let store = MemoryStore::new();
        let tag = store.create_tag("work", "user-1").await.unwrap();
        store.detach(Uuid::new_v4(), tag.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts() {
        let store = MemoryStore::new();
        store.create_tag("work", "user-1").await.unwrap();
        let err = store.create_tag("work", "user-2").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_rename_to_taken_name_conflicts() {
        let store = MemoryStore::new();
        store.create_tag("work", "user-1").await.unwrap();
        let other = store.create_tag("home", "user-1").await.unwrap();
        let err = store.update_tag(other.id, "work").await.unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_associations() {
        let store = MemoryStore::new();
        let tag = store.create_tag("work", "user-1").await.unwrap();
        let chats: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        for chat_id in &chats {
            store.attach(*chat_id, tag.id).await.unwrap();
        }

        let deleted = store.delete_tag(tag.id).await.unwrap();
        assert_eq!(deleted.id, tag.id);
        assert_eq!(store.association_count().await, 0);
        for chat_id in &chats {
            assert!(store.list_tags_for_chat(*chat_id).await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_list_tags_sorted_and_filtered() {
        let store = MemoryStore::new();
        let b = store.create_tag("beta", "user-1").await.unwrap();
        store.create_tag("alpha", "user-2").await.unwrap();
        store.attach(Uuid::new_v4(), b.id).await.unwrap();

        let all = store.list_tags(ListTagsFilter::default()).await.unwrap();
        let names: Vec<&str> = all.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);

        let active = store
            .list_tags(ListTagsFilter {
                active_only: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].name, "beta");

        let mine = store
            .list_tags(ListTagsFilter {
                by_creator: Some("user-2".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "alpha");
    }

    #[tokio::test]
    async fn test_usage_count_annotation() {
        let store = MemoryStore::new();
        let tag = store.create_tag("work", "user-1").await.unwrap();
        store.attach(Uuid::new_v4(), tag.id).await.unwrap();
        store.attach(Uuid::new_v4(), tag.id).await.unwrap();

        let tags = store
            .list_tags(ListTagsFilter {
                with_usage_count: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tags[0].usage_count, Some(2));
    }

    #[tokio::test]
    async fn test_bulk_snapshot_scoped_to_owner() {
        let store = MemoryStore::new();
        let tag = store.create_tag("work", "user-1").await.unwrap();

        let mine = chat_at(1);
        let theirs = chat_at(2);
        store.insert_chat("user-1", mine.clone()).await;
        store.insert_chat("user-2", theirs.clone()).await;
        store.attach(mine.id, tag.id).await.unwrap();
        store.attach(theirs.id, tag.id).await.unwrap();

        let snapshot = store.all_associations_for_user("user-1").await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains_key(&mine.id));
    }

    #[tokio::test]
    async fn test_cursor_pagination_newest_first() {
        let store = MemoryStore::new();
        let chats: Vec<Chat> = (0..5).map(chat_at).collect();
        for chat in &chats {
            store.insert_chat("user-1", chat.clone()).await;
        }

        let page = store.list_chats("user-1", 2, None).await.unwrap();
        assert_eq!(page.chats.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.chats[0].id, chats[0].id);

        let cursor = page.chats.last().unwrap().id;
        let page2 = store.list_chats("user-1", 2, Some(cursor)).await.unwrap();
        assert_eq!(page2.chats[0].id, chats[2].id);

        let err = store
            .list_chats("user-1", 2, Some(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ChatNotFound(_)));
    }
}
