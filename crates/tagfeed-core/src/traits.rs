//! Core traits for tagfeed abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// TAG STORE
// =============================================================================

/// Filter for listing tags from the catalog.
#[derive(Debug, Clone, Default)]
pub struct ListTagsFilter {
    /// Exact-match lookup by name.
    pub by_name: Option<String>,
    /// Restrict to tags created by this user.
    pub by_creator: Option<String>,
    /// Restrict to tags with at least one chat association.
    pub active_only: bool,
    /// Annotate each tag with its association count.
    pub with_usage_count: bool,
}

/// Store for tag entities and chat↔tag association rows.
///
/// Pure data-access contract: owns no caching and performs no authorization
/// checks. Callers pre-check creator ownership before `update_tag` and
/// `delete_tag`.
#[async_trait]
pub trait TagStore: Send + Sync {
    /// List tags visible to the caller, name-ascending.
    async fn list_tags(&self, filter: ListTagsFilter) -> Result<Vec<Tag>>;

    /// Fetch a tag by id.
    async fn get_tag(&self, id: Uuid) -> Result<Tag>;

    /// Create a tag. Names are globally unique, case-sensitive; a duplicate
    /// fails with `Error::Conflict`.
    async fn create_tag(&self, name: &str, creator_id: &str) -> Result<Tag>;

    /// Rename a tag. A duplicate target name fails with `Error::Conflict`.
    async fn update_tag(&self, id: Uuid, name: &str) -> Result<Tag>;

    /// Delete a tag, cascading removal of every chat association referencing
    /// it. Returns a snapshot of the deleted tag.
    async fn delete_tag(&self, id: Uuid) -> Result<Tag>;

    /// All tags attached to one chat, name-ascending.
    async fn list_tags_for_chat(&self, chat_id: Uuid) -> Result<Vec<Tag>>;

    /// Ids of all chats carrying one tag.
    async fn list_chats_for_tag(&self, tag_id: Uuid) -> Result<Vec<Uuid>>;

    /// Full association snapshot scoped to chats owned by `user_id`,
    /// grouped by chat. Used for bulk cache priming.
    async fn all_associations_for_user(
        &self,
        user_id: &str,
    ) -> Result<HashMap<Uuid, Vec<Tag>>>;

    /// Attach a tag to a chat. Attaching an already-attached pair is an
    /// idempotent no-op; either way the pair identity is returned.
    async fn attach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<ChatTagAssociation>;

    /// Detach a tag from a chat. Detaching a non-existent pair is a no-op
    /// success.
    async fn detach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<()>;
}

// =============================================================================
// CHAT STORE
// =============================================================================

/// Read-only access to the externally owned chat history.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// One page of the user's chats, newest-first.
    ///
    /// When `ending_before` is given, returns chats strictly older than that
    /// chat. `has_more` is false on the terminal page.
    async fn list_chats(
        &self,
        user_id: &str,
        limit: usize,
        ending_before: Option<Uuid>,
    ) -> Result<ChatPage>;
}
