//! Core data types for tagfeed.
//!
//! Wire shapes match the HTTP surface: camelCase field names, ISO-8601
//! timestamps. Chats are owned by an external subsystem; only the fields this
//! service consumes are modeled here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// TAG TYPES
// =============================================================================

/// A named label, creator-owned, many-to-many with chats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    /// Opaque identity of the creating user.
    pub created_by: String,
    /// Number of chats carrying this tag (computed, only populated when
    /// requested via `with_usage_count`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<i64>,
}

impl Tag {
    /// Construct a tag with a fresh id and the current timestamp.
    pub fn new(name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            created_at: Utc::now(),
            created_by: created_by.into(),
            usage_count: None,
        }
    }
}

/// A single chat-tag link row. At most one per `(chat_id, tag_id)` pair;
/// never updated in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct ChatTagAssociation {
    pub chat_id: Uuid,
    pub tag_id: Uuid,
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Chat visibility, as exposed by the owning subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Public,
}

/// A conversation record. Externally owned; this service only reads it and
/// observes its deletion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub visibility: Visibility,
}

/// One page of cursor-paginated chat history, newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub chats: Vec<Chat>,
    /// False on the terminal page; once observed, no further pages exist.
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_new_populates_identity() {
        let tag = Tag::new("work", "user-1");
        assert_eq!(tag.name, "work");
        assert_eq!(tag.created_by, "user-1");
        assert!(tag.usage_count.is_none());
    }

    #[test]
    fn test_tag_serializes_camel_case() {
        let tag = Tag::new("work", "user-1");
        let json = serde_json::to_value(&tag).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("createdBy").is_some());
        // usage_count is absent unless populated
        assert!(json.get("usageCount").is_none());
    }

    #[test]
    fn test_visibility_round_trip() {
        let json = serde_json::to_string(&Visibility::Private).unwrap();
        assert_eq!(json, "\"private\"");
        let back: Visibility = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Visibility::Private);
    }

    #[test]
    fn test_chat_page_has_more_field_name() {
        let page = ChatPage {
            chats: vec![],
            has_more: true,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["hasMore"], serde_json::Value::Bool(true));
    }
}
