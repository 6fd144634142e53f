//! Tag store implementation for PostgreSQL.
//!
//! Owns the `tag` and `chat_tag` tables. The `chat` table belongs to the
//! conversation subsystem; queries here only join against it for ownership
//! scoping.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tagfeed_core::defaults::validate_tag_name;
use tagfeed_core::{ChatTagAssociation, Error, ListTagsFilter, Result, Tag, TagStore};

/// True when the underlying database error is a unique-constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

/// PostgreSQL implementation of [`TagStore`].
pub struct PgTagStore {
    pool: PgPool,
}

impl PgTagStore {
    /// Create a new PgTagStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn tag_from_row(row: &sqlx::postgres::PgRow) -> Tag {
        Tag {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
            created_by: row.get("created_by"),
            usage_count: row.try_get("usage_count").ok(),
        }
    }
}

#[async_trait]
impl TagStore for PgTagStore {
    async fn list_tags(&self, filter: ListTagsFilter) -> Result<Vec<Tag>> {
        // Exact-name lookup takes precedence, then creator scope, then the
        // active/usage variants, mirroring the catalog listing contract.
        let rows = if let Some(name) = &filter.by_name {
            sqlx::query(
                "SELECT id, name, created_at, created_by FROM tag WHERE name = $1 ORDER BY name",
            )
            .bind(name)
            .fetch_all(&self.pool)
            .await
        } else if let Some(creator) = &filter.by_creator {
            sqlx::query(
                "SELECT id, name, created_at, created_by FROM tag
                 WHERE created_by = $1 ORDER BY name",
            )
            .bind(creator)
            .fetch_all(&self.pool)
            .await
        } else if filter.active_only {
            sqlx::query(
                "SELECT DISTINCT t.id, t.name, t.created_at, t.created_by
                 FROM tag t
                 JOIN chat_tag ct ON ct.tag_id = t.id
                 ORDER BY t.name",
            )
            .fetch_all(&self.pool)
            .await
        } else if filter.with_usage_count {
            sqlx::query(
                "SELECT t.id, t.name, t.created_at, t.created_by,
                        COUNT(ct.chat_id) AS usage_count
                 FROM tag t
                 LEFT JOIN chat_tag ct ON ct.tag_id = t.id
                 GROUP BY t.id, t.name, t.created_at, t.created_by
                 ORDER BY t.name",
            )
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query("SELECT id, name, created_at, created_by FROM tag ORDER BY name")
                .fetch_all(&self.pool)
                .await
        }
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::tag_from_row).collect())
    }

    async fn get_tag(&self, id: Uuid) -> Result<Tag> {
        let row = sqlx::query("SELECT id, name, created_at, created_by FROM tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        row.map(|r| Self::tag_from_row(&r))
            .ok_or(Error::TagNotFound(id))
    }

    async fn create_tag(&self, name: &str, creator_id: &str) -> Result<Tag> {
        let name = validate_tag_name(name).map_err(Error::InvalidInput)?;

        let row = sqlx::query(
            "INSERT INTO tag (name, created_by) VALUES ($1, $2)
             RETURNING id, name, created_at, created_by",
        )
        .bind(name)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("A tag named '{}' already exists", name))
            } else {
                Error::Database(e)
            }
        })?;

        Ok(Self::tag_from_row(&row))
    }

    async fn update_tag(&self, id: Uuid, name: &str) -> Result<Tag> {
        let name = validate_tag_name(name).map_err(Error::InvalidInput)?;

        let row = sqlx::query(
            "UPDATE tag SET name = $2 WHERE id = $1
             RETURNING id, name, created_at, created_by",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                Error::Conflict(format!("A tag named '{}' already exists", name))
            } else {
                Error::Database(e)
            }
        })?;

        row.map(|r| Self::tag_from_row(&r))
            .ok_or(Error::TagNotFound(id))
    }

    async fn delete_tag(&self, id: Uuid) -> Result<Tag> {
        // chat_tag rows go with the tag via ON DELETE CASCADE.
        let row = sqlx::query(
            "DELETE FROM tag WHERE id = $1
             RETURNING id, name, created_at, created_by",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.map(|r| Self::tag_from_row(&r))
            .ok_or(Error::TagNotFound(id))
    }

    async fn list_tags_for_chat(&self, chat_id: Uuid) -> Result<Vec<Tag>> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, t.created_at, t.created_by
             FROM tag t
             JOIN chat_tag ct ON ct.tag_id = t.id
             WHERE ct.chat_id = $1
             ORDER BY t.name",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(Self::tag_from_row).collect())
    }

    async fn list_chats_for_tag(&self, tag_id: Uuid) -> Result<Vec<Uuid>> {
        let rows = sqlx::query("SELECT chat_id FROM chat_tag WHERE tag_id = $1")
            .bind(tag_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(|r| r.get("chat_id")).collect())
    }

    async fn all_associations_for_user(
        &self,
        user_id: &str,
    ) -> Result<HashMap<Uuid, Vec<Tag>>> {
        let rows = sqlx::query(
            "SELECT ct.chat_id, t.id, t.name, t.created_at, t.created_by
             FROM chat_tag ct
             JOIN tag t ON t.id = ct.tag_id
             JOIN chat c ON c.id = ct.chat_id
             WHERE c.user_id = $1
             ORDER BY ct.chat_id, t.name",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_chat: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in &rows {
            let chat_id: Uuid = row.get("chat_id");
            by_chat
                .entry(chat_id)
                .or_default()
                .push(Self::tag_from_row(row));
        }
        Ok(by_chat)
    }

    async fn attach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<ChatTagAssociation> {
        // Idempotent: re-attaching an existing pair is a no-op.
        sqlx::query(
            "INSERT INTO chat_tag (chat_id, tag_id) VALUES ($1, $2)
             ON CONFLICT (chat_id, tag_id) DO NOTHING",
        )
        .bind(chat_id)
        .bind(tag_id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(ChatTagAssociation { chat_id, tag_id })
    }

    async fn detach(&self, chat_id: Uuid, tag_id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM chat_tag WHERE chat_id = $1 AND tag_id = $2")
            .bind(chat_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }
}
