//! Chat history store implementation for PostgreSQL.
//!
//! Read-only: the `chat` table is owned by the conversation subsystem.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use tagfeed_core::{Chat, ChatPage, ChatStore, Error, Result, Visibility};

/// PostgreSQL implementation of [`ChatStore`].
pub struct PgChatStore {
    pool: PgPool,
}

impl PgChatStore {
    /// Create a new PgChatStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn chat_from_row(row: &sqlx::postgres::PgRow) -> Result<Chat> {
        let visibility: String = row.get("visibility");
        let visibility = match visibility.as_str() {
            "public" => Visibility::Public,
            "private" => Visibility::Private,
            other => {
                return Err(Error::Internal(format!(
                    "unknown chat visibility '{}'",
                    other
                )))
            }
        };

        Ok(Chat {
            id: row.get("id"),
            created_at: row.get("created_at"),
            title: row.get("title"),
            visibility,
        })
    }
}

#[async_trait]
impl ChatStore for PgChatStore {
    async fn list_chats(
        &self,
        user_id: &str,
        limit: usize,
        ending_before: Option<Uuid>,
    ) -> Result<ChatPage> {
        // Resolve the cursor to its timestamp; pagination is "strictly older
        // than the last chat of the previous page".
        let cursor_created_at: Option<DateTime<Utc>> = match ending_before {
            Some(cursor) => {
                let row = sqlx::query("SELECT created_at FROM chat WHERE id = $1")
                    .bind(cursor)
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(Error::Database)?;
                Some(
                    row.map(|r| r.get("created_at"))
                        .ok_or(Error::ChatNotFound(cursor))?,
                )
            }
            None => None,
        };

        if limit == 0 {
            return Ok(ChatPage {
                chats: Vec::new(),
                has_more: false,
            });
        }

        let fetch_limit = limit as i64;
        let rows = match cursor_created_at {
            Some(before) => {
                sqlx::query(
                    "SELECT id, created_at, title, visibility FROM chat
                     WHERE user_id = $1 AND created_at < $2
                     ORDER BY created_at DESC
                     LIMIT $3",
                )
                .bind(user_id)
                .bind(before)
                .bind(fetch_limit)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT id, created_at, title, visibility FROM chat
                     WHERE user_id = $1
                     ORDER BY created_at DESC
                     LIMIT $2",
                )
                .bind(user_id)
                .bind(fetch_limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        // A full page implies another fetch is worth issuing; the terminal
        // page is the first short (possibly empty) one.
        let has_more = rows.len() == limit;
        let chats = rows
            .iter()
            .map(Self::chat_from_row)
            .collect::<Result<Vec<_>>>()?;

        Ok(ChatPage { chats, has_more })
    }
}
