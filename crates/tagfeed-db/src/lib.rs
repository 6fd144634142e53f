//! # tagfeed-db
//!
//! Store layer for tagfeed.
//!
//! This crate provides:
//! - Connection pool management
//! - PostgreSQL implementations of the core store traits
//! - An always-compiled in-memory store used by tests across the workspace
//!
//! ## Example
//!
//! ```rust,ignore
//! use tagfeed_db::Database;
//! use tagfeed_core::TagStore;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/tagfeed").await?;
//!     db.migrate().await?;
//!
//!     let tag = db.tags.create_tag("rust", "user-1").await?;
//!     println!("Created tag: {}", tag.id);
//!     Ok(())
//! }
//! ```

pub mod chats;
pub mod memory;
pub mod pool;
pub mod tags;

use std::sync::Arc;

use sqlx::PgPool;

// Re-export core types
pub use tagfeed_core::{Error, Result};

pub use chats::PgChatStore;
pub use memory::MemoryStore;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tags::PgTagStore;

/// Bundle of store implementations over one connection pool.
pub struct Database {
    pub pool: PgPool,
    pub tags: Arc<PgTagStore>,
    pub chats: Arc<PgChatStore>,
}

impl Database {
    /// Connect with default pool configuration.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            tags: Arc::new(PgTagStore::new(pool.clone())),
            chats: Arc::new(PgChatStore::new(pool.clone())),
            pool,
        }
    }

    /// Run pending schema migrations for the tables this crate owns.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Internal(format!("migration failed: {}", e)))
    }
}
