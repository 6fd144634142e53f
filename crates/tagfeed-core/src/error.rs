//! Error types for tagfeed.

use thiserror::Error;

/// Result type alias using tagfeed's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for tagfeed operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tag not found
    #[error("Tag not found: {0}")]
    TagNotFound(uuid::Uuid),

    /// Chat not found
    #[error("Chat not found: {0}")]
    ChatNotFound(uuid::Uuid),

    /// Duplicate tag name
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No identity supplied
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// Identity present but not the resource owner
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Some calls of a bulk operation failed
    #[error("Partial failure: {succeeded} succeeded, {failed} failed; first error: {first_error}")]
    Partial {
        succeeded: usize,
        failed: usize,
        first_error: String,
    },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
