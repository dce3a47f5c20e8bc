//! Store error type.

use thiserror::Error;

/// Errors surfaced by the timeline store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool failure.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// A stored event's JSON content failed to parse.
    #[error("corrupt stored payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The referenced event does not exist.
    #[error("event not found: {0}")]
    EventNotFound(String),

    /// The referenced room does not exist.
    #[error("room not found: {0}")]
    RoomNotFound(String),

    /// Invariant violation inside the store itself.
    #[error("{0}")]
    Internal(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
