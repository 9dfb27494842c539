//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend could not be reached or refused the connection.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write violated a store-level constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Invalid data (e.g. a record without a usable identity key).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A blocking storage task failed to complete.
    #[error("storage task failed: {0}")]
    Task(String),
}
