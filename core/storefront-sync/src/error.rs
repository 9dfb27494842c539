//! Error types for the sync layer.
//!
//! Only run-level failures are errors. Per-record problems (validation,
//! unknown categories, store write failures) are aggregated into the
//! [`SyncReport`](crate::SyncReport) instead.

use storefront_model::ValidationError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a whole sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store could not be reached, or a store call timed out.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The snapshot could not be imported.
    #[error("snapshot format error: {0}")]
    Format(#[from] FormatError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A snapshot document is structurally invalid. Importers never guess.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("snapshot is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("snapshot is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("snapshot envelope must be a JSON object")]
    NotAnObject,

    #[error("snapshot is missing `formatVersion`")]
    MissingVersion,

    #[error("unsupported snapshot format version {0}")]
    UnsupportedVersion(u64),

    #[error("snapshot field `{field}` {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("snapshot record {index} is invalid: {source}")]
    InvalidRecord {
        index: usize,
        #[source]
        source: ValidationError,
    },

    #[error("snapshot category {index} is invalid: {reason}")]
    InvalidCategory { index: usize, reason: String },
}
