//! Core type definitions for the storefront catalog engine.
//!
//! This crate defines the identifiers shared by every other crate:
//! - [`IdentityKey`]: the normalized name that matches records across catalogs
//! - [`RecordId`]: storage-internal identifiers (UUID v7)
//!
//! Domain records (products, categories) live in `storefront-model`.

mod ids;

pub use ids::{IdentityKey, RecordId};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("identity key must not be blank")]
    EmptyKey,

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),
}
