//! Storage layer for the storefront catalog.
//!
//! The sync engine never talks to a database directly; it goes through the
//! [`CatalogStore`] trait, which only knows three product operations (list,
//! upsert by identity, delete by identity) plus their category counterparts.
//!
//! # Backends
//!
//! - [`MemoryStore`]: insertion-ordered, in-process; dry runs and tests
//! - [`SqliteStore`]: JSON documents in SQLite with a unique identity-key
//!   index; the default persistent backend of the seeder CLI

mod error;
mod memory;
mod sqlite;
mod store;

pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::{CatalogStore, DeleteOutcome, UpsertOutcome};
