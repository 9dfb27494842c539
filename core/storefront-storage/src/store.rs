//! The store interface consumed by the sync executor and snapshot exporter.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_model::{Category, Product};
use storefront_types::IdentityKey;

/// What an identity-based upsert actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    /// No record with this identity existed; one was created.
    Inserted,
    /// An existing record had different content and was replaced.
    Updated,
    /// An existing record already had this content; nothing was written.
    Unchanged,
}

/// What an identity-based delete actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Deleted,
    /// No record with this identity existed.
    Missing,
}

/// Abstract catalog store.
///
/// All writes are keyed by [`IdentityKey`], never by storage-internal ids, so
/// replaying a write that already happened is harmless.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Returns the name of the backend, for logging.
    fn backend_name(&self) -> &'static str;

    /// Cheap round-trip proving the store is reachable.
    async fn health_check(&self) -> StorageResult<()>;

    /// Returns every product in storage order.
    async fn find_all(&self) -> StorageResult<Vec<Product>>;

    /// Inserts or replaces the product with the same identity key.
    async fn upsert_by_identity(&self, product: &Product) -> StorageResult<UpsertOutcome>;

    /// Removes the product with the given identity key, if present.
    async fn delete_by_identity(&self, key: &IdentityKey) -> StorageResult<DeleteOutcome>;

    /// Returns every category in storage order.
    async fn find_categories(&self) -> StorageResult<Vec<Category>>;

    /// Inserts or replaces the category with the same identity key.
    async fn upsert_category(&self, category: &Category) -> StorageResult<UpsertOutcome>;
}

/// Identity key of a product about to be written.
pub(crate) fn product_key(product: &Product) -> StorageResult<IdentityKey> {
    product
        .identity_key()
        .map_err(|e| StorageError::InvalidData(format!("product {:?}: {e}", product.name)))
}

/// Identity key of a category about to be written.
pub(crate) fn category_key(category: &Category) -> StorageResult<IdentityKey> {
    category
        .identity_key()
        .map_err(|e| StorageError::InvalidData(format!("category {:?}: {e}", category.name)))
}

/// Decides what an upsert writes given the currently stored record.
///
/// Returns `None` when nothing needs writing. Timestamps are owned by the
/// store: `createdAt` survives updates, `updatedAt` moves only on real change.
pub(crate) fn plan_product_upsert(
    existing: Option<&Product>,
    incoming: &Product,
    now: DateTime<Utc>,
) -> (UpsertOutcome, Option<Product>) {
    match existing {
        None => {
            let mut record = incoming.clone();
            record.created_at = incoming.created_at.or(Some(now));
            record.updated_at = incoming.updated_at.or(record.created_at);
            (UpsertOutcome::Inserted, Some(record))
        }
        Some(current) if current.same_content(incoming) => (UpsertOutcome::Unchanged, None),
        Some(current) => {
            let mut record = incoming.clone();
            record.created_at = current.created_at.or(incoming.created_at).or(Some(now));
            record.updated_at = Some(now);
            (UpsertOutcome::Updated, Some(record))
        }
    }
}

/// Category counterpart of [`plan_product_upsert`].
pub(crate) fn plan_category_upsert(
    existing: Option<&Category>,
    incoming: &Category,
    now: DateTime<Utc>,
) -> (UpsertOutcome, Option<Category>) {
    match existing {
        None => {
            let mut record = incoming.clone();
            record.created_at = incoming.created_at.or(Some(now));
            (UpsertOutcome::Inserted, Some(record))
        }
        Some(current)
            if current.name == incoming.name && current.description == incoming.description =>
        {
            (UpsertOutcome::Unchanged, None)
        }
        Some(current) => {
            let mut record = incoming.clone();
            record.created_at = current.created_at.or(incoming.created_at).or(Some(now));
            (UpsertOutcome::Updated, Some(record))
        }
    }
}
