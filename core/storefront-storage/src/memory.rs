//! In-process store, insertion ordered.

use crate::error::{StorageError, StorageResult};
use crate::store::{
    CatalogStore, DeleteOutcome, UpsertOutcome, category_key, plan_category_upsert,
    plan_product_upsert, product_key,
};
use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard};
use storefront_model::{Category, Product};
use storefront_types::{IdentityKey, RecordId};

#[derive(Debug, Clone)]
struct Stored<T> {
    id: RecordId,
    record: T,
}

/// A [`CatalogStore`] held entirely in memory.
///
/// Used for dry runs, tests and as the staging side of store-to-store syncs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    products: Mutex<IndexMap<IdentityKey, Stored<Product>>>,
    categories: Mutex<IndexMap<IdentityKey, Stored<Category>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with products and categories, written
    /// verbatim (timestamps are not touched).
    pub fn with_catalog(products: Vec<Product>, categories: Vec<Category>) -> StorageResult<Self> {
        let store = Self::new();
        {
            let mut map = lock(&store.products)?;
            for product in products {
                map.insert(product_key(&product)?, Stored { id: RecordId::new(), record: product });
            }
        }
        {
            let mut map = lock(&store.categories)?;
            for category in categories {
                map.insert(category_key(&category)?, Stored { id: RecordId::new(), record: category });
            }
        }
        Ok(store)
    }

    /// Number of stored products.
    pub fn product_count(&self) -> usize {
        self.products.lock().map(|m| m.len()).unwrap_or(0)
    }

    /// Storage-internal id of the product with this identity key.
    pub fn record_id(&self, key: &IdentityKey) -> Option<RecordId> {
        self.products.lock().ok()?.get(key).map(|s| s.id)
    }

    /// Number of stored categories.
    pub fn category_count(&self) -> usize {
        self.categories.lock().map(|m| m.len()).unwrap_or(0)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> StorageResult<MutexGuard<'_, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Unavailable("memory store lock poisoned".into()))
}

#[async_trait]
impl CatalogStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn health_check(&self) -> StorageResult<()> {
        lock(&self.products).map(|_| ())
    }

    async fn find_all(&self) -> StorageResult<Vec<Product>> {
        Ok(lock(&self.products)?
            .values()
            .map(|s| s.record.clone())
            .collect())
    }

    async fn upsert_by_identity(&self, product: &Product) -> StorageResult<UpsertOutcome> {
        let key = product_key(product)?;
        let mut map = lock(&self.products)?;
        let (outcome, record) =
            plan_product_upsert(map.get(&key).map(|s| &s.record), product, Utc::now());
        if let Some(record) = record {
            match map.get_mut(&key) {
                Some(stored) => stored.record = record,
                None => {
                    map.insert(key, Stored { id: RecordId::new(), record });
                }
            }
        }
        Ok(outcome)
    }

    async fn delete_by_identity(&self, key: &IdentityKey) -> StorageResult<DeleteOutcome> {
        let mut map = lock(&self.products)?;
        Ok(match map.shift_remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::Missing,
        })
    }

    async fn find_categories(&self) -> StorageResult<Vec<Category>> {
        Ok(lock(&self.categories)?
            .values()
            .map(|s| s.record.clone())
            .collect())
    }

    async fn upsert_category(&self, category: &Category) -> StorageResult<UpsertOutcome> {
        let key = category_key(category)?;
        let mut map = lock(&self.categories)?;
        let (outcome, record) =
            plan_category_upsert(map.get(&key).map(|s| &s.record), category, Utc::now());
        if let Some(record) = record {
            match map.get_mut(&key) {
                Some(stored) => stored.record = record,
                None => {
                    map.insert(key, Stored { id: RecordId::new(), record });
                }
            }
        }
        Ok(outcome)
    }
}
