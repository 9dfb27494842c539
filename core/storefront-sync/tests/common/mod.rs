//! Shared fixtures for the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use storefront_model::{Category, Product, ProductImage};
use storefront_storage::{
    CatalogStore, DeleteOutcome, MemoryStore, StorageError, StorageResult, UpsertOutcome,
};
use storefront_sync::CancellationToken;
use storefront_types::IdentityKey;

pub fn key(name: &str) -> IdentityKey {
    IdentityKey::from_name(name).unwrap()
}

/// A normalized, reference-resolved product with a whole-number price.
pub fn product(name: &str, price: i64) -> Product {
    priced(name, Decimal::new(price, 0))
}

/// Like [`product`] with an arbitrary decimal price.
pub fn priced(name: &str, price: Decimal) -> Product {
    let mut product = Product::new(name, "Handmade", price.normalize(), 5, "Slime");
    let url = format!("/images/{}.jpg", key(name).as_str().replace(' ', "-"));
    product.images = vec![ProductImage::new(url.clone(), name)];
    product.image_path = Some(url);
    product
}

pub fn raw_record(name: &str, price: i64) -> Value {
    json!({
        "name": name,
        "description": "Handmade",
        "price": price,
        "inventory": 5,
        "category": "Slime",
    })
}

/// A raw record whose price is given as a decimal string.
pub fn raw_priced_record(name: &str, price: &str) -> Value {
    let mut record = raw_record(name, 0);
    record["price"] = json!(price);
    record
}

pub fn slime_category() -> Category {
    Category::new("Slime", "All the slime")
}

/// A memory store with the `Slime` category already present.
pub fn store_with(products: Vec<Product>) -> MemoryStore {
    MemoryStore::with_catalog(products, vec![slime_category()]).unwrap()
}

pub async fn names(store: &dyn CatalogStore) -> Vec<String> {
    store
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect()
}

/// Wraps a [`MemoryStore`] and injects failures.
pub struct FaultyStore {
    pub inner: MemoryStore,
    failing: Mutex<HashSet<IdentityKey>>,
    unreachable: bool,
    delay: Option<Duration>,
    writes: AtomicUsize,
    cancel_after: Option<(CancellationToken, usize)>,
}

impl FaultyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
            unreachable: false,
            delay: None,
            writes: AtomicUsize::new(0),
            cancel_after: None,
        }
    }

    /// Writes for this product name fail with a constraint violation.
    pub fn failing_on(self, name: &str) -> Self {
        self.failing.lock().unwrap().insert(key(name));
        self
    }

    /// Every call fails as if the backend were down.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Every call sleeps this long first.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cancels `token` once `writes` product upserts have been applied, as if
    /// the operator hit Ctrl-C mid-run.
    pub fn cancelling_after(mut self, writes: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((token, writes));
        self
    }

    pub fn heal(&self) {
        self.failing.lock().unwrap().clear();
    }

    /// Number of write calls that reached the store.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> StorageResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable {
            return Err(StorageError::Unavailable("connection refused".into()));
        }
        Ok(())
    }

    fn check(&self, key: &IdentityKey) -> StorageResult<()> {
        if self.failing.lock().unwrap().contains(key) {
            return Err(StorageError::Constraint(format!("rejected {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for FaultyStore {
    fn backend_name(&self) -> &'static str {
        "faulty"
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.enter().await?;
        self.inner.health_check().await
    }

    async fn find_all(&self) -> StorageResult<Vec<Product>> {
        self.enter().await?;
        self.inner.find_all().await
    }

    async fn upsert_by_identity(&self, product: &Product) -> StorageResult<UpsertOutcome> {
        self.enter().await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(&product.identity_key().unwrap())?;
        let outcome = self.inner.upsert_by_identity(product).await?;
        if let Some((token, after)) = &self.cancel_after {
            if self.writes() >= *after {
                token.cancel();
            }
        }
        Ok(outcome)
    }

    async fn delete_by_identity(&self, key: &IdentityKey) -> StorageResult<DeleteOutcome> {
        self.enter().await?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.check(key)?;
        self.inner.delete_by_identity(key).await
    }

    async fn find_categories(&self) -> StorageResult<Vec<Category>> {
        self.enter().await?;
        self.inner.find_categories().await
    }

    async fn upsert_category(&self, category: &Category) -> StorageResult<UpsertOutcome> {
        self.enter().await?;
        self.inner.upsert_category(category).await
    }
}
