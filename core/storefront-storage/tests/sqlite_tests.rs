use rust_decimal::Decimal;
use std::str::FromStr;
use storefront_model::{Category, Product, ProductVideo, VideoPlatform};
use storefront_storage::{CatalogStore, SqliteStore, UpsertOutcome};
use tempfile::TempDir;

fn make_product(name: &str) -> Product {
    let mut product = Product::new(name, "Handmade", Decimal::new(1299, 2), 4, "Slime");
    product.featured = true;
    product.video = Some(ProductVideo {
        url: "https://youtu.be/xyz".into(),
        platform: VideoPlatform::Youtube,
        title: "Stretch test".into(),
    });
    product
}

#[tokio::test]
async fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");

    {
        let store = SqliteStore::open(&path).unwrap();
        store.upsert_by_identity(&make_product("Cloud Slime")).await.unwrap();
        store.upsert_category(&Category::new("Slime", "")).await.unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let products = store.find_all().await.unwrap();
    assert_eq!(products.len(), 1);
    assert!(products[0].same_content(&make_product("Cloud Slime")));
    assert_eq!(products[0].price, Decimal::new(1299, 2));
    assert_eq!(store.find_categories().await.unwrap().len(), 1);
}

#[tokio::test]
async fn reopened_store_keeps_upserts_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("catalog.db");

    let first = SqliteStore::open(&path).unwrap();
    first.upsert_by_identity(&make_product("Cloud Slime")).await.unwrap();
    drop(first);

    let second = SqliteStore::open(&path).unwrap();
    assert_eq!(
        second.upsert_by_identity(&make_product("Cloud Slime")).await.unwrap(),
        UpsertOutcome::Unchanged
    );
}

#[test]
fn open_fails_for_missing_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("no-such-dir").join("catalog.db");
    assert!(SqliteStore::open(&path).is_err());
}

#[tokio::test]
async fn high_scale_price_is_stored_exactly() {
    let store = SqliteStore::open_in_memory().unwrap();
    let mut product = make_product("Jelly Slime");
    product.price = Decimal::from_str("12.3456789012345678901").unwrap();

    assert_eq!(store.upsert_by_identity(&product).await.unwrap(), UpsertOutcome::Inserted);
    assert_eq!(store.upsert_by_identity(&product).await.unwrap(), UpsertOutcome::Unchanged);
    let stored = store.find_all().await.unwrap();
    assert_eq!(stored[0].price.to_string(), "12.3456789012345678901");
}
