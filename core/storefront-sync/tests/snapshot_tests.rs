mod common;

use common::{FaultyStore, priced, product, slime_category, store_with};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;
use storefront_model::{ProductVideo, VideoPlatform};
use storefront_storage::{CatalogStore, MemoryStore, SqliteStore};
use storefront_sync::{
    FormatError, SNAPSHOT_FORMAT_VERSION, Snapshot, SyncError, export_snapshot,
    export_snapshot_with_timeout, import_snapshot, parse_snapshot,
};

fn envelope(records: serde_json::Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "formatVersion": 1,
        "exportedAt": "2025-03-01T12:00:00Z",
        "records": records,
    }))
    .unwrap()
}

// ── Export ───────────────────────────────────────────────────────

#[tokio::test]
async fn export_contains_every_product_and_category() {
    let store = store_with(vec![product("A", 1), product("B", 2)]);
    let snapshot = export_snapshot(&store).await.unwrap();

    assert_eq!(snapshot.format_version, SNAPSHOT_FORMAT_VERSION);
    assert_eq!(snapshot.records.len(), 2);
    assert_eq!(snapshot.categories, vec![slime_category()]);
}

#[tokio::test]
async fn export_omits_storage_identifiers() {
    let store = SqliteStore::open_in_memory().unwrap();
    store.upsert_by_identity(&product("A", 1)).await.unwrap();

    let json = export_snapshot(&store).await.unwrap().to_json().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&json).unwrap();
    let record = doc["records"][0].as_object().unwrap();
    assert!(!record.contains_key("id"));
    assert!(!record.contains_key("_id"));
    assert_eq!(doc["formatVersion"], 1);
    assert!(doc["exportedAt"].is_string());
}

#[tokio::test]
async fn export_then_import_round_trips() {
    let mut with_video = product("Cloud Slime", 12);
    with_video.featured = true;
    with_video.video = Some(ProductVideo {
        url: "https://vimeo.com/1".into(),
        platform: VideoPlatform::Vimeo,
        title: "Poke test".into(),
    });
    let store = MemoryStore::new();
    store.upsert_by_identity(&with_video).await.unwrap();
    store.upsert_by_identity(&product("Butter Slime", 9)).await.unwrap();

    let bytes = export_snapshot(&store).await.unwrap().to_bytes().unwrap();
    let imported = import_snapshot(&bytes).unwrap();

    // Timestamps included: the store stamped them and the snapshot carries them.
    assert_eq!(imported, store.find_all().await.unwrap());
}

#[tokio::test]
async fn high_scale_prices_survive_export_and_import() {
    let price = Decimal::from_str("12.3456789012345678901").unwrap();
    let store = MemoryStore::new();
    store.upsert_by_identity(&priced("Cloud Slime", price)).await.unwrap();

    let bytes = export_snapshot(&store).await.unwrap().to_bytes().unwrap();
    let doc: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(doc["records"][0]["price"], "12.3456789012345678901");

    let imported = import_snapshot(&bytes).unwrap();
    assert_eq!(imported[0].price.to_string(), "12.3456789012345678901");
    assert!(imported[0].same_content(&store.find_all().await.unwrap()[0]));
}

#[tokio::test(start_paused = true)]
async fn export_from_a_stalled_store_times_out() {
    let store = FaultyStore::new(store_with(vec![product("A", 1)])).slow(Duration::from_secs(5));

    let err = export_snapshot_with_timeout(&store, Duration::from_secs(1))
        .await
        .unwrap_err();
    match err {
        SyncError::StoreUnavailable(detail) => assert!(detail.contains("timed out"), "{detail}"),
        other => panic!("expected StoreUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn export_with_timeout_reads_a_responsive_store() {
    let store = store_with(vec![product("A", 1)]);
    let snapshot = export_snapshot_with_timeout(&store, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(snapshot.records.len(), 1);
}

#[test]
fn parse_reads_categories_and_defaults_them_to_empty() {
    let with = serde_json::to_vec(&json!({
        "formatVersion": 1,
        "exportedAt": "2025-03-01T12:00:00Z",
        "records": [],
        "categories": [{"name": " Slime ", "description": "All the slime"}],
    }))
    .unwrap();
    let snapshot = parse_snapshot(&with).unwrap();
    assert_eq!(snapshot.categories, vec![slime_category()]);

    let without = parse_snapshot(&envelope(json!([]))).unwrap();
    assert!(without.categories.is_empty());
}

#[test]
fn import_normalizes_loose_records() {
    let bytes = envelope(json!([{
        "name": "  Cloud Slime ",
        "description": "Fluffy",
        "price": "12.50",
        "inventory": "3",
        "category": "Slime",
        "featured": "on",
        "images": ["/images/cloud.jpg"],
    }]));

    let products = import_snapshot(&bytes).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].name, "Cloud Slime");
    assert_eq!(products[0].inventory, 3);
    assert!(products[0].featured);
    assert_eq!(products[0].images[0].alt_text, "Cloud Slime");
}

// ── Format errors ────────────────────────────────────────────────

#[test]
fn missing_format_version_is_rejected() {
    let bytes = br#"{"exportedAt": "2025-03-01T12:00:00Z", "records": []}"#;
    assert!(matches!(
        import_snapshot(bytes),
        Err(FormatError::MissingVersion)
    ));
}

#[test]
fn unknown_format_version_is_never_guessed() {
    let bytes = br#"{"formatVersion": 2, "exportedAt": "2025-03-01T12:00:00Z", "records": []}"#;
    assert!(matches!(
        import_snapshot(bytes),
        Err(FormatError::UnsupportedVersion(2))
    ));
}

#[test]
fn non_integer_format_version_is_rejected() {
    let bytes = br#"{"formatVersion": "1", "exportedAt": "2025-03-01T12:00:00Z", "records": []}"#;
    assert!(matches!(
        import_snapshot(bytes),
        Err(FormatError::InvalidField { field: "formatVersion", .. })
    ));
}

#[test]
fn structural_errors_are_format_errors() {
    assert!(matches!(
        import_snapshot(&[0xff, 0xfe]),
        Err(FormatError::InvalidUtf8(_))
    ));
    assert!(matches!(
        import_snapshot(b"{not json"),
        Err(FormatError::InvalidJson(_))
    ));
    assert!(matches!(
        import_snapshot(b"[1, 2]"),
        Err(FormatError::NotAnObject)
    ));
    assert!(matches!(
        import_snapshot(br#"{"formatVersion": 1, "records": []}"#),
        Err(FormatError::InvalidField { field: "exportedAt", .. })
    ));
    assert!(matches!(
        import_snapshot(br#"{"formatVersion": 1, "exportedAt": "yesterday", "records": []}"#),
        Err(FormatError::InvalidField { field: "exportedAt", .. })
    ));
    assert!(matches!(
        import_snapshot(br#"{"formatVersion": 1, "exportedAt": "2025-03-01T12:00:00Z"}"#),
        Err(FormatError::InvalidField { field: "records", .. })
    ));
    assert!(matches!(
        import_snapshot(br#"{"formatVersion": 1, "exportedAt": "2025-03-01T12:00:00Z", "records": {}}"#),
        Err(FormatError::InvalidField { field: "records", .. })
    ));
}

#[test]
fn invalid_record_names_its_index_and_field() {
    let bytes = envelope(json!([
        {"name": "A", "description": "x", "price": 1, "category": "Slime"},
        {"name": "B", "description": "x", "price": -1, "category": "Slime"},
    ]));

    match import_snapshot(&bytes) {
        Err(FormatError::InvalidRecord { index, source }) => {
            assert_eq!(index, 1);
            assert_eq!(source.field, "price");
        }
        other => panic!("expected InvalidRecord, got {other:?}"),
    }
}

#[test]
fn blank_category_name_is_rejected() {
    let bytes = serde_json::to_vec(&json!({
        "formatVersion": 1,
        "exportedAt": "2025-03-01T12:00:00Z",
        "records": [],
        "categories": [{"name": "  "}],
    }))
    .unwrap();
    assert!(matches!(
        parse_snapshot(&bytes),
        Err(FormatError::InvalidCategory { index: 0, .. })
    ));
}

// ── Properties ───────────────────────────────────────────────────

proptest! {
    #[test]
    fn serialized_snapshot_parses_back(
        prices in prop::collection::vec((0i64..1_000_000_000_000, 0u32..=18), 0..8)
    ) {
        let records: Vec<_> = prices
            .iter()
            .enumerate()
            .map(|(i, &(mantissa, scale))| priced(&format!("Item {i}"), Decimal::new(mantissa, scale)))
            .collect();
        let snapshot = Snapshot::new(records.clone(), vec![slime_category()]);

        let parsed = parse_snapshot(&snapshot.to_bytes().unwrap()).unwrap();
        for (parsed, original) in parsed.records.iter().zip(&records) {
            prop_assert!(parsed.same_content(original), "{} != {}", parsed.price, original.price);
        }
        prop_assert_eq!(parsed.records, records);
        prop_assert_eq!(parsed.categories, vec![slime_category()]);
    }
}
