use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rust_decimal::Decimal;
use storefront_model::{Product, ProductImage, references_consistent, resolve_references};

fn make_product() -> Product {
    Product::new("Cloud Slime", "Fluffy", Decimal::new(12, 0), 5, "Cloud Slime")
}

// ── Policy ───────────────────────────────────────────────────────

#[test]
fn image_list_overrides_stale_path() {
    let mut product = make_product();
    product.images = vec![ProductImage::new("/images/new.jpg", "Cloud Slime")];
    product.image_path = Some("/images/old.jpg".into());

    let resolved = resolve_references(product);
    assert_eq!(resolved.image_path.as_deref(), Some("/images/new.jpg"));
    assert_eq!(resolved.images.len(), 1);
}

#[test]
fn image_list_fills_missing_path() {
    let mut product = make_product();
    product.images = vec![
        ProductImage::new("/images/a.jpg", "front"),
        ProductImage::new("/images/b.jpg", "back"),
    ];

    let resolved = resolve_references(product);
    assert_eq!(resolved.image_path.as_deref(), Some("/images/a.jpg"));
}

#[test]
fn path_only_synthesizes_image_list() {
    let mut product = make_product();
    product.image_path = Some("/images/legacy.jpg".into());

    let resolved = resolve_references(product);
    assert_eq!(
        resolved.images,
        vec![ProductImage::new("/images/legacy.jpg", "Cloud Slime")]
    );
    assert_eq!(resolved.image_path.as_deref(), Some("/images/legacy.jpg"));
}

#[test]
fn neither_leaves_both_empty() {
    let resolved = resolve_references(make_product());
    assert!(resolved.images.is_empty());
    assert_eq!(resolved.image_path, None);
    assert!(resolved.primary_image().is_none());
}

#[test]
fn blank_path_is_dropped() {
    let mut product = make_product();
    product.image_path = Some("  ".into());
    let resolved = resolve_references(product);
    assert_eq!(resolved.image_path, None);
    assert!(resolved.images.is_empty());
}

#[test]
fn consistent_product_is_untouched() {
    let mut product = make_product();
    product.images = vec![ProductImage::new("/images/a.jpg", "front")];
    product.image_path = Some("/images/a.jpg".into());

    let resolved = resolve_references(product.clone());
    assert_eq!(resolved, product);
}

#[test]
fn consistency_check() {
    let mut product = make_product();
    assert!(references_consistent(&product));

    product.image_path = Some("/images/a.jpg".into());
    assert!(!references_consistent(&product));

    product.images = vec![ProductImage::new("/images/b.jpg", "")];
    assert!(!references_consistent(&product));

    product.image_path = Some("/images/b.jpg".into());
    assert!(references_consistent(&product));
}

// ── Properties ───────────────────────────────────────────────────

fn url_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/images/[a-z]{1,8}\\.jpg").unwrap()
}

fn product_strategy() -> impl Strategy<Value = Product> {
    (
        prop::collection::vec(url_strategy(), 0..4),
        prop::option::of(prop_oneof![url_strategy(), Just(String::new())]),
    )
        .prop_map(|(urls, path)| {
            let mut product = make_product();
            product.images = urls
                .into_iter()
                .map(|u| ProductImage::new(u, "alt"))
                .collect();
            product.image_path = path;
            product
        })
}

proptest! {
    /// The resolver always produces a consistent product.
    #[test]
    fn resolved_is_consistent(product in product_strategy()) {
        prop_assert!(references_consistent(&resolve_references(product)));
    }

    /// Resolving twice is the same as resolving once.
    #[test]
    fn resolve_is_idempotent(product in product_strategy()) {
        let once = resolve_references(product);
        let twice = resolve_references(once.clone());
        prop_assert_eq!(once, twice);
    }

    /// The image list is never reordered or truncated when present.
    #[test]
    fn image_list_is_preserved(product in product_strategy()) {
        let before = product.images.clone();
        let resolved = resolve_references(product);
        if !before.is_empty() {
            prop_assert_eq!(resolved.images, before);
        }
    }
}
