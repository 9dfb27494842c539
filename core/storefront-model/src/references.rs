//! Reference resolver: keeps a product's media references consistent.
//!
//! A product carries its primary image twice: as `images[0]` and as the legacy
//! single-path `imagePath` field still read by older storefront pages. The
//! image list is the source of truth.

use crate::{Product, ProductImage};
use tracing::debug;

/// Makes `images` and `imagePath` agree. Total and idempotent.
///
/// - Non-empty image list: `imagePath` is set to the primary image's url.
/// - Only `imagePath`: a one-element image list is synthesized from it.
/// - Neither: both stay empty.
pub fn resolve_references(mut product: Product) -> Product {
    // Blank paths count as absent.
    if product
        .image_path
        .as_deref()
        .is_some_and(|p| p.trim().is_empty())
    {
        product.image_path = None;
    }

    match (product.images.first(), product.image_path.as_deref()) {
        (Some(primary), Some(path)) if primary.url == path => {}
        (Some(primary), previous) => {
            debug!(
                "Resolving image path for {}: {:?} -> {}",
                product.name, previous, primary.url
            );
            product.image_path = Some(primary.url.clone());
        }
        (None, Some(path)) => {
            debug!("Synthesizing image list for {} from {}", product.name, path);
            product.images = vec![ProductImage::new(path, product.name.clone())];
        }
        (None, None) => {}
    }

    product
}

/// Returns true when the product already satisfies the resolver's invariant.
pub fn references_consistent(product: &Product) -> bool {
    match (product.images.first(), product.image_path.as_deref()) {
        (Some(primary), Some(path)) => primary.url == path,
        (None, None) => true,
        _ => false,
    }
}
