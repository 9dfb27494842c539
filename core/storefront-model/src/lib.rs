//! Catalog model for the storefront.
//!
//! Defines the records every other crate works with, and the two pure passes
//! that turn loose input into them:
//! - [`Product`], [`ProductImage`], [`ProductVideo`]: the canonical product
//! - [`Category`]: product categories, referenced by name
//! - [`normalize`]: validation boundary for raw JSON records
//! - [`resolve_references`]: keeps `images` and the legacy `imagePath` in step

mod category;
mod normalize;
mod product;
mod references;

pub use category::Category;
pub use normalize::{MAX_NAME_LEN, ValidationError, normalize};
pub use product::{Product, ProductImage, ProductVideo, VideoPlatform};
pub use references::{references_consistent, resolve_references};
