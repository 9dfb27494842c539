use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use storefront_types::IdentityKey;

/// A catalog product in its canonical form.
///
/// Every product that reaches storage or the diff engine has passed through
/// [`normalize`](crate::normalize) and
/// [`resolve_references`](crate::resolve_references), so the fields below can
/// be trusted without re-validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub description: String,
    /// Written as a decimal string so every digit survives a round trip.
    pub price: Decimal,
    pub inventory: u32,
    pub category: String,
    pub featured: bool,
    /// Ordered image list; the first entry is the primary image.
    #[serde(default)]
    pub images: Vec<ProductImage>,
    /// Legacy single-path image field, kept in step with `images[0]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<ProductVideo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Creates a product with the required attributes and no media.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        price: Decimal,
        inventory: u32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            price,
            inventory,
            category: category.into(),
            featured: false,
            images: Vec::new(),
            image_path: None,
            video: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Returns the identity key derived from the product name.
    ///
    /// Fails only for blank names, which the normalizer never produces.
    pub fn identity_key(&self) -> storefront_types::Result<IdentityKey> {
        IdentityKey::from_name(&self.name)
    }

    /// Returns the identity key of the product's category.
    pub fn category_key(&self) -> storefront_types::Result<IdentityKey> {
        IdentityKey::from_name(&self.category)
    }

    /// Returns the primary image, if any.
    ///
    /// `None` means "no image"; callers pick their own placeholder.
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }

    /// Structural equality across every attribute except timestamps.
    pub fn same_content(&self, other: &Self) -> bool {
        self.name == other.name
            && self.description == other.description
            && self.price == other.price
            && self.inventory == other.inventory
            && self.category == other.category
            && self.featured == other.featured
            && self.images == other.images
            && self.image_path == other.image_path
            && self.video == other.video
    }
}

/// One entry of a product's image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub url: String,
    #[serde(default)]
    pub alt_text: String,
}

impl ProductImage {
    pub fn new(url: impl Into<String>, alt_text: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt_text: alt_text.into(),
        }
    }
}

/// An embedded product video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductVideo {
    pub url: String,
    pub platform: VideoPlatform,
    #[serde(default)]
    pub title: String,
}

/// Hosting platform of a product video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoPlatform {
    Youtube,
    Vimeo,
    Instagram,
    Tiktok,
}

impl VideoPlatform {
    /// All supported platforms.
    pub const ALL: [VideoPlatform; 4] = [
        VideoPlatform::Youtube,
        VideoPlatform::Vimeo,
        VideoPlatform::Instagram,
        VideoPlatform::Tiktok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoPlatform::Youtube => "youtube",
            VideoPlatform::Vimeo => "vimeo",
            VideoPlatform::Instagram => "instagram",
            VideoPlatform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for VideoPlatform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VideoPlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| format!("unsupported video platform: {s}"))
    }
}
