use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storefront_types::IdentityKey;

/// A product category. Identity is the normalized name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Category {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            created_at: None,
        }
    }

    /// Placeholder category created on demand for a product that names a
    /// category the store does not know yet.
    pub fn placeholder(name: impl Into<String>) -> Self {
        let name = name.into();
        let description = format!("{name} products");
        Self {
            name,
            description,
            created_at: None,
        }
    }

    pub fn identity_key(&self) -> storefront_types::Result<IdentityKey> {
        IdentityKey::from_name(&self.name)
    }
}
