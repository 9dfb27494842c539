//! Snapshot export and import.
//!
//! A snapshot is a versioned JSON envelope:
//!
//! ```json
//! {
//!   "formatVersion": 1,
//!   "exportedAt": "2025-01-01T00:00:00Z",
//!   "records": [ { "name": "Cloud Slime", ... } ],
//!   "categories": [ { "name": "Slime", ... } ]
//! }
//! ```
//!
//! Storage-internal identifiers never appear in a snapshot. The importer
//! checks the envelope field by field and pushes every record through the
//! normalizer; it never guesses a missing or unknown format version.

use crate::engine::{DEFAULT_STORE_TIMEOUT, SyncConfig};
use crate::error::{FormatError, SyncError, SyncResult};
use crate::executor::SyncExecutor;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use storefront_model::{Category, Product, normalize};
use storefront_storage::CatalogStore;
use tracing::{debug, info};

/// The only snapshot format version this build reads and writes.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// A serialized catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub format_version: u32,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<Product>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

impl Snapshot {
    /// Creates a current-version snapshot stamped with the current time.
    pub fn new(records: Vec<Product>, categories: Vec<Category>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            exported_at: Utc::now(),
            records,
            categories,
        }
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        self.to_json().map(String::into_bytes)
    }
}

/// Reads the whole catalog out of `store`, bounding each store call by
/// [`DEFAULT_STORE_TIMEOUT`].
pub async fn export_snapshot(store: &dyn CatalogStore) -> SyncResult<Snapshot> {
    export_snapshot_with_timeout(store, DEFAULT_STORE_TIMEOUT).await
}

/// Like [`export_snapshot`] with an explicit bound on each store call. A call
/// that exceeds it fails the export with [`SyncError::StoreUnavailable`].
pub async fn export_snapshot_with_timeout(
    store: &dyn CatalogStore,
    timeout: Duration,
) -> SyncResult<Snapshot> {
    let executor = SyncExecutor::new(SyncConfig {
        store_timeout: timeout,
        ..Default::default()
    });
    let records = executor
        .bounded(store.find_all())
        .await?
        .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
    let categories = executor
        .bounded(store.find_categories())
        .await?
        .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

    info!(
        "Exported {} products and {} categories from {} store",
        records.len(),
        categories.len(),
        store.backend_name()
    );
    Ok(Snapshot::new(records, categories))
}

/// Parses and validates a snapshot document.
pub fn parse_snapshot(bytes: &[u8]) -> Result<Snapshot, FormatError> {
    let text = std::str::from_utf8(bytes)?;
    let doc: Value = serde_json::from_str(text)?;
    let envelope = doc.as_object().ok_or(FormatError::NotAnObject)?;

    let format_version = match envelope.get("formatVersion") {
        None | Some(Value::Null) => return Err(FormatError::MissingVersion),
        Some(v) => v.as_u64().ok_or_else(|| FormatError::InvalidField {
            field: "formatVersion",
            reason: "must be a non-negative integer".into(),
        })?,
    };
    if format_version != u64::from(SNAPSHOT_FORMAT_VERSION) {
        return Err(FormatError::UnsupportedVersion(format_version));
    }

    let exported_at = parse_exported_at(envelope)?;

    let records = match envelope.get("records") {
        Some(Value::Array(records)) => records,
        Some(_) => {
            return Err(FormatError::InvalidField {
                field: "records",
                reason: "must be an array".into(),
            });
        }
        None => {
            return Err(FormatError::InvalidField {
                field: "records",
                reason: "is missing".into(),
            });
        }
    };
    let records = records
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            normalize(raw).map_err(|source| FormatError::InvalidRecord { index, source })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let categories = parse_categories(envelope)?;

    debug!(
        "Parsed snapshot v{} with {} records and {} categories",
        format_version,
        records.len(),
        categories.len()
    );
    Ok(Snapshot {
        format_version: SNAPSHOT_FORMAT_VERSION,
        exported_at,
        records,
        categories,
    })
}

/// Parses a snapshot and returns its records, in snapshot order.
pub fn import_snapshot(bytes: &[u8]) -> Result<Vec<Product>, FormatError> {
    parse_snapshot(bytes).map(|snapshot| snapshot.records)
}

fn parse_exported_at(envelope: &Map<String, Value>) -> Result<DateTime<Utc>, FormatError> {
    let invalid = |reason: String| FormatError::InvalidField {
        field: "exportedAt",
        reason,
    };
    match envelope.get("exportedAt") {
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| invalid(format!("is not an ISO-8601 timestamp: {e}"))),
        Some(_) => Err(invalid("must be a timestamp string".into())),
        None => Err(invalid("is missing".into())),
    }
}

fn parse_categories(envelope: &Map<String, Value>) -> Result<Vec<Category>, FormatError> {
    let entries = match envelope.get("categories") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            return Err(FormatError::InvalidField {
                field: "categories",
                reason: "must be an array".into(),
            });
        }
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let mut category: Category = serde_json::from_value(raw.clone())
                .map_err(|e| FormatError::InvalidCategory {
                    index,
                    reason: e.to_string(),
                })?;
            category.name = category.name.trim().to_string();
            if category.name.is_empty() {
                return Err(FormatError::InvalidCategory {
                    index,
                    reason: "name must not be empty".into(),
                });
            }
            Ok(category)
        })
        .collect()
}
