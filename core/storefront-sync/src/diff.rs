//! Diff engine. Computes the operations that turn the stored catalog into the
//! incoming one.
//!
//! Records are matched by [`IdentityKey`]. The output is deterministic:
//! operations follow the incoming catalog's order, and deletes (full-replace
//! mode only) are appended in current-catalog order.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use storefront_model::Product;
use storefront_types::IdentityKey;
use tracing::{debug, warn};

/// How records absent from the incoming catalog are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// Absent records are left untouched.
    #[default]
    Merge,
    /// Absent records are deleted from the store.
    FullReplace,
}

impl SyncMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncMode::Merge => "merge",
            SyncMode::FullReplace => "full-replace",
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "merge" => Ok(SyncMode::Merge),
            "full-replace" | "full_replace" | "replace" => Ok(SyncMode::FullReplace),
            other => Err(format!("unknown sync mode: {other}")),
        }
    }
}

/// Kind of a [`SyncOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
    Noop,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Insert => "insert",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
            OperationKind::Noop => "noop",
        };
        f.write_str(s)
    }
}

/// One computed instruction for the executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SyncOperation {
    Insert {
        key: IdentityKey,
        product: Product,
    },
    Update {
        key: IdentityKey,
        product: Product,
        /// Stored state before the update, for reporting.
        previous: Product,
    },
    Delete {
        key: IdentityKey,
        previous: Product,
    },
    Noop {
        key: IdentityKey,
    },
}

impl SyncOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            SyncOperation::Insert { .. } => OperationKind::Insert,
            SyncOperation::Update { .. } => OperationKind::Update,
            SyncOperation::Delete { .. } => OperationKind::Delete,
            SyncOperation::Noop { .. } => OperationKind::Noop,
        }
    }

    pub fn key(&self) -> &IdentityKey {
        match self {
            SyncOperation::Insert { key, .. }
            | SyncOperation::Update { key, .. }
            | SyncOperation::Delete { key, .. }
            | SyncOperation::Noop { key } => key,
        }
    }

    /// The record to write, for inserts and updates.
    pub fn payload(&self) -> Option<&Product> {
        match self {
            SyncOperation::Insert { product, .. } | SyncOperation::Update { product, .. } => {
                Some(product)
            }
            _ => None,
        }
    }

    /// The stored record being replaced or removed.
    pub fn previous(&self) -> Option<&Product> {
        match self {
            SyncOperation::Update { previous, .. } | SyncOperation::Delete { previous, .. } => {
                Some(previous)
            }
            _ => None,
        }
    }
}

/// Two incoming records share an identity key. The later one wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateKeyWarning {
    pub key: IdentityKey,
    /// Position of the first record with this key.
    pub first_index: usize,
    /// Position of the record that replaced it.
    pub duplicate_index: usize,
}

impl fmt::Display for DuplicateKeyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "duplicate identity key {:?}: record {} overrides record {}",
            self.key.as_str(),
            self.duplicate_index,
            self.first_index
        )
    }
}

/// Output of [`diff`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDiff {
    pub operations: Vec<SyncOperation>,
    pub warnings: Vec<DuplicateKeyWarning>,
}

impl CatalogDiff {
    /// Number of operations of the given kind.
    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    /// True when applying the diff would change nothing.
    pub fn is_noop(&self) -> bool {
        self.operations
            .iter()
            .all(|op| op.kind() == OperationKind::Noop)
    }
}

/// Compares the stored catalog with an incoming one.
///
/// Both sides are expected to be normalized and reference-resolved. Records
/// whose name yields no identity key are skipped with a warning.
pub fn diff(current: &[Product], incoming: &[Product], mode: SyncMode) -> CatalogDiff {
    let mut current_by_key: IndexMap<IdentityKey, &Product> = IndexMap::new();
    for product in current {
        let Ok(key) = product.identity_key() else {
            warn!("Stored product without identity key skipped: {:?}", product.name);
            continue;
        };
        if current_by_key.insert(key.clone(), product).is_some() {
            warn!("Store holds duplicate identity key {}", key);
        }
    }

    // key -> (first index, last index)
    let mut positions: HashMap<IdentityKey, (usize, usize)> = HashMap::new();
    let mut keyed: Vec<Option<IdentityKey>> = Vec::with_capacity(incoming.len());
    let mut warnings = Vec::new();

    for (index, product) in incoming.iter().enumerate() {
        let Ok(key) = product.identity_key() else {
            warn!("Incoming product without identity key skipped: {:?}", product.name);
            keyed.push(None);
            continue;
        };
        match positions.get_mut(&key) {
            Some((first, last)) => {
                warnings.push(DuplicateKeyWarning {
                    key: key.clone(),
                    first_index: *first,
                    duplicate_index: index,
                });
                *last = index;
            }
            None => {
                positions.insert(key.clone(), (index, index));
            }
        }
        keyed.push(Some(key));
    }

    let mut operations = Vec::with_capacity(positions.len());
    for (index, (product, key)) in incoming.iter().zip(keyed).enumerate() {
        let Some(key) = key else { continue };
        // Only the last occurrence of a key produces an operation.
        if positions.get(&key).map(|&(_, last)| last) != Some(index) {
            continue;
        }
        let op = match current_by_key.get(&key) {
            None => SyncOperation::Insert {
                key,
                product: product.clone(),
            },
            Some(stored) if stored.same_content(product) => SyncOperation::Noop { key },
            Some(stored) => SyncOperation::Update {
                key,
                product: product.clone(),
                previous: (*stored).clone(),
            },
        };
        operations.push(op);
    }

    if mode == SyncMode::FullReplace {
        for (key, stored) in &current_by_key {
            if !positions.contains_key(key) {
                operations.push(SyncOperation::Delete {
                    key: key.clone(),
                    previous: (*stored).clone(),
                });
            }
        }
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    let result = CatalogDiff {
        operations,
        warnings,
    };
    debug!(
        "Diff ({}): {} insert, {} update, {} delete, {} noop",
        mode,
        result.count(OperationKind::Insert),
        result.count(OperationKind::Update),
        result.count(OperationKind::Delete),
        result.count(OperationKind::Noop)
    );
    result
}
