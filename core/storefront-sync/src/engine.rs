//! Sync engine: the single entry point that wires the pipeline together.
//!
//! A run loads the source catalog, validates and resolves every record, diffs
//! it against the store and hands the operations to the [`SyncExecutor`]. The
//! engine holds no state between runs; store handles are passed in by the
//! caller, who also owns their lifecycle.

use crate::diff::{DuplicateKeyWarning, SyncMode, SyncOperation, diff};
use crate::error::{SyncError, SyncResult};
use crate::executor::SyncExecutor;
use crate::report::{FailureKind, RecordFailure, ReportBuilder, SyncReport};
use crate::snapshot::parse_snapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use storefront_model::{Category, Product, normalize, resolve_references};
use storefront_storage::CatalogStore;
use storefront_types::IdentityKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Default bound on a single store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(30);

/// What the executor does with a product whose category the store lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryPolicy {
    /// Create a placeholder category and write the product.
    #[default]
    Create,
    /// Record the product as failed.
    Require,
}

impl fmt::Display for CategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategoryPolicy::Create => f.write_str("create"),
            CategoryPolicy::Require => f.write_str("require"),
        }
    }
}

impl FromStr for CategoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(CategoryPolicy::Create),
            "require" => Ok(CategoryPolicy::Require),
            other => Err(format!("unknown category policy: {other}")),
        }
    }
}

/// Configuration for a sync run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Whether records missing from the source are deleted.
    pub mode: SyncMode,
    pub category_policy: CategoryPolicy,
    /// Upper bound on every individual store call.
    pub store_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            mode: SyncMode::Merge,
            category_policy: CategoryPolicy::Create,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Where the incoming catalog comes from.
pub enum SyncSource<'a> {
    /// A snapshot document. Structural problems abort the run.
    Snapshot(&'a [u8]),
    /// Another store, typically a staging database.
    Store(&'a dyn CatalogStore),
    /// Raw seed records. Invalid records are reported and skipped.
    Records(Vec<Value>),
}

impl fmt::Debug for SyncSource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncSource::Snapshot(bytes) => write!(f, "Snapshot({} bytes)", bytes.len()),
            SyncSource::Store(store) => write!(f, "Store({})", store.backend_name()),
            SyncSource::Records(records) => write!(f, "Records({})", records.len()),
        }
    }
}

/// The computed, not yet applied, result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPlan {
    pub mode: SyncMode,
    pub operations: Vec<SyncOperation>,
    pub warnings: Vec<DuplicateKeyWarning>,
    /// Source records rejected by the normalizer.
    pub rejected: Vec<RecordFailure>,
    /// Categories carried by the source, seeded before products.
    pub categories: Vec<Category>,
}

/// Incoming catalog after validation, before diffing.
struct LoadedSource {
    products: Vec<Product>,
    rejected: Vec<RecordFailure>,
    categories: Vec<Category>,
}

/// Plans and runs catalog syncs with one configuration.
#[derive(Debug, Clone, Default)]
pub struct SyncEngine {
    config: SyncConfig,
    executor: SyncExecutor,
}

impl SyncEngine {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            executor: SyncExecutor::new(config.clone()),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Computes the operations a run would apply, without writing anything.
    pub async fn plan(
        &self,
        store: &dyn CatalogStore,
        source: SyncSource<'_>,
    ) -> SyncResult<SyncPlan> {
        debug!("Planning sync from {:?}", source);
        let loaded = self.load(source).await?;

        self.executor
            .bounded(store.health_check())
            .await?
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
        let current = self
            .executor
            .bounded(store.find_all())
            .await?
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

        let incoming: Vec<Product> = loaded.products.into_iter().map(resolve_references).collect();
        let computed = diff(&current, &incoming, self.config.mode);

        Ok(SyncPlan {
            mode: self.config.mode,
            operations: computed.operations,
            warnings: computed.warnings,
            rejected: loaded.rejected,
            categories: loaded.categories,
        })
    }

    /// Plans and applies a sync.
    pub async fn run(
        &self,
        store: &dyn CatalogStore,
        source: SyncSource<'_>,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncReport> {
        let plan = self.plan(store, source).await?;
        info!(
            "Sync plan: {} operations, {} rejected records, {} duplicate keys",
            plan.operations.len(),
            plan.rejected.len(),
            plan.warnings.len()
        );

        let mut report = ReportBuilder::new(plan.mode);
        report.warnings(plan.warnings);
        for failure in plan.rejected {
            report.failure(failure);
        }

        self.executor
            .apply(plan.operations, &plan.categories, store, cancel, report)
            .await
    }

    async fn load(&self, source: SyncSource<'_>) -> SyncResult<LoadedSource> {
        match source {
            SyncSource::Snapshot(bytes) => {
                let snapshot = parse_snapshot(bytes)?;
                Ok(LoadedSource {
                    products: snapshot.records,
                    rejected: Vec::new(),
                    categories: snapshot.categories,
                })
            }
            SyncSource::Store(source) => {
                let products = self
                    .executor
                    .bounded(source.find_all())
                    .await?
                    .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
                let categories = self
                    .executor
                    .bounded(source.find_categories())
                    .await?
                    .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;
                // Stored records pass the same boundary as any other input.
                let raw = products
                    .iter()
                    .map(serde_json::to_value)
                    .collect::<Result<Vec<_>, _>>()?;
                let (products, rejected) = normalize_all(&raw);
                Ok(LoadedSource {
                    products,
                    rejected,
                    categories,
                })
            }
            SyncSource::Records(raw) => {
                let (products, rejected) = normalize_all(&raw);
                Ok(LoadedSource {
                    products,
                    rejected,
                    categories: Vec::new(),
                })
            }
        }
    }
}

/// Normalizes every raw record, splitting valid products from rejections.
fn normalize_all(raw: &[Value]) -> (Vec<Product>, Vec<RecordFailure>) {
    let mut products = Vec::with_capacity(raw.len());
    let mut rejected = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        match normalize(record) {
            Ok(product) => products.push(product),
            Err(e) => {
                debug!("Record {} rejected: {}", index, e);
                let key = record
                    .get("name")
                    .and_then(Value::as_str)
                    .and_then(|name| IdentityKey::from_name(name).ok());
                rejected.push(RecordFailure {
                    key,
                    index: Some(index),
                    operation: None,
                    kind: FailureKind::Validation,
                    detail: e.to_string(),
                });
            }
        }
    }

    (products, rejected)
}

/// Runs one sync: the entry point for CLI and route wrappers.
///
/// Callers authenticate and serialize full-replace runs themselves.
pub async fn run_sync(
    store: &dyn CatalogStore,
    source: SyncSource<'_>,
    config: SyncConfig,
    cancel: &CancellationToken,
) -> SyncResult<SyncReport> {
    SyncEngine::new(config).run(store, source, cancel).await
}
