//! Sync executor. Applies diff operations to a store.
//!
//! Execution is sequential and keyed by identity, so replaying a prefix of
//! already-applied operations is a no-op. Per-record failures are recorded in
//! the report and never abort the run; only an unreachable store (or a store
//! call that exceeds the configured timeout) does.
//!
//! Runs happen in two phases:
//! 1. inserts, updates and no-ops, in input order
//! 2. deletes, only when phase 1 finished without a single failure

use crate::diff::{OperationKind, SyncOperation};
use crate::engine::{CategoryPolicy, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::report::{FailureKind, RecordFailure, ReportBuilder, SyncReport};
use std::collections::HashSet;
use std::future::Future;
use storefront_model::{Category, Product};
use storefront_storage::{CatalogStore, DeleteOutcome, StorageResult, UpsertOutcome};
use storefront_types::IdentityKey;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Applies [`SyncOperation`]s against a [`CatalogStore`].
#[derive(Debug, Clone, Default)]
pub struct SyncExecutor {
    config: SyncConfig,
}

impl SyncExecutor {
    pub fn new(config: SyncConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Applies `operations` in order and reports what actually happened.
    ///
    /// Returns `Err` only for run-level failures: the store failed its
    /// pre-flight check, or a store call timed out.
    pub async fn execute(
        &self,
        operations: Vec<SyncOperation>,
        store: &dyn CatalogStore,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncReport> {
        let report = ReportBuilder::new(self.config.mode);
        self.apply(operations, &[], store, cancel, report).await
    }

    /// Like [`execute`](Self::execute), continuing a report that may already
    /// hold validation failures and warnings, and seeding `categories` into
    /// the store before any product is written.
    pub(crate) async fn apply(
        &self,
        operations: Vec<SyncOperation>,
        categories: &[Category],
        store: &dyn CatalogStore,
        cancel: &CancellationToken,
        mut report: ReportBuilder,
    ) -> SyncResult<SyncReport> {
        info!(
            "Applying {} operations to {} store ({})",
            operations.len(),
            store.backend_name(),
            self.config.mode
        );

        self.bounded(store.health_check())
            .await?
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?;

        let mut known: HashSet<IdentityKey> = self
            .bounded(store.find_categories())
            .await?
            .map_err(|e| SyncError::StoreUnavailable(e.to_string()))?
            .iter()
            .filter_map(|c| c.identity_key().ok())
            .collect();

        for category in categories {
            self.seed_category(category, &mut known, store, &mut report)
                .await?;
        }

        let (deletes, writes): (Vec<_>, Vec<_>) = operations
            .into_iter()
            .partition(|op| op.kind() == OperationKind::Delete);

        let total_writes = writes.len();
        for (done, op) in writes.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(Self::cancelled(
                    report,
                    total_writes - done + deletes.len(),
                ));
            }
            self.apply_write(op, &mut known, store, &mut report).await?;
        }

        if !deletes.is_empty() && report.has_failures() {
            warn!(
                "Skipping {} deletes: earlier records failed in this run",
                deletes.len()
            );
            report.deletes_skipped(deletes.len());
            return Ok(Self::finish(report));
        }

        let total_deletes = deletes.len();
        for (done, op) in deletes.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(Self::cancelled(report, total_deletes - done));
            }
            self.apply_delete(op.key(), store, &mut report).await?;
        }

        Ok(Self::finish(report))
    }

    async fn apply_write(
        &self,
        op: SyncOperation,
        known: &mut HashSet<IdentityKey>,
        store: &dyn CatalogStore,
        report: &mut ReportBuilder,
    ) -> SyncResult<()> {
        let kind = op.kind();
        let (key, product) = match op {
            SyncOperation::Insert { key, product } | SyncOperation::Update { key, product, .. } => {
                (key, product)
            }
            SyncOperation::Noop { key } => {
                debug!("{} unchanged", key);
                report.unchanged();
                return Ok(());
            }
            SyncOperation::Delete { .. } => return Ok(()),
        };

        if let Err((failure, detail)) = self.ensure_category(&product, known, store, report).await? {
            warn!("{} skipped: {}", key, detail);
            report.failure(RecordFailure {
                key: Some(key),
                index: None,
                operation: Some(kind),
                kind: failure,
                detail,
            });
            return Ok(());
        }

        match self.bounded(store.upsert_by_identity(&product)).await? {
            Ok(UpsertOutcome::Inserted) => {
                debug!("{} inserted", key);
                report.inserted();
            }
            Ok(UpsertOutcome::Updated) => {
                debug!("{} updated", key);
                report.updated();
            }
            Ok(UpsertOutcome::Unchanged) => report.unchanged(),
            Err(e) => {
                warn!("{} failed: {}", key, e);
                report.failure(RecordFailure {
                    key: Some(key),
                    index: None,
                    operation: Some(kind),
                    kind: FailureKind::Store,
                    detail: e.to_string(),
                });
            }
        }
        Ok(())
    }

    async fn apply_delete(
        &self,
        key: &IdentityKey,
        store: &dyn CatalogStore,
        report: &mut ReportBuilder,
    ) -> SyncResult<()> {
        match self.bounded(store.delete_by_identity(key)).await? {
            Ok(DeleteOutcome::Deleted) => {
                debug!("{} deleted", key);
                report.deleted();
            }
            Ok(DeleteOutcome::Missing) => report.unchanged(),
            Err(e) => {
                warn!("{} delete failed: {}", key, e);
                report.failure(RecordFailure {
                    key: Some(key.clone()),
                    index: None,
                    operation: Some(OperationKind::Delete),
                    kind: FailureKind::Store,
                    detail: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Makes sure the product's category exists, creating it under
    /// [`CategoryPolicy::Create`]. The inner `Err` describes the record failure.
    async fn ensure_category(
        &self,
        product: &Product,
        known: &mut HashSet<IdentityKey>,
        store: &dyn CatalogStore,
        report: &mut ReportBuilder,
    ) -> SyncResult<Result<(), (FailureKind, String)>> {
        let Ok(category_key) = product.category_key() else {
            return Ok(Err((
                FailureKind::UnknownCategory,
                "product has no category".to_string(),
            )));
        };
        if known.contains(&category_key) {
            return Ok(Ok(()));
        }

        match self.config.category_policy {
            CategoryPolicy::Require => Ok(Err((
                FailureKind::UnknownCategory,
                format!("unknown category {:?}", product.category),
            ))),
            CategoryPolicy::Create => {
                let category = Category::placeholder(product.category.clone());
                match self.bounded(store.upsert_category(&category)).await? {
                    Ok(outcome) => {
                        if outcome == UpsertOutcome::Inserted {
                            info!("Created category {:?}", category.name);
                            report.category_created();
                        }
                        known.insert(category_key);
                        Ok(Ok(()))
                    }
                    Err(e) => Ok(Err((
                        FailureKind::Store,
                        format!("could not create category {:?}: {e}", product.category),
                    ))),
                }
            }
        }
    }

    async fn seed_category(
        &self,
        category: &Category,
        known: &mut HashSet<IdentityKey>,
        store: &dyn CatalogStore,
        report: &mut ReportBuilder,
    ) -> SyncResult<()> {
        let key = category.identity_key().ok();
        match self.bounded(store.upsert_category(category)).await? {
            Ok(outcome) => {
                if outcome == UpsertOutcome::Inserted {
                    report.category_created();
                }
                known.extend(key);
            }
            Err(e) => {
                warn!("Category {:?} failed: {}", category.name, e);
                report.failure(RecordFailure {
                    key,
                    index: None,
                    operation: None,
                    kind: FailureKind::Store,
                    detail: e.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Runs one store call under the configured timeout. The outer error is
    /// the run-level timeout; the inner result belongs to the record.
    pub(crate) async fn bounded<T>(
        &self,
        call: impl Future<Output = StorageResult<T>>,
    ) -> SyncResult<StorageResult<T>> {
        tokio::time::timeout(self.config.store_timeout, call)
            .await
            .map_err(|_| {
                SyncError::StoreUnavailable(format!(
                    "store call timed out after {:?}",
                    self.config.store_timeout
                ))
            })
    }

    fn cancelled(mut report: ReportBuilder, remaining: usize) -> SyncReport {
        warn!("Sync cancelled, {} operations not attempted", remaining);
        report.not_attempted(remaining);
        report.cancelled();
        Self::finish(report)
    }

    fn finish(report: ReportBuilder) -> SyncReport {
        let report = report.finish();
        info!(
            "Sync finished: {} inserted, {} updated, {} deleted, {} unchanged, {} failed",
            report.inserted, report.updated, report.deleted, report.unchanged, report.failed
        );
        report
    }
}
