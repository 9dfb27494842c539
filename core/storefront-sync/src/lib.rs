//! Catalog sync engine for the storefront.
//!
//! Reconciles an authoritative catalog (a snapshot file, raw seed records or
//! another store) against a live [`CatalogStore`](storefront_storage::CatalogStore).
//!
//! ## Pipeline
//!
//! 1. **Load**: parse the snapshot, or normalize raw records
//! 2. **Resolve**: make image references consistent
//! 3. **Diff**: compute insert/update/delete/noop operations by identity key
//! 4. **Execute**: apply them, isolating per-record failures
//! 5. **Report**: return a [`SyncReport`] describing what actually changed
//!
//! # Example
//!
//! ```no_run
//! use storefront_storage::MemoryStore;
//! use storefront_sync::{CancellationToken, SyncConfig, SyncMode, SyncSource, run_sync};
//!
//! # async fn example() -> storefront_sync::SyncResult<()> {
//! let store = MemoryStore::new();
//! let records = vec![serde_json::json!({
//!     "name": "Cloud Slime",
//!     "description": "Fluffy",
//!     "price": 12,
//!     "category": "Slime",
//! })];
//! let config = SyncConfig {
//!     mode: SyncMode::FullReplace,
//!     ..Default::default()
//! };
//! let report = run_sync(&store, SyncSource::Records(records), config, &CancellationToken::new()).await?;
//! assert_eq!(report.inserted, 1);
//! # Ok(())
//! # }
//! ```

mod diff;
mod engine;
mod error;
mod executor;
mod report;
mod snapshot;

pub use diff::{CatalogDiff, DuplicateKeyWarning, OperationKind, SyncMode, SyncOperation, diff};
pub use engine::{
    CategoryPolicy, DEFAULT_STORE_TIMEOUT, SyncConfig, SyncEngine, SyncPlan, SyncSource, run_sync,
};
pub use error::{FormatError, SyncError, SyncResult};
pub use executor::SyncExecutor;
pub use report::{FailureKind, RecordFailure, RunOutcome, SyncReport};
pub use snapshot::{
    SNAPSHOT_FORMAT_VERSION, Snapshot, export_snapshot, export_snapshot_with_timeout,
    import_snapshot, parse_snapshot,
};

// Re-exported so callers need not depend on tokio-util directly.
pub use tokio_util::sync::CancellationToken;
