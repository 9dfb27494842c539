//! Sync report: the structured outcome of one run.

use crate::diff::{DuplicateKeyWarning, OperationKind, SyncMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use storefront_types::IdentityKey;

/// Why a single record did not make it into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The raw record was rejected by the normalizer.
    Validation,
    /// The product names a category the store does not know, and the run
    /// does not create categories.
    UnknownCategory,
    /// The store rejected the write.
    Store,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::Validation => "validation",
            FailureKind::UnknownCategory => "unknown_category",
            FailureKind::Store => "store",
        };
        f.write_str(s)
    }
}

/// One failed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFailure {
    /// Identity key, when the record got far enough to have one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<IdentityKey>,
    /// Position in the raw input, for validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    pub kind: FailureKind,
    pub detail: String,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.key, self.index) {
            (Some(key), _) => write!(f, "{} [{}]: {}", key, self.kind, self.detail),
            (None, Some(index)) => write!(f, "record {} [{}]: {}", index, self.kind, self.detail),
            (None, None) => write!(f, "[{}]: {}", self.kind, self.detail),
        }
    }
}

/// Coarse classification of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Nothing failed and nothing changed.
    NoChanges,
    /// Nothing failed and at least one record changed.
    Applied,
    /// At least one record failed.
    PartiallyFailed,
    /// The run was cancelled before finishing.
    Cancelled,
}

/// Aggregate result of a sync run. Immutable once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub mode: SyncMode,
    pub inserted: usize,
    pub updated: usize,
    pub deleted: usize,
    pub unchanged: usize,
    pub failed: usize,
    pub deletes_skipped: usize,
    pub not_attempted: usize,
    pub categories_created: usize,
    pub failures: Vec<RecordFailure>,
    pub warnings: Vec<DuplicateKeyWarning>,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    /// Records actually written or removed.
    pub fn net_changes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.cancelled {
            RunOutcome::Cancelled
        } else if self.has_failures() {
            RunOutcome::PartiallyFailed
        } else if self.net_changes() == 0 {
            RunOutcome::NoChanges
        } else {
            RunOutcome::Applied
        }
    }
}

/// Mutable accumulator, sealed into a [`SyncReport`] by [`finish`](Self::finish).
#[derive(Debug)]
pub(crate) struct ReportBuilder {
    report: SyncReport,
}

impl ReportBuilder {
    pub(crate) fn new(mode: SyncMode) -> Self {
        let now = Utc::now();
        Self {
            report: SyncReport {
                mode,
                inserted: 0,
                updated: 0,
                deleted: 0,
                unchanged: 0,
                failed: 0,
                deletes_skipped: 0,
                not_attempted: 0,
                categories_created: 0,
                failures: Vec::new(),
                warnings: Vec::new(),
                cancelled: false,
                started_at: now,
                finished_at: now,
            },
        }
    }

    pub(crate) fn has_failures(&self) -> bool {
        self.report.failed > 0
    }

    pub(crate) fn inserted(&mut self) {
        self.report.inserted += 1;
    }

    pub(crate) fn updated(&mut self) {
        self.report.updated += 1;
    }

    pub(crate) fn deleted(&mut self) {
        self.report.deleted += 1;
    }

    pub(crate) fn unchanged(&mut self) {
        self.report.unchanged += 1;
    }

    pub(crate) fn category_created(&mut self) {
        self.report.categories_created += 1;
    }

    pub(crate) fn deletes_skipped(&mut self, count: usize) {
        self.report.deletes_skipped += count;
    }

    pub(crate) fn not_attempted(&mut self, count: usize) {
        self.report.not_attempted += count;
    }

    pub(crate) fn cancelled(&mut self) {
        self.report.cancelled = true;
    }

    pub(crate) fn warnings(&mut self, warnings: impl IntoIterator<Item = DuplicateKeyWarning>) {
        self.report.warnings.extend(warnings);
    }

    pub(crate) fn failure(&mut self, failure: RecordFailure) {
        self.report.failed += 1;
        self.report.failures.push(failure);
    }

    pub(crate) fn finish(mut self) -> SyncReport {
        self.report.finished_at = Utc::now();
        self.report
    }
}
