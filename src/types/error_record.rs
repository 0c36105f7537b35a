//! Run-scoped collection of non-fatal errors

use super::TreeSide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Pipeline stage where a non-fatal error occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorStage {
    Traversal,
    Hash,
    Copy,
}

impl ErrorStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorStage::Traversal => "traversal",
            ErrorStage::Hash => "hash",
            ErrorStage::Copy => "copy",
        }
    }
}

impl fmt::Display for ErrorStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-fatal failure: where, at which stage, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Path the failure refers to (absolute for traversal errors)
    pub path: PathBuf,
    /// Tree the failing entry belongs to; copy failures are tagged with the
    /// destination they were writing into
    pub side: TreeSide,
    pub stage: ErrorStage,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(
        path: impl Into<PathBuf>,
        side: TreeSide,
        stage: ErrorStage,
        cause: impl fmt::Display,
    ) -> Self {
        Self {
            path: path.into(),
            side,
            stage,
            message: cause.to_string(),
        }
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}: {}",
            self.stage,
            self.side,
            self.path.display(),
            self.message
        )
    }
}

/// Append-only, thread-safe error sink shared by every stage of a run
///
/// Clones share the same buffer. `drain` consumes one handle and takes the
/// records; it must be called after every producer has been joined.
#[derive(Debug, Clone, Default)]
pub struct ErrorSink {
    state: Arc<Mutex<SinkState>>,
}

#[derive(Debug, Default)]
struct SinkState {
    records: Vec<ErrorRecord>,
    /// Paths overwritten successfully after a destination-side error
    repaired: BTreeSet<PathBuf>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SinkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn record(&self, record: ErrorRecord) {
        tracing::warn!(
            stage = record.stage.as_str(),
            tree = record.side.as_str(),
            path = %record.path.display(),
            "{}",
            record.message
        );
        self.lock().records.push(record);
    }

    /// Note that the destination copy of `path` was replaced by a good copy
    ///
    /// Destination-side errors for `path` stay in the record list but no
    /// longer count toward [`failed_paths`](Self::failed_paths).
    pub fn mark_repaired(&self, path: &Path) {
        self.lock().repaired.insert(path.to_path_buf());
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of distinct paths left unsynchronized by a recorded failure
    ///
    /// A source-side error and a copy error on the same path count once.
    /// Destination-side errors on repaired paths do not count.
    pub fn failed_paths(&self) -> usize {
        let state = self.lock();
        let failed: BTreeSet<&PathBuf> = state
            .records
            .iter()
            .filter(|r| {
                !(r.side == TreeSide::Destination
                    && r.stage != ErrorStage::Copy
                    && state.repaired.contains(&r.path))
            })
            .map(|r| &r.path)
            .collect();
        failed.len()
    }

    /// Take every record collected so far
    pub fn drain(self) -> Vec<ErrorRecord> {
        let mut state = self.lock();
        std::mem::take(&mut state.records)
    }
}
