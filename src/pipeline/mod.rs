//! Scan → hash → aggregate pipeline for one tree
//!
//! Each tree runs three stages connected by bounded queues:
//!
//! ```text
//! scanner ──jobs──▶ hash pool (N workers) ──results──▶ aggregator ──▶ Snapshot
//! ```
//!
//! Shutdown is staged: the scanner closes the job queue, the hash workers
//! drain it and exit, the last result sender is dropped, and only then does
//! the aggregator see the end of the result queue.

mod aggregate;
mod cancel;
pub(crate) mod dispatch;
mod tree;

pub use aggregate::spawn_aggregator;
pub use cancel::{CancelToken, DeadlineGuard};
pub use tree::{snapshot_tree, TreeScan};

use crate::types::{ErrorSink, SyncError};
use std::sync::Arc;

/// Shared state threaded through every stage of one run
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub errors: ErrorSink,
    pub cancel: CancelToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Callback for reporting aggregation progress
///
/// Arguments:
/// - `files`: records merged so far
/// - `bytes`: bytes covered by those records
pub type ProgressCallback = Arc<dyn Fn(u64, u64) + Send + Sync>;

pub(crate) fn join_error(error: tokio::task::JoinError) -> SyncError {
    SyncError::Pipeline(format!("pipeline task failed: {}", error))
}
