//! Executor module: applies a [`DiffPlan`] to the destination tree

pub mod copy;
mod dry_run;
mod pool;

pub use copy::{copy_file_atomic, ensure_parent_dirs};
pub use dry_run::{Manifest, ManifestEntry};
pub use pool::{CopyStats, CopyWorkerPool};

use crate::diff::DiffPlan;
use crate::pipeline::RunContext;
use crate::types::{CopyReason, SyncError};
use crate::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Events emitted while executing a plan.
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    /// A copy worker picked up an action.
    ActionStart {
        worker_id: usize,
        reason: CopyReason,
        path: PathBuf,
    },
    /// Action execution succeeded.
    ActionSuccess {
        worker_id: usize,
        reason: CopyReason,
        path: PathBuf,
        bytes_copied: u64,
    },
    /// Action execution failed but the pool continued.
    ActionError {
        worker_id: usize,
        reason: CopyReason,
        path: PathBuf,
        message: String,
    },
    /// Plan execution completed (with or without errors).
    Complete { stats: CopyStats },
}

/// Optional callback used to receive execution events.
///
/// Invoked from copy workers concurrently.
pub type ExecutionCallback = Arc<dyn Fn(&ExecutionEvent) + Send + Sync>;

/// Execute a sync plan with the copy worker pool
///
/// Per-file failures are recorded in `ctx.errors` and counted in the returned
/// stats; they never abort the plan. Only a panicked pipeline task is an error.
/// When `ctx.cancel` fires, actions not yet handed to a worker are counted as
/// `not_attempted`.
pub async fn execute_plan(
    plan: &DiffPlan,
    config: &Config,
    ctx: &RunContext,
    on_event: Option<ExecutionCallback>,
) -> Result<CopyStats, SyncError> {
    let workers = config.copy_workers;
    let (jobs_tx, jobs_rx) = mpsc::channel(config.queue_capacity(workers));
    let pool = CopyWorkerPool::spawn(
        config.source.clone(),
        config.destination.clone(),
        workers,
        jobs_rx,
        ctx,
        on_event.clone(),
    );

    let mut enqueued = 0usize;
    for action in &plan.actions {
        let sent = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => break,
            sent = jobs_tx.send(action.clone()) => sent,
        };
        if sent.is_err() {
            break;
        }
        enqueued += 1;
    }
    drop(jobs_tx);

    let mut stats = pool.join().await?;
    stats.not_attempted = plan.actions.len().saturating_sub(stats.copied + stats.failed);
    tracing::debug!(
        planned = plan.actions.len(),
        enqueued,
        copied = stats.copied,
        failed = stats.failed,
        "copy plan finished"
    );

    emit_event(
        on_event.as_deref(),
        ExecutionEvent::Complete {
            stats: stats.clone(),
        },
    );
    Ok(stats)
}

pub(crate) fn emit_event(
    on_event: Option<&(dyn Fn(&ExecutionEvent) + Send + Sync)>,
    event: ExecutionEvent,
) {
    if let Some(callback) = on_event {
        callback(&event);
    }
}
