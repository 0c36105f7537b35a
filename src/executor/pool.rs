//! Copy worker pool
//!
//! Same dispatcher + worker inbox design as the hash pool:
//! - single-consumer upstream `mpsc::Receiver` (dispatcher)
//! - per-worker `mpsc` inbox channels
//! - copies run on the blocking pool so slow disks never stall the runtime

use super::copy::copy_file_atomic;
use super::{emit_event, ExecutionCallback, ExecutionEvent};
use crate::pipeline::dispatch::{spawn_dispatcher, worker_inboxes};
use crate::pipeline::{join_error, RunContext};
use crate::types::{ErrorRecord, ErrorStage, SyncAction, SyncError, TreeSide};
use serde::Serialize;
use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Copy pool counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CopyStats {
    pub workers: usize,
    pub copied: usize,
    pub failed: usize,
    pub bytes_copied: u64,
    /// Planned actions never handed to a worker because the run was cancelled.
    pub not_attempted: usize,
}

impl AddAssign for CopyStats {
    fn add_assign(&mut self, other: Self) {
        self.copied += other.copied;
        self.failed += other.failed;
        self.bytes_copied += other.bytes_copied;
    }
}

struct Roots {
    source: PathBuf,
    destination: PathBuf,
}

/// Running copy workers for one plan.
pub struct CopyWorkerPool {
    dispatcher: JoinHandle<usize>,
    workers: Vec<JoinHandle<CopyStats>>,
}

impl CopyWorkerPool {
    pub fn spawn(
        source: PathBuf,
        destination: PathBuf,
        worker_count: usize,
        jobs: mpsc::Receiver<SyncAction>,
        ctx: &RunContext,
        on_event: Option<ExecutionCallback>,
    ) -> Self {
        let roots = Arc::new(Roots {
            source,
            destination,
        });
        let (inbox_txs, inbox_rxs) = worker_inboxes(worker_count);

        let workers = inbox_rxs
            .into_iter()
            .enumerate()
            .map(|(worker_id, inbox)| {
                tokio::spawn(copy_worker(
                    worker_id,
                    Arc::clone(&roots),
                    inbox,
                    ctx.clone(),
                    on_event.clone(),
                ))
            })
            .collect::<Vec<_>>();

        tracing::debug!(workers = workers.len(), "copy pool started");
        let dispatcher = spawn_dispatcher(jobs, inbox_txs, ctx.cancel.clone());

        Self {
            dispatcher,
            workers,
        }
    }

    /// Wait for the dispatcher and every worker to exit.
    pub async fn join(self) -> Result<CopyStats, SyncError> {
        let dispatched = self.dispatcher.await.map_err(join_error)?;
        let mut stats = CopyStats {
            workers: self.workers.len(),
            ..CopyStats::default()
        };
        for handle in self.workers {
            stats += handle.await.map_err(join_error)?;
        }
        tracing::debug!(dispatched, copied = stats.copied, "copy pool drained");
        Ok(stats)
    }
}

async fn copy_worker(
    worker_id: usize,
    roots: Arc<Roots>,
    mut inbox: mpsc::Receiver<SyncAction>,
    ctx: RunContext,
    on_event: Option<ExecutionCallback>,
) -> CopyStats {
    let mut stats = CopyStats::default();

    while let Some(action) = inbox.recv().await {
        if ctx.cancel.is_cancelled() {
            break;
        }

        emit_event(
            on_event.as_deref(),
            ExecutionEvent::ActionStart {
                worker_id,
                reason: action.reason,
                path: action.path.clone(),
            },
        );

        let src = roots.source.join(&action.path);
        let dest = roots.destination.join(&action.path);
        let permissions = action.permissions;
        let outcome =
            tokio::task::spawn_blocking(move || copy_file_atomic(&src, &dest, permissions)).await;

        let message = match outcome {
            Ok(Ok(bytes)) => {
                ctx.errors.mark_repaired(&action.path);
                stats.copied += 1;
                stats.bytes_copied += bytes;
                tracing::debug!(
                    worker_id,
                    path = %action.path.display(),
                    reason = action.reason.label(),
                    bytes,
                    "copied"
                );
                emit_event(
                    on_event.as_deref(),
                    ExecutionEvent::ActionSuccess {
                        worker_id,
                        reason: action.reason,
                        path: action.path,
                        bytes_copied: bytes,
                    },
                );
                continue;
            }
            Ok(Err(error)) => error.to_string(),
            Err(join) => join.to_string(),
        };

        stats.failed += 1;
        ctx.errors.record(ErrorRecord::new(
            &action.path,
            TreeSide::Destination,
            ErrorStage::Copy,
            &message,
        ));
        emit_event(
            on_event.as_deref(),
            ExecutionEvent::ActionError {
                worker_id,
                reason: action.reason,
                path: action.path,
                message,
            },
        );
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CopyReason;
    use std::fs;

    async fn run_pool(
        source: PathBuf,
        destination: PathBuf,
        actions: Vec<SyncAction>,
        workers: usize,
        ctx: &RunContext,
    ) -> CopyStats {
        let (tx, rx) = mpsc::channel(workers);
        let pool = CopyWorkerPool::spawn(source, destination, workers, rx, ctx, None);
        for action in actions {
            tx.send(action).await.expect("enqueue");
        }
        drop(tx);
        pool.join().await.expect("pool joined")
    }

    #[tokio::test]
    async fn test_many_workers_share_parent_directories() {
        let src = tempfile::tempdir().expect("src");
        let dst = tempfile::tempdir().expect("dst");
        fs::create_dir_all(src.path().join("a/b/c")).expect("mkdir");

        let actions: Vec<SyncAction> = (0..64)
            .map(|i| {
                let rel = PathBuf::from(format!("a/b/c/f{i}.bin"));
                fs::write(src.path().join(&rel), vec![i as u8; 100]).expect("write");
                SyncAction::new(rel, 100, 0o644, CopyReason::New)
            })
            .collect();

        let ctx = RunContext::new();
        let stats = run_pool(
            src.path().to_path_buf(),
            dst.path().to_path_buf(),
            actions,
            16,
            &ctx,
        )
        .await;

        assert_eq!(stats.workers, 16);
        assert_eq!(stats.copied, 64);
        assert_eq!(stats.bytes_copied, 6400);
        assert!(ctx.errors.is_empty(), "errors: {:?}", ctx.errors.drain());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn test_copied_file_gets_action_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let src = tempfile::tempdir().expect("src");
        let dst = tempfile::tempdir().expect("dst");
        fs::write(src.path().join("script.sh"), b"#!/bin/sh\n").expect("write");

        let ctx = RunContext::new();
        let action = SyncAction::new(PathBuf::from("script.sh"), 10, 0o750, CopyReason::New);
        run_pool(
            src.path().to_path_buf(),
            dst.path().to_path_buf(),
            vec![action],
            1,
            &ctx,
        )
        .await;

        let mode = fs::metadata(dst.path().join("script.sh"))
            .expect("metadata")
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o750);
    }
}
