//! Hash worker pool: job queue in, enriched records out

use super::compute_hash;
use crate::config::CompareMode;
use crate::pipeline::dispatch::{spawn_dispatcher, worker_inboxes};
use crate::pipeline::{join_error, RunContext};
use crate::types::{ErrorRecord, ErrorStage, FileRecord, SyncError, TreeSide};
use std::ops::AddAssign;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Per-tree hashing counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HashStats {
    pub workers: usize,
    /// Records that received a digest
    pub hashed: usize,
    /// Records forwarded with the unhashed marker after a read failure
    pub unhashed: usize,
    /// Records forwarded untouched (size-only comparison)
    pub passed_through: usize,
}

impl AddAssign for HashStats {
    fn add_assign(&mut self, other: Self) {
        self.hashed += other.hashed;
        self.unhashed += other.unhashed;
        self.passed_through += other.passed_through;
    }
}

/// Running hash workers for one tree
///
/// The pool owns the job queue's receiving end. It finishes once the job
/// queue is closed and drained; each worker holds a clone of the result
/// sender, so the result queue closes only after `join` returns and the
/// caller drops its own sender.
pub struct HashWorkerPool {
    side: TreeSide,
    dispatcher: JoinHandle<usize>,
    workers: Vec<JoinHandle<HashStats>>,
}

impl HashWorkerPool {
    pub fn spawn(
        root: PathBuf,
        side: TreeSide,
        mode: CompareMode,
        worker_count: usize,
        jobs: mpsc::Receiver<FileRecord>,
        results: mpsc::Sender<FileRecord>,
        ctx: &RunContext,
    ) -> Self {
        let root = Arc::new(root);
        let (inbox_txs, inbox_rxs) = worker_inboxes(worker_count);

        let workers = inbox_rxs
            .into_iter()
            .enumerate()
            .map(|(worker_id, inbox)| {
                tokio::spawn(hash_worker(
                    worker_id,
                    Arc::clone(&root),
                    mode,
                    inbox,
                    results.clone(),
                    ctx.clone(),
                ))
            })
            .collect::<Vec<_>>();
        drop(results);

        tracing::debug!(tree = side.as_str(), workers = workers.len(), %mode, "hash pool started");
        let dispatcher = spawn_dispatcher(jobs, inbox_txs, ctx.cancel.clone());

        Self {
            side,
            dispatcher,
            workers,
        }
    }

    /// Wait for the dispatcher and every worker to exit
    pub async fn join(self) -> Result<HashStats, SyncError> {
        let dispatched = self.dispatcher.await.map_err(join_error)?;
        let mut stats = HashStats {
            workers: self.workers.len(),
            ..HashStats::default()
        };
        for handle in self.workers {
            stats += handle.await.map_err(join_error)?;
        }
        tracing::debug!(
            tree = self.side.as_str(),
            dispatched,
            hashed = stats.hashed,
            unhashed = stats.unhashed,
            "hash pool drained"
        );
        Ok(stats)
    }
}

async fn hash_worker(
    worker_id: usize,
    root: Arc<PathBuf>,
    mode: CompareMode,
    mut inbox: mpsc::Receiver<FileRecord>,
    results: mpsc::Sender<FileRecord>,
    ctx: RunContext,
) -> HashStats {
    let mut stats = HashStats::default();

    while let Some(record) = inbox.recv().await {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let record = match mode {
            CompareMode::Size => {
                stats.passed_through += 1;
                record
            }
            CompareMode::Digest => {
                let record = hash_record(&root, record, &ctx).await;
                if record.has_digest() {
                    stats.hashed += 1;
                } else {
                    stats.unhashed += 1;
                }
                record
            }
        };

        tracing::trace!(worker_id, path = %record.path.display(), "hashed");
        if results.send(record).await.is_err() {
            break;
        }
    }

    stats
}

async fn hash_record(root: &Arc<PathBuf>, record: FileRecord, ctx: &RunContext) -> FileRecord {
    let absolute = root.join(&record.path);
    let outcome = tokio::task::spawn_blocking(move || compute_hash(&absolute)).await;

    let cause = match outcome {
        Ok(Ok(digest)) => {
            tracing::debug!(tree = record.side.as_str(), path = %record.path.display(), "digest computed");
            return record.with_digest(digest);
        }
        Ok(Err(error)) => error.to_string(),
        Err(join) => join.to_string(),
    };

    ctx.errors
        .record(ErrorRecord::new(&record.path, record.side, ErrorStage::Hash, cause));
    record.mark_unhashed()
}
