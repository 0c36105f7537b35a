//! Wiring and staged shutdown of one tree's pipeline

use super::{join_error, spawn_aggregator, ProgressCallback, RunContext};
use crate::config::Config;
use crate::hash::{HashStats, HashWorkerPool};
use crate::scanner::{spawn_scanner, ExcludeFilter, ScanStats};
use crate::types::{Snapshot, SyncError, TreeSide};
use std::path::Path;
use std::time::Instant;
use tokio::sync::mpsc;

/// Result of scanning and hashing one tree
#[derive(Debug, Clone)]
pub struct TreeScan {
    pub snapshot: Snapshot,
    pub scan: ScanStats,
    pub hash: HashStats,
}

/// Scan, hash and aggregate one tree into a snapshot
///
/// The root must already have been checked with
/// [`open_root`](crate::scanner::open_root).
pub async fn snapshot_tree(
    root: &Path,
    side: TreeSide,
    config: &Config,
    filter: ExcludeFilter,
    ctx: &RunContext,
    on_progress: Option<ProgressCallback>,
) -> Result<TreeScan, SyncError> {
    let started = Instant::now();
    let workers = config.hash_workers.max(1);
    let capacity = config.queue_capacity(workers);

    let (jobs_tx, jobs_rx) = mpsc::channel(capacity);
    let (results_tx, results_rx) = mpsc::channel(capacity);

    let aggregator = spawn_aggregator(root.to_path_buf(), side, results_rx, on_progress);
    let pool = HashWorkerPool::spawn(
        root.to_path_buf(),
        side,
        config.compare_mode,
        workers,
        jobs_rx,
        results_tx.clone(),
        ctx,
    );
    let scanner = spawn_scanner(root.to_path_buf(), side, filter, jobs_tx, ctx.clone());

    // 1. scanner done; its sender is gone, so the job queue is closed
    let scan = scanner.await.map_err(join_error)?;
    // 2. hash workers have drained the job queue and exited
    let hash = pool.join().await?;
    // 3. close the result queue by dropping the last sender
    drop(results_tx);
    // 4. aggregator has drained the result queue
    let builder = aggregator.await.map_err(join_error)?;

    let snapshot = builder.finish(started.elapsed());
    tracing::info!(
        tree = side.as_str(),
        files = snapshot.len(),
        bytes = snapshot.total_size(),
        elapsed_ms = snapshot.scan_duration().as_millis() as u64,
        "snapshot ready"
    );

    Ok(TreeScan {
        snapshot,
        scan,
        hash,
    })
}
