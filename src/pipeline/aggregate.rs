//! Fan-in of hashed records into a snapshot

use super::ProgressCallback;
use crate::types::{FileRecord, SnapshotBuilder, TreeSide};
use std::path::PathBuf;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Drain `results` into a snapshot builder
///
/// The task completes only when every sender of the result queue has been
/// dropped, so a caller awaiting it must close the queue first.
pub fn spawn_aggregator(
    root: PathBuf,
    side: TreeSide,
    mut results: mpsc::Receiver<FileRecord>,
    on_progress: Option<ProgressCallback>,
) -> JoinHandle<SnapshotBuilder> {
    tokio::spawn(async move {
        let mut builder = SnapshotBuilder::new(root, side);
        let mut merged: u64 = 0;
        let mut bytes: u64 = 0;

        while let Some(record) = results.recv().await {
            merged += 1;
            bytes += record.size;
            if let Some(replaced) = builder.insert(record) {
                tracing::warn!(
                    tree = side.as_str(),
                    path = %replaced.path.display(),
                    "duplicate record replaced"
                );
            }
            if let Some(callback) = &on_progress {
                callback(merged, bytes);
            }
        }

        tracing::debug!(tree = side.as_str(), files = builder.len(), "aggregation finished");
        builder
    })
}
