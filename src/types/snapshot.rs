//! Snapshot - Immutable, path-keyed view of one scanned tree

use super::{FileRecord, TreeSide};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Read-only result of scanning and hashing one tree
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    root_path: PathBuf,
    side: TreeSide,
    entries: HashMap<PathBuf, FileRecord>,
    total_size: u64,
    scan_duration: Duration,
}

impl Snapshot {
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn side(&self) -> TreeSide {
        self.side
    }

    pub fn get(&self, path: &Path) -> Option<&FileRecord> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all record sizes
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Wall-clock time from scan start until the last result was merged
    pub fn scan_duration(&self) -> Duration {
        self.scan_duration
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PathBuf, &FileRecord)> {
        self.entries.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.keys()
    }
}

/// Write side of a snapshot; only the aggregator owns one
#[derive(Debug)]
pub struct SnapshotBuilder {
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    pub fn new(root_path: PathBuf, side: TreeSide) -> Self {
        Self {
            snapshot: Snapshot {
                root_path,
                side,
                entries: HashMap::new(),
                total_size: 0,
                scan_duration: Duration::ZERO,
            },
        }
    }

    /// Merge a record, replacing any earlier record at the same path
    ///
    /// Returns the replaced record, if any.
    pub fn insert(&mut self, record: FileRecord) -> Option<FileRecord> {
        let snapshot = &mut self.snapshot;
        snapshot.total_size += record.size;
        let replaced = snapshot.entries.insert(record.path.clone(), record);
        if let Some(old) = &replaced {
            snapshot.total_size = snapshot.total_size.saturating_sub(old.size);
        }
        replaced
    }

    pub fn len(&self) -> usize {
        self.snapshot.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.entries.is_empty()
    }

    /// Freeze into a read-only snapshot
    pub fn finish(mut self, scan_duration: Duration) -> Snapshot {
        self.snapshot.scan_duration = scan_duration;
        self.snapshot
    }
}
