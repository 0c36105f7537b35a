//! Sync plan generation

use super::compare_records;
use crate::config::CompareMode;
use crate::types::{CopyReason, Snapshot, SyncAction};

/// Diff plan containing the copy actions and statistics
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiffPlan {
    /// Files to copy, sorted by path
    pub actions: Vec<SyncAction>,

    /// Aggregate statistics about the plan
    pub stats: PlanStats,
}

impl DiffPlan {
    /// Create a new empty diff plan
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action to the plan and update statistics
    pub fn add_action(&mut self, action: SyncAction) {
        match action.reason {
            CopyReason::New => self.stats.new_count += 1,
            CopyReason::Changed => self.stats.changed_count += 1,
            CopyReason::Unverified => self.stats.unverified_count += 1,
        }
        self.stats.total_files += 1;
        self.stats.total_bytes += action.size;
        self.actions.push(action);
    }

    /// Count a source file that needs no copy
    pub fn add_unchanged(&mut self) {
        self.stats.unchanged_count += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Sort actions by path for deterministic output
    pub fn sort_by_path(&mut self) {
        self.actions.sort_by(|a, b| a.path.cmp(&b.path));
    }
}

/// Statistics about a diff plan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanStats {
    /// Files to copy
    pub total_files: usize,

    /// Bytes to copy (source sizes at scan time)
    pub total_bytes: u64,

    /// Missing at the destination
    pub new_count: usize,

    /// Present but different
    pub changed_count: usize,

    /// Forced because a digest could not be computed
    pub unverified_count: usize,

    /// Source files already up to date
    pub unchanged_count: usize,
}

/// Generate a sync plan by comparing source and destination snapshots
///
/// Every source path is either scheduled for copy or counted as unchanged.
/// Destination-only paths are ignored: nothing is ever deleted.
///
/// # Example
/// ```
/// use treesync::config::CompareMode;
/// use treesync::diff::generate_sync_plan;
/// use treesync::types::{FileRecord, SnapshotBuilder, TreeSide};
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// let mut src = SnapshotBuilder::new(PathBuf::from("src"), TreeSide::Source);
/// src.insert(FileRecord::new(PathBuf::from("new.txt"), 4, 0o644, TreeSide::Source));
/// let src = src.finish(Duration::ZERO);
/// let dest = SnapshotBuilder::new(PathBuf::from("dst"), TreeSide::Destination)
///     .finish(Duration::ZERO);
///
/// let plan = generate_sync_plan(&src, &dest, CompareMode::Digest);
/// assert_eq!(plan.stats.new_count, 1);
/// ```
pub fn generate_sync_plan(src: &Snapshot, dest: &Snapshot, mode: CompareMode) -> DiffPlan {
    let mut plan = DiffPlan::new();

    for (path, src_record) in src.iter() {
        let reason = match dest.get(path) {
            None => Some(CopyReason::New),
            Some(dest_record) => compare_records(src_record, dest_record, mode),
        };

        match reason {
            Some(reason) => {
                tracing::debug!(path = %path.display(), reason = reason.label(), "scheduled for copy");
                plan.add_action(SyncAction::new(
                    path.clone(),
                    src_record.size,
                    src_record.permissions,
                    reason,
                ));
            }
            None => plan.add_unchanged(),
        }
    }

    plan.sort_by_path();
    if plan.is_empty() {
        tracing::info!("no changes detected; source and destination are in sync");
    }
    plan
}
