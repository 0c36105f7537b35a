//! Report-only sink used in place of the copy pool for dry runs

use crate::diff::DiffPlan;
use crate::types::CopyReason;
use serde::Serialize;
use std::path::PathBuf;

/// One file a real run would copy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub size: u64,
    pub reason: CopyReason,
}

/// Everything a real run would copy, sorted by path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Manifest {
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Record every planned action without touching the filesystem
    pub fn from_plan(plan: &DiffPlan) -> Self {
        let mut entries: Vec<ManifestEntry> = plan
            .actions
            .iter()
            .map(|action| {
                tracing::debug!(
                    path = %action.path.display(),
                    size = action.size,
                    reason = action.reason.label(),
                    "would copy"
                );
                ManifestEntry {
                    path: action.path.clone(),
                    size: action.size,
                    reason: action.reason,
                }
            })
            .collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.entries.iter().map(|e| e.size).sum()
    }

    pub fn paths(&self) -> impl Iterator<Item = &PathBuf> {
        self.entries.iter().map(|e| &e.path)
    }
}
