//! SyncAction - Files the comparator decided to copy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Why a source file was scheduled for copy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyReason {
    /// Missing at the destination
    New,

    /// Present at the destination but the comparison key differs
    Changed,

    /// One side could not be hashed, so its state is unknown
    Unverified,
}

impl CopyReason {
    pub fn label(self) -> &'static str {
        match self {
            CopyReason::New => "NEW",
            CopyReason::Changed => "UPDATE",
            CopyReason::Unverified => "FORCE",
        }
    }
}

/// One file to copy from source to destination
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncAction {
    /// Path relative to both roots
    pub path: PathBuf,

    /// Source size at scan time
    pub size: u64,

    /// Source permission bits to apply at the destination
    pub permissions: u32,

    pub reason: CopyReason,
}

impl SyncAction {
    pub fn new(path: PathBuf, size: u64, permissions: u32, reason: CopyReason) -> Self {
        Self {
            path,
            size,
            permissions,
            reason,
        }
    }
}
