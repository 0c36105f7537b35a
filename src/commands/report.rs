//! Run summary and its human-readable rendering

use crate::config::CompareMode;
use crate::executor::Manifest;
use crate::pipeline::TreeScan;
use crate::types::{ErrorRecord, ErrorStage};
use chrono::{DateTime, Utc};
use console::style;
use indicatif::HumanBytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Per-tree scan figures
#[derive(Debug, Clone, Serialize)]
pub struct TreeReport {
    pub root: PathBuf,
    pub files: usize,
    pub bytes: u64,
    /// Entries skipped because they could not be read during traversal
    pub skipped: usize,
    pub scan_ms: u64,
}

impl TreeReport {
    pub fn from_scan(scan: &TreeScan) -> Self {
        Self {
            root: scan.snapshot.root_path().to_path_buf(),
            files: scan.snapshot.len(),
            bytes: scan.snapshot.total_size(),
            skipped: scan.scan.skipped,
            scan_ms: scan.snapshot.scan_duration().as_millis() as u64,
        }
    }
}

/// Outcome of one sync run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub dry_run: bool,
    pub compare_mode: CompareMode,
    pub source: TreeReport,
    pub destination: TreeReport,
    /// Files the comparator scheduled for copy
    pub planned: usize,
    pub copied: usize,
    pub unchanged: usize,
    /// Distinct paths with at least one recorded error
    pub failed: usize,
    /// Planned copies skipped because the run was cancelled
    pub not_attempted: usize,
    pub bytes_copied: u64,
    /// Present only for dry runs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<Manifest>,
    pub errors: Vec<ErrorRecord>,
    /// The run was cut short by cancellation or its deadline
    pub cancelled: bool,
}

impl RunSummary {
    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Process exit status: 0 clean, 1 per-file failures or a partial run
    pub fn exit_code(&self) -> i32 {
        if self.has_failures() || self.cancelled {
            1
        } else {
            0
        }
    }
}

/// Render the summary block printed at the end of a run
pub fn format_summary(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "Scanned: {} source files ({}) in {} ms, {} destination files ({}) in {} ms",
        summary.source.files,
        HumanBytes(summary.source.bytes),
        summary.source.scan_ms,
        summary.destination.files,
        HumanBytes(summary.destination.bytes),
        summary.destination.scan_ms,
    ));

    if summary.dry_run {
        lines.push(format!(
            "{} {} file(s) would be copied, {} unchanged",
            style("Dry run:").yellow().bold(),
            summary.planned,
            summary.unchanged
        ));
    } else {
        lines.push(format!(
            "{} {} copied ({}), {} unchanged, {} failed",
            style("Sync:").green().bold(),
            summary.copied,
            HumanBytes(summary.bytes_copied),
            summary.unchanged,
            summary.failed
        ));
    }

    if summary.cancelled {
        lines.push(format!(
            "{} run cancelled before completion; {} planned copy(ies) not attempted",
            style("Partial:").red().bold(),
            summary.not_attempted
        ));
    }

    lines.push(format!("Elapsed: {} ms", summary.elapsed_ms));
    lines.join("\n")
}

/// List every file a dry run would copy
pub fn format_manifest(manifest: &Manifest) -> String {
    if manifest.is_empty() {
        return "Dry-run manifest:\n  (nothing to copy)".to_string();
    }

    let mut lines = Vec::with_capacity(manifest.len() + 2);
    lines.push("Dry-run manifest:".to_string());
    for entry in &manifest.entries {
        lines.push(format!(
            "  {:<7} {:>10}  {}",
            entry.reason.label(),
            entry.size,
            entry.path.display()
        ));
    }
    lines.push(format!(
        "  {} file(s), {} total",
        manifest.len(),
        HumanBytes(manifest.total_bytes())
    ));
    lines.join("\n")
}

/// Errors grouped by stage, first three of each group shown
pub fn format_error_summary(records: &[ErrorRecord]) -> String {
    let mut groups: BTreeMap<ErrorStage, Vec<&ErrorRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.stage).or_default().push(record);
    }

    let mut lines = Vec::new();
    lines.push("Error summary:".to_string());
    for (stage, items) in groups {
        lines.push(format!("  {} ({}):", stage_label(stage), items.len()));
        for record in items.iter().take(3) {
            lines.push(format!("    - {}", record.message));
            lines.push(format!(
                "      Path: {} ({})",
                record.path.display(),
                record.side
            ));
            lines.push(format!("      Try: {}", suggestion(stage)));
        }
        if items.len() > 3 {
            lines.push(format!("    - ... {} more", items.len() - 3));
        }
    }
    lines.join("\n")
}

fn stage_label(stage: ErrorStage) -> &'static str {
    match stage {
        ErrorStage::Traversal => "Could not read while scanning",
        ErrorStage::Hash => "Could not hash",
        ErrorStage::Copy => "Could not copy",
    }
}

fn suggestion(stage: ErrorStage) -> &'static str {
    match stage {
        ErrorStage::Traversal => "Check that the path still exists and is readable.",
        ErrorStage::Hash => "Check file permissions; the file will be copied again next run.",
        ErrorStage::Copy => "Check destination permissions and free space, then retry.",
    }
}
