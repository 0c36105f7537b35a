//! Main sync command

use super::report::{RunSummary, TreeReport};
use crate::diff::generate_sync_plan;
use crate::executor::{execute_plan, CopyStats, ExecutionCallback, ExecutionEvent, Manifest};
use crate::pipeline::{snapshot_tree, ProgressCallback, RunContext, TreeScan};
use crate::scanner::{open_root, ExcludeFilter};
use crate::types::{SyncError, TreeSide};
use crate::ui::ProgressReporter;
use crate::Config;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Run the sync operation on a fresh multi-threaded runtime
pub fn run(config: Config) -> Result<RunSummary, SyncError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("treesync")
        .build()?;
    runtime.block_on(run_sync(&config))
}

/// Run one sync with a fresh run context
pub async fn run_sync(config: &Config) -> Result<RunSummary, SyncError> {
    run_sync_with(config, RunContext::new()).await
}

/// Run one sync, sharing `ctx` with the caller
///
/// Cancelling `ctx.cancel` from outside stops the run; the summary then
/// reports whatever was scanned and copied before the signal.
pub async fn run_sync_with(config: &Config, ctx: RunContext) -> Result<RunSummary, SyncError> {
    config.validate()?;
    open_root(&config.source)?;
    open_root(&config.destination)?;
    let filter = ExcludeFilter::new(&config.exclude_patterns)?;

    let started_at = Utc::now();
    let started = Instant::now();
    // Dropping the guard stops the timer, including on early error returns.
    let deadline = config.timeout.map(|timeout| ctx.cancel.cancel_after(timeout));

    tracing::info!(
        source = %config.source.display(),
        destination = %config.destination.display(),
        mode = %config.compare_mode,
        hash_workers = config.hash_workers,
        copy_workers = config.copy_workers,
        dry_run = config.dry_run,
        "sync started"
    );

    let reporter = Arc::new(ProgressReporter::new(config.show_progress));
    let (source, destination) = tokio::join!(
        scan_side(&config.source, TreeSide::Source, config, filter.clone(), &ctx, &reporter),
        scan_side(
            &config.destination,
            TreeSide::Destination,
            config,
            filter,
            &ctx,
            &reporter
        ),
    );
    let (source, destination) = (source?, destination?);

    let plan = if ctx.cancel.is_cancelled() {
        tracing::warn!("run cancelled during scanning; no copies will be made");
        None
    } else {
        Some(generate_sync_plan(
            &source.snapshot,
            &destination.snapshot,
            config.compare_mode,
        ))
    };

    let mut manifest = None;
    let mut copy_stats = CopyStats::default();
    if let Some(plan) = &plan {
        tracing::info!(
            new = plan.stats.new_count,
            changed = plan.stats.changed_count,
            unverified = plan.stats.unverified_count,
            unchanged = plan.stats.unchanged_count,
            "plan ready"
        );

        if config.dry_run {
            manifest = Some(Manifest::from_plan(plan));
        } else if !plan.is_empty() {
            reporter.start_transfer(plan.actions.len() as u64);
            copy_stats = execute_plan(plan, config, &ctx, Some(transfer_callback(&reporter))).await?;
        }
    }

    drop(deadline);
    reporter.clear();

    let cancelled = ctx.cancel.is_cancelled();
    let failed = ctx.errors.failed_paths();
    let errors = ctx.errors.drain();

    let summary = RunSummary {
        started_at,
        elapsed_ms: started.elapsed().as_millis() as u64,
        dry_run: config.dry_run,
        compare_mode: config.compare_mode,
        source: TreeReport::from_scan(&source),
        destination: TreeReport::from_scan(&destination),
        planned: plan.as_ref().map_or(0, |p| p.actions.len()),
        copied: copy_stats.copied,
        unchanged: plan.as_ref().map_or(0, |p| p.stats.unchanged_count),
        failed,
        not_attempted: copy_stats.not_attempted,
        bytes_copied: copy_stats.bytes_copied,
        manifest,
        errors,
        cancelled,
    };

    tracing::info!(
        copied = summary.copied,
        unchanged = summary.unchanged,
        failed = summary.failed,
        cancelled,
        elapsed_ms = summary.elapsed_ms,
        "sync finished"
    );
    Ok(summary)
}

async fn scan_side(
    root: &Path,
    side: TreeSide,
    config: &Config,
    filter: ExcludeFilter,
    ctx: &RunContext,
    reporter: &Arc<ProgressReporter>,
) -> Result<TreeScan, SyncError> {
    reporter.start_scan(side);
    let on_progress: ProgressCallback = {
        let reporter = Arc::clone(reporter);
        Arc::new(move |files: u64, bytes: u64| reporter.update_scan(side, files, bytes))
    };

    let scan = snapshot_tree(root, side, config, filter, ctx, Some(on_progress)).await?;
    reporter.finish_scan(side, scan.snapshot.len(), scan.snapshot.total_size());
    Ok(scan)
}

fn transfer_callback(reporter: &Arc<ProgressReporter>) -> ExecutionCallback {
    let reporter = Arc::clone(reporter);
    Arc::new(move |event: &ExecutionEvent| match event {
        ExecutionEvent::ActionStart { reason, path, .. } => {
            reporter.set_current_file(reason.label(), path);
        }
        ExecutionEvent::ActionSuccess { bytes_copied, .. } => {
            reporter.complete_transfer_file(*bytes_copied);
        }
        ExecutionEvent::ActionError {
            reason,
            path,
            message,
            ..
        } => {
            reporter.transfer_error(reason.label(), path, message);
        }
        ExecutionEvent::Complete { stats } => {
            reporter.finish_transfer(stats.copied, stats.failed, stats.bytes_copied);
        }
    })
}
