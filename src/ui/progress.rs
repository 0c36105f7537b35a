//! Progress reporting

use crate::types::TreeSide;
use indicatif::{HumanBytes, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Progress reporter for sync operations
///
/// Both tree pipelines and every copy worker report concurrently, so all
/// methods take `&self`. A disabled reporter draws nothing.
pub struct ProgressReporter {
    source_bar: ProgressBar,
    destination_bar: ProgressBar,
    transfer_bar: ProgressBar,
    transfer_started_at: Mutex<Option<Instant>>,
    transferred_bytes: AtomicU64,
}

impl ProgressReporter {
    /// Create a new progress reporter; `enabled = false` hides every bar
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            MultiProgress::with_draw_target(ProgressDrawTarget::stderr())
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let source_bar = multi.add(scan_spinner(enabled));
        let destination_bar = multi.add(scan_spinner(enabled));

        let transfer_bar = multi.add(ProgressBar::new(0));
        if let Ok(style) =
            ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} files | {msg}")
        {
            transfer_bar.set_style(style.progress_chars("=>-"));
        }

        Self {
            source_bar,
            destination_bar,
            transfer_bar,
            transfer_started_at: Mutex::new(None),
            transferred_bytes: AtomicU64::new(0),
        }
    }

    /// A reporter that never draws
    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Mark start of a scanning phase.
    pub fn start_scan(&self, side: TreeSide) {
        self.scan_bar(side)
            .set_message(format!("Scanning {}...", side));
    }

    /// Update scanning progress counters.
    pub fn update_scan(&self, side: TreeSide, files: u64, bytes: u64) {
        self.scan_bar(side).set_message(format!(
            "Scanning {}... {} files | {}",
            side,
            files,
            HumanBytes(bytes)
        ));
    }

    /// Mark completion of a scanning phase.
    pub fn finish_scan(&self, side: TreeSide, files: usize, bytes: u64) {
        self.scan_bar(side).finish_with_message(format!(
            "Scanned {}: {} files | {}",
            side,
            files,
            HumanBytes(bytes)
        ));
    }

    /// Initialize transfer phase progress.
    pub fn start_transfer(&self, total_transfer_files: u64) {
        if let Ok(mut started) = self.transfer_started_at.lock() {
            *started = Some(Instant::now());
        }
        self.transferred_bytes.store(0, Ordering::Relaxed);
        self.transfer_bar.set_length(total_transfer_files);
        self.transfer_bar.set_position(0);
        self.transfer_bar
            .set_message("Starting transfer...".to_string());
    }

    /// Update current file indicator.
    pub fn set_current_file(&self, label: &str, path: &Path) {
        self.transfer_bar
            .set_message(format!("{} {}", label, path.display()));
    }

    /// Mark one transfer file complete and refresh throughput display.
    pub fn complete_transfer_file(&self, bytes: u64) {
        let total = self.transferred_bytes.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.transfer_bar.inc(1);

        self.transfer_bar.set_message(format!(
            "{} transferred | {}/s",
            HumanBytes(total),
            HumanBytes(self.current_throughput_bps())
        ));
    }

    /// Surface a failed copy; it still counts toward the bar position.
    pub fn transfer_error(&self, label: &str, path: &Path, err: &str) {
        self.transfer_bar.inc(1);
        self.transfer_bar
            .println(format!("ERROR {} {}: {}", label, path.display(), err));
    }

    /// Finalize transfer phase.
    pub fn finish_transfer(&self, succeeded: usize, failed: usize, bytes: u64) {
        self.transfer_bar.finish_with_message(format!(
            "Copies complete: {} succeeded, {} failed | {} total | {}/s",
            succeeded,
            failed,
            HumanBytes(bytes),
            HumanBytes(self.current_throughput_bps())
        ));
    }

    /// Remove every bar from the terminal before the summary is printed
    pub fn clear(&self) {
        self.source_bar.finish_and_clear();
        self.destination_bar.finish_and_clear();
        self.transfer_bar.finish_and_clear();
    }

    fn scan_bar(&self, side: TreeSide) -> &ProgressBar {
        match side {
            TreeSide::Source => &self.source_bar,
            TreeSide::Destination => &self.destination_bar,
        }
    }

    fn current_throughput_bps(&self) -> u64 {
        let started = self
            .transfer_started_at
            .lock()
            .ok()
            .and_then(|guard| *guard);
        match started {
            Some(started) => {
                let secs = started.elapsed().as_secs_f64();
                if secs > 0.0 {
                    (self.transferred_bytes.load(Ordering::Relaxed) as f64 / secs) as u64
                } else {
                    0
                }
            }
            None => 0,
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::hidden()
    }
}

fn scan_spinner(enabled: bool) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    if enabled {
        bar.enable_steady_tick(Duration::from_millis(120));
    }
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
    }
    bar
}
