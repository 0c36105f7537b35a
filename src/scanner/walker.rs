//! Tree walker feeding the hash job queue

use super::ExcludeFilter;
use crate::pipeline::RunContext;
use crate::types::{ErrorRecord, ErrorStage, FileRecord, SyncError, TreeSide};
use std::fs::{self, Metadata};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Counters for one tree walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Records emitted onto the job queue
    pub files: usize,
    /// Directories traversed (root excluded)
    pub dirs: usize,
    /// Sum of emitted record sizes
    pub bytes: u64,
    /// Entries skipped because of a traversal error
    pub skipped: usize,
    /// Walk stopped before enumerating the whole tree
    pub interrupted: bool,
}

/// Check that a sync root exists, is a directory, and can be listed
///
/// This is the only fatal check in the scan stage; it runs before any
/// pipeline task is spawned.
pub fn open_root(root: &Path) -> Result<(), SyncError> {
    let resolution = |source| SyncError::RootResolution {
        path: root.to_path_buf(),
        source,
    };

    let metadata = fs::metadata(root).map_err(resolution)?;
    if !metadata.is_dir() {
        return Err(resolution(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "not a directory",
        )));
    }
    fs::read_dir(root).map_err(resolution)?;
    Ok(())
}

/// Run [`scan_tree`] on the blocking pool, pushing each record onto `jobs`
///
/// `jobs` is dropped when the walk ends, which closes the job queue.
pub fn spawn_scanner(
    root: PathBuf,
    side: TreeSide,
    filter: ExcludeFilter,
    jobs: mpsc::Sender<FileRecord>,
    ctx: RunContext,
) -> JoinHandle<ScanStats> {
    tokio::task::spawn_blocking(move || {
        // blocking_send parks this thread while the job queue is full.
        let stats = scan_tree(&root, side, &filter, &ctx, |record| {
            jobs.blocking_send(record).is_ok()
        });
        tracing::debug!(
            tree = side.as_str(),
            files = stats.files,
            dirs = stats.dirs,
            skipped = stats.skipped,
            "scan finished"
        );
        stats
    })
}

/// Walk `root` and hand every regular file (or symlink) to `emit`
///
/// Directories are traversed but not emitted. Symlinks are not followed
/// during traversal; they are emitted as leaf entries described by their
/// target's metadata. Per-entry failures go to the run's error sink and the
/// walk continues. The walk stops early when the run is cancelled or when
/// `emit` returns `false`.
pub fn scan_tree<F>(
    root: &Path,
    side: TreeSide,
    filter: &ExcludeFilter,
    ctx: &RunContext,
    mut emit: F,
) -> ScanStats
where
    F: FnMut(FileRecord) -> bool,
{
    let mut stats = ScanStats::default();

    let prune_root = root.to_path_buf();
    let prune_filter = filter.clone();
    let walker = ignore::WalkBuilder::new(root)
        .standard_filters(false)
        .hidden(false)
        .follow_links(false)
        .filter_entry(move |entry| match entry.path().strip_prefix(&prune_root) {
            Ok(relative) => !prune_filter.is_excluded(relative),
            Err(_) => true,
        })
        .build();

    for result in walker {
        if ctx.cancel.is_cancelled() {
            stats.interrupted = true;
            break;
        }

        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                let path = walk_error_path(&e)
                    .map(|p| relative_or_absolute(root, &p))
                    .unwrap_or_else(|| root.to_path_buf());
                ctx.errors
                    .record(ErrorRecord::new(path, side, ErrorStage::Traversal, e));
                stats.skipped += 1;
                continue;
            }
        };

        if entry.depth() == 0 {
            continue;
        }

        let file_type = match entry.file_type() {
            Some(ft) => ft,
            None => continue,
        };

        if file_type.is_dir() {
            stats.dirs += 1;
            continue;
        }

        let relative_path = match entry.path().strip_prefix(root) {
            Ok(p) => p.to_path_buf(),
            Err(_) => {
                ctx.errors.record(ErrorRecord::new(
                    entry.path(),
                    side,
                    ErrorStage::Traversal,
                    "entry is outside the scanned root",
                ));
                stats.skipped += 1;
                continue;
            }
        };

        let metadata = if file_type.is_symlink() {
            fs::metadata(entry.path()).map_err(|e| format!("broken symlink: {}", e))
        } else if file_type.is_file() {
            entry
                .metadata()
                .map_err(|e| format!("cannot read file info: {}", e))
        } else {
            // sockets, fifos and devices are not synchronized
            continue;
        };

        let metadata = match metadata {
            Ok(m) => m,
            Err(cause) => {
                ctx.errors
                    .record(ErrorRecord::new(&relative_path, side, ErrorStage::Traversal, cause));
                stats.skipped += 1;
                continue;
            }
        };

        let record = FileRecord::new(relative_path, metadata.len(), permission_bits(&metadata), side);
        tracing::debug!(
            tree = side.as_str(),
            path = %record.path.display(),
            size = record.size,
            mode = %format!("{:o}", record.permissions),
            "file found"
        );

        stats.files += 1;
        stats.bytes += record.size;
        if !emit(record) {
            stats.interrupted = true;
            break;
        }
    }

    stats
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}

fn walk_error_path(error: &ignore::Error) -> Option<PathBuf> {
    match error {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::Loop { child, .. } => Some(child.clone()),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => {
            walk_error_path(err)
        }
        _ => None,
    }
}

fn relative_or_absolute(root: &Path, path: &Path) -> PathBuf {
    path.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
