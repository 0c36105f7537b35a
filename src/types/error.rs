//! Error types for treesync

use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for treesync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error (logic checks)
    #[error("Validation error: {0}")]
    Validation(String),

    /// A sync root could not be opened; nothing was scanned
    #[error("Cannot open root {path}: {source}")]
    RootResolution {
        path: PathBuf,
        #[source]
        source: IoError,
    },

    /// Permission denied for specific path
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Destination filesystem ran out of space
    #[error("Disk full while writing {path}")]
    DiskFull { path: PathBuf },

    /// Transfer was interrupted
    #[error("Transfer interrupted: {path} at offset {offset} bytes")]
    TransferInterrupted { path: PathBuf, offset: u64 },

    /// A pipeline task panicked or was aborted
    #[error("Pipeline failure: {0}")]
    Pipeline(String),
}

impl SyncError {
    /// Errors that abort a run before any scanning happens
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SyncError::RootResolution { .. }
                | SyncError::Config(_)
                | SyncError::Validation(_)
                | SyncError::Pipeline(_)
        )
    }

    /// Check if this error is a validation error
    pub fn is_validation_error(&self) -> bool {
        matches!(self, SyncError::Validation(_) | SyncError::Config(_))
    }

    /// Check if this error is related to permissions
    pub fn is_permission_error(&self) -> bool {
        matches!(self, SyncError::PermissionDenied { .. })
    }

    /// Check if this error is related to disk space
    pub fn is_disk_space_error(&self) -> bool {
        matches!(self, SyncError::DiskFull { .. })
    }
}

/// Map a raw IO error on `path` onto the most specific variant.
///
/// `offset` is the number of bytes already transferred when the error hit;
/// short writes and unexpected EOF become `TransferInterrupted` at that offset.
pub fn classify_io_error(path: &Path, offset: u64, error: IoError) -> SyncError {
    match error.kind() {
        ErrorKind::PermissionDenied => SyncError::PermissionDenied {
            path: path.to_path_buf(),
        },
        ErrorKind::WriteZero | ErrorKind::UnexpectedEof | ErrorKind::Interrupted => {
            SyncError::TransferInterrupted {
                path: path.to_path_buf(),
                offset,
            }
        }
        _ if is_storage_full(&error) => SyncError::DiskFull {
            path: path.to_path_buf(),
        },
        _ => SyncError::Io(error),
    }
}

// ENOSPC (28) and EDQUOT (122 on Linux)
fn is_storage_full(error: &IoError) -> bool {
    matches!(error.raw_os_error(), Some(28 | 122))
}
