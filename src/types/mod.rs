//! Core type definitions for treesync

mod action;
mod error;
mod error_record;
mod record;
mod snapshot;

pub use action::{CopyReason, SyncAction};
pub use error::{classify_io_error, SyncError};
pub use error_record::{ErrorRecord, ErrorSink, ErrorStage};
pub use record::{ContentDigest, FileRecord, TreeSide};
pub use snapshot::{Snapshot, SnapshotBuilder};
