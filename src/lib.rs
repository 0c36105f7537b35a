//! # treesync - Concurrent one-way directory synchronization
//!
//! Two trees are scanned and hashed concurrently, compared by content digest
//! (or size), and only new or changed source files are copied into the
//! destination by a pool of copy workers.

// Module declarations
pub mod config;
pub mod scanner;
pub mod diff;
pub mod executor;
pub mod hash;
pub mod pipeline;
pub mod ui;
pub mod commands;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use types::{CopyReason, ErrorRecord, ErrorStage, FileRecord, Snapshot, SyncAction, SyncError};
pub use config::{CompareMode, Config};
pub use commands::RunSummary;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
