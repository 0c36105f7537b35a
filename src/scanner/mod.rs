//! Directory scanning logic

mod filter;
mod walker;

pub use filter::ExcludeFilter;
pub use walker::{open_root, scan_tree, spawn_scanner, ScanStats};
