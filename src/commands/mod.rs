//! Command implementations

pub mod report;
pub mod sync;

pub use report::{RunSummary, TreeReport};
