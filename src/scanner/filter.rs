//! Exclude patterns matched against relative paths

use crate::types::SyncError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Compiled `--exclude` globs
#[derive(Debug, Clone)]
pub struct ExcludeFilter {
    set: GlobSet,
}

impl ExcludeFilter {
    pub fn new(patterns: &[String]) -> Result<Self, SyncError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                SyncError::Config(format!("Invalid exclude pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
            // A bare directory glob also excludes everything beneath it.
            if !pattern.ends_with("/**") {
                if let Ok(nested) = Glob::new(&format!("{}/**", pattern.trim_end_matches('/'))) {
                    builder.add(nested);
                }
            }
        }
        let set = builder
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build exclude patterns: {}", e)))?;
        Ok(Self { set })
    }

    pub fn none() -> Self {
        Self { set: GlobSet::empty() }
    }

    pub fn is_excluded(&self, relative_path: &Path) -> bool {
        self.set.is_match(relative_path)
    }
}
