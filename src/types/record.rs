//! FileRecord - One file's state within one tree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which side of the sync a record was scanned from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeSide {
    Source,
    Destination,
}

impl TreeSide {
    pub fn as_str(self) -> &'static str {
        match self {
            TreeSide::Source => "source",
            TreeSide::Destination => "destination",
        }
    }
}

impl fmt::Display for TreeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content digest state of a record
///
/// `Failed` is deliberately distinct from `Pending`: a file whose bytes could
/// not be read has an unknown state and must never compare equal to anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "state", content = "blake3")]
pub enum ContentDigest {
    /// Not hashed (scan output, or size-only comparison)
    #[default]
    Pending,

    /// Blake3 digest of the full file content
    Computed([u8; 32]),

    /// Hashing was attempted and failed
    Failed,
}

impl ContentDigest {
    pub fn as_bytes(&self) -> Option<&[u8; 32]> {
        match self {
            ContentDigest::Computed(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ContentDigest::Failed)
    }
}

/// Represents a file within one scanned tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    /// Path relative to the tree root, no leading separator
    pub path: PathBuf,

    /// File size in bytes
    pub size: u64,

    /// Unix permission bits
    pub permissions: u32,

    /// Content digest (attached by the hash pool)
    pub digest: ContentDigest,

    /// Owning tree
    pub side: TreeSide,
}

impl FileRecord {
    /// Create an unhashed record as produced by the scanner
    pub fn new(path: PathBuf, size: u64, permissions: u32, side: TreeSide) -> Self {
        Self {
            path,
            size,
            permissions,
            digest: ContentDigest::Pending,
            side,
        }
    }

    /// Attach a computed digest
    pub fn with_digest(mut self, digest: [u8; 32]) -> Self {
        self.digest = ContentDigest::Computed(digest);
        self
    }

    /// Mark the record as unhashed after a read failure
    pub fn mark_unhashed(mut self) -> Self {
        self.digest = ContentDigest::Failed;
        self
    }

    /// Check if this record has a computed digest
    pub fn has_digest(&self) -> bool {
        matches!(self.digest, ContentDigest::Computed(_))
    }

    /// Lowercase hex of the digest, if computed
    pub fn digest_hex(&self) -> Option<String> {
        self.digest
            .as_bytes()
            .map(|bytes| blake3::Hash::from(*bytes).to_hex().to_string())
    }
}
