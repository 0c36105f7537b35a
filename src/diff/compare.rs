//! Per-file comparison

use crate::config::CompareMode;
use crate::types::{ContentDigest, CopyReason, FileRecord};

/// Decide whether `src` must be copied over the existing `dest`
///
/// Returns `None` when the files are considered identical.
///
/// - A record whose hashing failed on either side has unknown content and is
///   always copied ([`CopyReason::Unverified`]).
/// - [`CompareMode::Digest`]: sizes or digests differ → copy. Two records
///   without digests are never assumed equal.
/// - [`CompareMode::Size`]: sizes differ → copy. Same-size content edits are
///   not detected in this mode.
pub fn compare_records(src: &FileRecord, dest: &FileRecord, mode: CompareMode) -> Option<CopyReason> {
    if src.digest.is_failed() || dest.digest.is_failed() {
        return Some(CopyReason::Unverified);
    }

    if src.size != dest.size {
        return Some(CopyReason::Changed);
    }

    match mode {
        CompareMode::Size => None,
        CompareMode::Digest => match (&src.digest, &dest.digest) {
            (ContentDigest::Computed(a), ContentDigest::Computed(b)) if a == b => None,
            (ContentDigest::Computed(_), ContentDigest::Computed(_)) => Some(CopyReason::Changed),
            _ => Some(CopyReason::Unverified),
        },
    }
}
