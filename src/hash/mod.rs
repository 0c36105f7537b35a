//! Content hashing

mod pool;

pub use pool::{HashStats, HashWorkerPool};

use crate::types::SyncError;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer used while hashing; memory per worker stays fixed
pub const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Compute Blake3 hash of a file
///
/// The file is streamed through a fixed 64KB buffer, so memory use does not
/// depend on file size.
///
/// # Example
/// ```no_run
/// use treesync::hash::compute_hash;
/// use std::path::Path;
///
/// let hash = compute_hash(Path::new("file.txt"))?;
/// # Ok::<(), treesync::types::SyncError>(())
/// ```
pub fn compute_hash(file_path: &Path) -> Result<[u8; 32], SyncError> {
    let mut file = File::open(file_path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(SyncError::Io(e)),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(*hasher.finalize().as_bytes())
}
