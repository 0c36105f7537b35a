//! Atomic file copy implementation

use crate::types::{classify_io_error, SyncError};
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Copy buffer size; memory per copy worker stays fixed
pub const COPY_BUFFER_SIZE: usize = 128 * 1024;

/// Copy a file atomically using the write-then-rename strategy
///
/// 1. Create the destination's parent chain (see [`ensure_parent_dirs`])
/// 2. Stream from `src` into a hidden `.part` sibling of `dest`
/// 3. Flush and sync to disk
/// 4. Apply `permissions` and the source mtime
/// 5. Rename over `dest`
///
/// On failure the `.part` file is removed and `dest` is left untouched.
///
/// # Returns
/// * `Ok(u64)` - Number of bytes copied
/// * `Err(SyncError)` - classified IO failure
///
/// # Example
/// ```no_run
/// use treesync::executor::copy_file_atomic;
/// use std::path::Path;
///
/// let bytes = copy_file_atomic(Path::new("source.txt"), Path::new("dest.txt"), 0o644)?;
/// # Ok::<(), treesync::types::SyncError>(())
/// ```
pub fn copy_file_atomic(src: &Path, dest: &Path, permissions: u32) -> Result<u64, SyncError> {
    if let Some(parent) = dest.parent() {
        ensure_parent_dirs(parent, permissions)
            .map_err(|e| classify_io_error(parent, 0, e))?;
    }

    let mut src_file = File::open(src).map_err(|e| classify_io_error(src, 0, e))?;
    let part_path = part_path_for(dest);
    let part_file = File::create(&part_path).map_err(|e| classify_io_error(&part_path, 0, e))?;

    match write_part(&mut src_file, part_file, &part_path, src, permissions) {
        Ok(total_bytes) => {
            fs::rename(&part_path, dest).map_err(|e| {
                let _ = fs::remove_file(&part_path);
                classify_io_error(dest, total_bytes, e)
            })?;
            Ok(total_bytes)
        }
        Err(err) => {
            let _ = fs::remove_file(&part_path);
            Err(err)
        }
    }
}

fn write_part(
    src_file: &mut File,
    mut part_file: File,
    part_path: &Path,
    src: &Path,
    permissions: u32,
) -> Result<u64, SyncError> {
    let mut buffer = vec![0u8; COPY_BUFFER_SIZE];
    let mut total_bytes = 0u64;

    loop {
        let bytes_read = match src_file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(classify_io_error(src, total_bytes, e)),
        };

        part_file
            .write_all(&buffer[..bytes_read])
            .map_err(|e| classify_io_error(part_path, total_bytes, e))?;
        total_bytes += bytes_read as u64;
    }

    part_file
        .sync_all()
        .map_err(|e| classify_io_error(part_path, total_bytes, e))?;
    drop(part_file);

    set_mode(part_path, permissions).map_err(|e| classify_io_error(part_path, total_bytes, e))?;

    let mtime = fs::metadata(src)
        .and_then(|m| m.modified())
        .map_err(|e| classify_io_error(src, total_bytes, e))?;
    filetime::set_file_mtime(part_path, filetime::FileTime::from_system_time(mtime))
        .map_err(|e| classify_io_error(part_path, total_bytes, e))?;

    Ok(total_bytes)
}

/// Create `dir` and any missing ancestors
///
/// New directories take their mode from the file being copied, widened so the
/// owner can always traverse and write. Existing directories are left as they
/// are; an ancestor created concurrently by another worker counts as success.
pub fn ensure_parent_dirs(dir: &Path, file_permissions: u32) -> std::io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(dir_mode_for(file_permissions));
    }
    #[cfg(not(unix))]
    let _ = file_permissions;

    match builder.create(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Directory mode derived from a file mode: every read bit gains its execute
/// bit, and the owner always has rwx.
pub fn dir_mode_for(file_permissions: u32) -> u32 {
    let perms = file_permissions & 0o777;
    perms | ((perms & 0o444) >> 2) | 0o700
}

#[cfg(unix)]
fn set_mode(path: &Path, permissions: u32) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(permissions & 0o7777))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, permissions: u32) -> std::io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(permissions & 0o222 == 0);
    fs::set_permissions(path, perms)
}

fn part_path_for(dest: &Path) -> PathBuf {
    // Each distinct file name, UTF-8 or not, maps to a distinct temp name.
    let mut name = OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".treesync-part");
    dest.with_file_name(name)
}
