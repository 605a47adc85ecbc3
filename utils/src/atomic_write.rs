//! Atomic file write helpers.
//!
//! Writers stage bytes in a sibling temp file and rename it over the target, so
//! readers only ever observe the old contents or the new contents. On Windows,
//! rename-over-existing fails, so the target is parked at `.bak` for the
//! duration of the swap and restored if the swap fails.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct AtomicWriteOptions {
    /// File sync policy for the temp file before persisting.
    pub file_sync: FileSyncPolicy,
    /// Parent directory sync policy after the file has been persisted.
    pub parent_dir_sync: ParentDirSyncPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSyncPolicy {
    SyncAll,
    SkipSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentDirSyncPolicy {
    SyncBestEffort,
    SkipSync,
}

impl Default for AtomicWriteOptions {
    fn default() -> Self {
        Self {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SyncBestEffort,
        }
    }
}

/// Restore `path` from `path.bak` left behind by an interrupted swap.
///
/// Returns `true` when a backup was restored.
pub fn recover_bak_file(path: &Path) -> bool {
    let backup = path.with_extension("bak");
    if path.exists() || !backup.exists() {
        return false;
    }
    match fs::rename(&backup, path) {
        Ok(()) => {
            tracing::warn!(
                path = %path.display(),
                "Recovered .bak file from interrupted atomic write"
            );
            true
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), "Failed to recover .bak file: {e}");
            false
        }
    }
}

pub fn atomic_write(path: impl AsRef<Path>, bytes: &[u8]) -> io::Result<()> {
    atomic_write_with_options(path, bytes, AtomicWriteOptions::default())
}

fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

fn stage(parent: &Path, bytes: &[u8], options: AtomicWriteOptions) -> io::Result<NamedTempFile> {
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(bytes)?;
    if matches!(options.file_sync, FileSyncPolicy::SyncAll) {
        tmp.as_file().sync_all()?;
    }
    Ok(tmp)
}

fn best_effort_sync_parent_dir(parent: &Path) {
    #[cfg(unix)]
    {
        if let Err(e) = File::open(parent).and_then(|d| d.sync_all()) {
            debug!(path = %parent.display(), "Parent directory sync_all failed (best-effort): {e}");
        }
    }

    #[cfg(not(unix))]
    {
        let _ = parent;
    }
}

/// Replace `path` with `bytes`. A failure at any step leaves the previous
/// contents of `path` in place.
pub fn atomic_write_with_options(
    path: impl AsRef<Path>,
    bytes: &[u8],
    options: AtomicWriteOptions,
) -> io::Result<()> {
    let path = path.as_ref();
    let parent = parent_of(path);
    let tmp = stage(parent, bytes, options)?;

    if let Err(err) = tmp.persist(path) {
        if !path.exists() {
            return Err(err.error);
        }
        // Windows: rename refuses to overwrite, so park the old file first.
        let parked = path.with_extension("bak");
        let _ = fs::remove_file(&parked);
        fs::rename(path, &parked)?;

        if let Err(rename_err) = err.file.persist(path) {
            let _ = fs::rename(&parked, path);
            return Err(rename_err.error);
        }
        if let Err(e) = fs::remove_file(&parked) {
            tracing::warn!(
                path = %parked.display(),
                "Failed to remove .bak after atomic write: {e}"
            );
        }
    }

    if matches!(options.parent_dir_sync, ParentDirSyncPolicy::SyncBestEffort) {
        best_effort_sync_parent_dir(parent);
    }
    Ok(())
}

/// Copy `source` to `dest`, failing with `AlreadyExists` instead of
/// overwriting. `dest` is never observable half-written.
pub fn atomic_copy_new(source: &Path, dest: &Path) -> io::Result<u64> {
    let bytes = fs::read(source)?;
    let parent = parent_of(dest);
    let tmp = stage(
        parent,
        &bytes,
        AtomicWriteOptions {
            file_sync: FileSyncPolicy::SyncAll,
            parent_dir_sync: ParentDirSyncPolicy::SkipSync,
        },
    )?;
    tmp.persist_noclobber(dest).map_err(|err| err.error)?;
    Ok(bytes.len() as u64)
}
