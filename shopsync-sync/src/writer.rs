//! Atomic local writes.
//!
//! ## Write protocol
//!
//! 1. Compare with the bytes on disk (only for [`write_if_changed`]).
//! 2. Skip everything else in dry-run mode.
//! 3. Create parent directories.
//! 4. Write to `<path>.shopsync.tmp`.
//! 5. Rename to the final path (atomic on POSIX).

use std::path::{Path, PathBuf};

use crate::error::{io_err, SyncError};

/// Outcome of an individual file write or removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written.
    Written { path: PathBuf },
    /// File was skipped; the bytes on disk already match.
    Unchanged { path: PathBuf },
    /// Dry-run mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
    /// File was removed.
    Deleted { path: PathBuf },
    /// Dry-run mode: the file *would* have been removed.
    WouldDelete { path: PathBuf },
}

impl WriteResult {
    /// Whether anything changed (or would have, in dry-run mode).
    pub fn is_change(&self) -> bool {
        !matches!(self, WriteResult::Unchanged { .. })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.shopsync.tmp", path.display()))
}

/// Write `content` to `path` only when it differs from the file on disk.
pub fn write_if_changed(path: &Path, content: &[u8], dry_run: bool) -> Result<WriteResult, SyncError> {
    match std::fs::read(path) {
        Ok(existing) if existing == content => {
            tracing::debug!(path = %path.display(), "unchanged");
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }
    write_file(path, content, dry_run)
}

/// Atomically write `content` to `path`, replacing whatever is there.
pub fn write_file(path: &Path, content: &[u8], dry_run: bool) -> Result<WriteResult, SyncError> {
    write_with_tmp(path, content, dry_run, &tmp_path(path))
}

fn write_with_tmp(path: &Path, content: &[u8], dry_run: bool, tmp: &Path) -> Result<WriteResult, SyncError> {
    if dry_run {
        tracing::info!(path = %path.display(), "[dry-run] would write");
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::info!(path = %path.display(), "wrote");
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Remove `path`. A file that is already gone counts as removed.
pub fn remove_file(path: &Path, dry_run: bool) -> Result<WriteResult, SyncError> {
    if dry_run {
        tracing::info!(path = %path.display(), "[dry-run] would delete");
        return Ok(WriteResult::WouldDelete {
            path: path.to_path_buf(),
        });
    }
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(io_err(path, err)),
    }
    tracing::info!(path = %path.display(), "deleted");
    Ok(WriteResult::Deleted {
        path: path.to_path_buf(),
    })
}
