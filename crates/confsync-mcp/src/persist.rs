//! Filesystem boundary: optional reads and atomic replace-on-write.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{Result, SyncError};

/// Read a file as text; a missing file is `Ok(None)`.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(s) => Ok(Some(s)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SyncError::io(path, e)),
    }
}

/// Replace `path` with `content` via a temp file in the same directory, so
/// readers observe either the old or the new file, never a partial one.
///
/// Errors are returned as-is; the caller re-reads state before any retry.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| SyncError::io(&dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| SyncError::io(tmp.path(), e))?;
    tmp.flush().map_err(|e| SyncError::io(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| SyncError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| SyncError::io(path, e.error))?;
    tracing::debug!("wrote {} ({} bytes)", path.display(), content.len());
    Ok(())
}
