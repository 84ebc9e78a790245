//! One-time snapshot of a target's original config file, and restores.
//!
//! State lives on disk only: a target is backed up exactly when the
//! `<file>.antigravity.bak` artifact exists.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::model::TargetKind;
use crate::persist::{read_optional, write_atomic};

pub const BACKUP_SUFFIX: &str = ".antigravity.bak";
/// Suffix for raw content that could not be parsed before it was overwritten.
pub const UNPARSED_SUFFIX: &str = ".antigravity.unparsed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupState {
    NoBackup,
    BackedUp,
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

#[derive(Debug, Clone)]
pub struct BackupFile {
    kind: TargetKind,
    live: PathBuf,
    backup: PathBuf,
}

impl BackupFile {
    pub fn new(kind: TargetKind, live: impl Into<PathBuf>) -> Self {
        let live = live.into();
        let backup = with_suffix(&live, BACKUP_SUFFIX);
        Self { kind, live, backup }
    }

    pub fn backup_path(&self) -> &Path {
        &self.backup
    }

    pub fn state(&self) -> BackupState {
        if self.backup.is_file() {
            BackupState::BackedUp
        } else {
            BackupState::NoBackup
        }
    }

    /// Snapshot the live file unless a backup already exists. A missing live
    /// file is snapshotted as `default_content`. Returns whether a snapshot
    /// was taken.
    pub fn ensure(&self, default_content: &str) -> Result<bool> {
        if self.state() == BackupState::BackedUp {
            return Ok(false);
        }
        let original = read_optional(&self.live)?;
        let content = original.as_deref().unwrap_or(default_content);
        write_atomic(&self.backup, content)?;
        tracing::info!(
            "created backup {} (original {})",
            self.backup.display(),
            if original.is_some() { "present" } else { "absent" }
        );
        Ok(true)
    }

    /// Overwrite the live file with the snapshot. The backup is kept, so this
    /// can be repeated.
    pub fn restore_from_backup(&self) -> Result<()> {
        let snapshot = read_optional(&self.backup)?.ok_or(SyncError::NoBackup(self.kind))?;
        write_atomic(&self.live, &snapshot)?;
        tracing::info!("restored {} from {}", self.live.display(), self.backup.display());
        Ok(())
    }

    /// Overwrite the live file with the target's skeleton.
    pub fn restore_to_default(&self, default_content: &str) -> Result<()> {
        write_atomic(&self.live, default_content)?;
        tracing::info!("reset {} to default", self.live.display());
        Ok(())
    }

    /// Keep raw content that failed to parse next to the live file.
    pub fn preserve_unparsed(&self, raw: &str) -> Result<PathBuf> {
        let path = with_suffix(&self.live, UNPARSED_SUFFIX);
        write_atomic(&path, raw)?;
        tracing::warn!("kept unparseable content in {}", path.display());
        Ok(path)
    }
}
