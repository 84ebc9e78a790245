//! Closed set of conditions surfaced by sync operations.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::model::TargetKind;

/// Error returned by every engine operation.
///
/// Each variant renders as a single line suitable for a user notification.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The target's config directory does not exist.
    #[error("{0} is not installed (config directory not found)")]
    NotInstalled(TargetKind),

    /// A caller-supplied entry list could not be read as the target's schema.
    #[error("invalid {target} entry: {message}")]
    Parse { target: TargetKind, message: String },

    #[error("reorder index out of range (from={from}, to={to}, len={len})")]
    OutOfRange { from: usize, to: usize, len: usize },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Sync requested without any managed entry to write.
    #[error("no models selected")]
    NoSelection,

    #[error("no backup found for {0}")]
    NoBackup(TargetKind),

    #[error("unknown entry {0}")]
    UnknownEntry(Uuid),

    #[error("unknown config file '{file}' for {target}")]
    UnknownFile { target: TargetKind, file: String },

    /// The blocking worker running the operation panicked or was cancelled.
    #[error("sync task failed: {0}")]
    Task(String),
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
