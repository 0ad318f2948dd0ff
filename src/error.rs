//! Error types for crb.

use crate::sysexits;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by selection, archiving, restoring and the profile store.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error on '{}': {source}", .path.display())]
    IoPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid settings file '{}': {message}", .path.display())]
    Settings { path: PathBuf, message: String },

    #[error("Invalid profile name '{0}', it must match ^[A-Za-z0-9_-]+$")]
    InvalidProfileName(String),

    #[error("Unsupported profile version {found}, expected {expected}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("Profile \"{0}\" not found")]
    ProfileNotFound(String),

    #[error("Profile \"{0}\" already exists")]
    ProfileExists(String),

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("{failed} file(s) could not be restored")]
    RestoreIncomplete { failed: u64 },

    #[error("No files to backup")]
    NoFilesSelected,

    #[error("Archive '{}' not found", .0.display())]
    ArchiveNotFound(PathBuf),

    #[error("Archive '{}' already exists", .0.display())]
    ArchiveExists(PathBuf),

    #[error("Invalid archive '{}': {reason}", .path.display())]
    InvalidArchive { path: PathBuf, reason: String },

    #[error("Couldn't determine the configuration directory")]
    NoConfigDir,

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoPath {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// The process exit status reported for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Io(_)
            | Error::IoPath { .. }
            | Error::Zip(_)
            | Error::RestoreIncomplete { .. } => sysexits::EX_IOERR,
            Error::Json(_)
            | Error::InvalidProfileName(_)
            | Error::VersionMismatch { .. }
            | Error::InvalidPath { .. }
            | Error::InvalidArchive { .. } => sysexits::EX_DATAERR,
            Error::ProfileNotFound(_) | Error::ArchiveNotFound(_) | Error::NoFilesSelected => {
                sysexits::EX_NOINPUT
            }
            Error::ProfileExists(_) | Error::ArchiveExists(_) => sysexits::EX_CANTCREAT,
            Error::Settings { .. } => sysexits::EX_CONFIG,
            Error::NoConfigDir => sysexits::EX_UNAVAILABLE,
            Error::Cancelled => sysexits::EX_TEMPFAIL,
        }
    }
}
