//! Backup runs: select the files of a profile and archive them.

use crate::archive::{self, Archive};
use crate::cancel::CancelToken;
use crate::profile::Profile;
use crate::select::select;
use crate::stats::BackupStats;
use crate::{Error, Result};
use tracing::error;

/// The result of one backup run.
///
/// The statistics are returned whatever the outcome so the caller can always
/// print a summary.
#[derive(Debug)]
pub struct BackupRun {
    pub stats: BackupStats,
    pub outcome: Result<Archive>,
}

/// Backs up `profile`.
///
/// Fails with [`Error::NoFilesSelected`] without writing anything when the
/// selection is empty.
pub fn run(profile: &Profile, cancel: &CancelToken) -> BackupRun {
    let selection = match select(profile) {
        Ok(selection) => selection,
        Err(e) => {
            return BackupRun {
                stats: BackupStats::default().with_error(),
                outcome: Err(e),
            };
        }
    };
    let stats = selection.stats;

    if selection.files.is_empty() {
        error!("No files to backup");
        return BackupRun {
            stats: stats.with_error(),
            outcome: Err(Error::NoFilesSelected),
        };
    }

    match archive::write(&selection.files, profile, cancel) {
        Ok(archive) => BackupRun {
            stats: stats.with_dest_bytes(archive.size),
            outcome: Ok(archive),
        },
        Err(e) => BackupRun {
            stats: stats.with_error(),
            outcome: Err(e),
        },
    }
}
