//! Zip archive writer.
//!
//! An archive holds every selected file under its codec-derived archive
//! path, compressed with Deflate, followed by the profile manifest.

use crate::cancel::CancelToken;
use crate::codec;
use crate::constants::{ARCHIVE_TIMESTAMP_FORMAT, MANIFEST_NAME};
use crate::path::expand_profile_path;
use crate::profile::Profile;
use crate::{Error, Result};
use chrono::{DateTime, Local};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Entries at least this large need zip64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// A finished archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub path: PathBuf,
    /// Size of the archive file in bytes.
    pub size: u64,
}

/// Returns the archive file name for a profile at a point in time.
pub fn archive_file_name(profile_name: &str, time: &DateTime<Local>) -> String {
    format!("{profile_name}-{}.zip", time.format(ARCHIVE_TIMESTAMP_FORMAT))
}

/// Writes `files` and the manifest of `profile` to a new archive in the
/// profile's destination directory, expanded like the sources.
///
/// The archive is created with create-new semantics, so an existing file of
/// the same name is left untouched and reported as [`Error::ArchiveExists`].
/// A partially written archive is removed when writing fails or `cancel` is set.
pub fn write(files: &[PathBuf], profile: &Profile, cancel: &CancelToken) -> Result<Archive> {
    let dest = &expand_profile_path(&profile.destination)?;
    fs::create_dir_all(dest).map_err(|e| Error::io_at(dest, e))?;
    let path = dest.join(archive_file_name(profile.name(), &Local::now()));
    write_to(&path, files, profile, cancel)?;
    let size = fs::metadata(&path).map_err(|e| Error::io_at(&path, e))?.len();
    info!("Wrote backup archive {}", path.display());
    Ok(Archive { path, size })
}

/// Writes an archive to `path`, which must not exist yet.
pub fn write_to(
    path: &Path,
    files: &[PathBuf],
    profile: &Profile,
    cancel: &CancelToken,
) -> Result<()> {
    let file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(Error::ArchiveExists(path.to_path_buf()));
        }
        Err(e) => return Err(Error::io_at(path, e)),
    };
    info!("Writing backup archive: {}", path.display());

    let _scratch = cancel.register_scratch(path);
    let result = write_entries(file, path, files, profile, cancel);
    if result.is_err() {
        if let Err(e) = fs::remove_file(path) {
            warn!("Couldn't remove incomplete archive {}: {e}", path.display());
        }
    }
    result
}

fn write_entries(
    file: File,
    path: &Path,
    files: &[PathBuf],
    profile: &Profile,
    cancel: &CancelToken,
) -> Result<()> {
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for file in files {
        cancel.check()?;
        let name = codec::to_archive_path(file)?;
        let mut src = File::open(file).map_err(|e| Error::io_at(file, e))?;
        let len = src.metadata().map_err(|e| Error::io_at(file, e))?.len();
        debug!("Adding {} as {name}", file.display());
        zip.start_file(name, options.large_file(len >= ZIP64_THRESHOLD))?;
        io::copy(&mut src, &mut zip).map_err(|e| Error::io_at(file, e))?;
    }

    zip.start_file(MANIFEST_NAME, options)?;
    zip.write_all(profile.to_json()?.as_bytes())?;

    let mut writer = zip.finish()?;
    writer.flush().map_err(|e| Error::io_at(path, e))?;
    Ok(())
}
