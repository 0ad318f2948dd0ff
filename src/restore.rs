//! Restoring archives.
//!
//! The archive is extracted into a temporary working directory first. The
//! embedded profile is saved unless a profile of that name already exists,
//! then every file is moved back to the absolute path it was taken from,
//! subject to an [`OverwritePolicy`]. Replacing an existing file is atomic:
//! the new content is written next to the destination and renamed over it.

use crate::cancel::CancelToken;
use crate::codec;
use crate::constants::{MANIFEST_NAME, RESTORE_TEMP_PREFIX};
use crate::profile::{Profile, ProfileStore};
use crate::prompt::{self, Prompt};
use crate::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use zip::ZipArchive;
use zip::result::ZipError;

/// What to do when a file being restored already exists.
#[derive(ValueEnum, Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Always replace the existing file.
    Always,
    /// Never replace an existing file.
    Never,
    /// Skip identical files and ask before replacing any other.
    #[default]
    Ask,
}

/// Outcome for one restored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStatus {
    New,
    Overwritten,
    Identical,
    Skipped,
    Declined,
    Failed,
}

impl fmt::Display for RestoreStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestoreStatus::New => "new",
            RestoreStatus::Overwritten => "overwritten",
            RestoreStatus::Identical => "identical",
            RestoreStatus::Skipped => "skipped",
            RestoreStatus::Declined => "declined",
            RestoreStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Per-status counts of one restore.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Name of the profile found in the archive.
    pub profile: String,
    /// Whether the profile was saved to the store.
    pub profile_saved: bool,
    pub new: u64,
    pub overwritten: u64,
    pub identical: u64,
    pub skipped: u64,
    pub declined: u64,
    pub failed: u64,
}

impl RestoreReport {
    fn record(&mut self, status: RestoreStatus) {
        let counter = match status {
            RestoreStatus::New => &mut self.new,
            RestoreStatus::Overwritten => &mut self.overwritten,
            RestoreStatus::Identical => &mut self.identical,
            RestoreStatus::Skipped => &mut self.skipped,
            RestoreStatus::Declined => &mut self.declined,
            RestoreStatus::Failed => &mut self.failed,
        };
        *counter += 1;
    }

    /// Number of files written to disk.
    pub fn restored(&self) -> u64 {
        self.new + self.overwritten
    }
}

impl fmt::Display for RestoreReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Restored {} file(s) (new: {}, overwritten: {}), identical: {}, skipped: {}, declined: {}, failed: {}",
            self.restored(),
            self.new,
            self.overwritten,
            self.identical,
            self.skipped,
            self.declined,
            self.failed
        )
    }
}

/// Restores archives into their original locations.
pub struct Restorer<'a> {
    store: &'a ProfileStore,
    policy: OverwritePolicy,
    cancel: CancelToken,
    temp_root: Option<PathBuf>,
}

impl<'a> Restorer<'a> {
    pub fn new(store: &'a ProfileStore, policy: OverwritePolicy) -> Self {
        Self {
            store,
            policy,
            cancel: CancelToken::new(),
            temp_root: None,
        }
    }

    /// Uses `cancel` to stop between entries and prompts.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Creates the working directory inside `dir` instead of the system temp directory.
    pub fn with_temp_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    /// Restores every file in `archive`.
    ///
    /// Failures on individual files are logged, counted as
    /// [`RestoreStatus::Failed`] and do not stop the remaining entries.
    /// An unreadable archive, a missing or invalid manifest, a profile store
    /// failure other than an existing profile, and cancellation abort the
    /// restore. The working directory is removed in every case.
    pub fn restore(&self, archive: &Path, prompt: &mut dyn Prompt) -> Result<RestoreReport> {
        let file = match File::open(archive) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ArchiveNotFound(archive.to_path_buf()));
            }
            Err(e) => return Err(Error::io_at(archive, e)),
        };
        let mut zip = ZipArchive::new(BufReader::new(file))?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(RESTORE_TEMP_PREFIX);
        let workdir = match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }?;
        let _scratch = self.cancel.register_scratch(workdir.path());
        debug!("Extracting {} to {}", archive.display(), workdir.path().display());
        zip.extract(workdir.path())?;

        let profile = read_manifest(&mut zip, archive)?;
        let mut report = RestoreReport {
            profile: profile.name().to_string(),
            ..Default::default()
        };
        match self.store.save(&profile) {
            Ok(path) => {
                info!("Restored profile {} to {}", profile.name(), path.display());
                report.profile_saved = true;
            }
            Err(Error::ProfileExists(name)) => {
                warn!("Profile {name} already exists, skipping its recovery");
            }
            Err(e) => return Err(e),
        }

        let entries = (0..zip.len())
            .map(|i| zip.by_index(i).map(|f| (f.name().to_string(), f.is_dir())))
            .collect::<std::result::Result<Vec<_>, ZipError>>()?;

        for (name, is_dir) in entries {
            if is_dir || name == MANIFEST_NAME {
                continue;
            }
            self.cancel.check()?;
            let status = match self.restore_entry(workdir.path(), &name, prompt) {
                Ok((dest, status)) => {
                    info!("Restoring: {} ({status})", dest.display());
                    status
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    error!("Failed to restore {name}: {e}");
                    RestoreStatus::Failed
                }
            };
            report.record(status);
        }

        if let Err(e) = workdir.close() {
            warn!("Couldn't remove the restore working directory: {e}");
        }
        info!("Restore complete");
        Ok(report)
    }

    fn restore_entry(
        &self,
        workdir: &Path,
        name: &str,
        prompt: &mut dyn Prompt,
    ) -> Result<(PathBuf, RestoreStatus)> {
        let dest = codec::to_absolute_path(name)?;
        let extracted = workdir.join(name);

        let exists = dest
            .try_exists()
            .map_err(|e| Error::io_at(&dest, e))?;
        if !exists {
            replace(&extracted, &dest)?;
            return Ok((dest, RestoreStatus::New));
        }

        let status = match self.policy {
            OverwritePolicy::Never => RestoreStatus::Skipped,
            OverwritePolicy::Always => {
                replace(&extracted, &dest)?;
                RestoreStatus::Overwritten
            }
            OverwritePolicy::Ask => {
                if file_sha256(&extracted)? == file_sha256(&dest)? {
                    RestoreStatus::Identical
                } else {
                    let question = format!("File {} already exists. Overwrite?", dest.display());
                    if prompt::confirm(prompt, &self.cancel, &question)? {
                        replace(&extracted, &dest)?;
                        RestoreStatus::Overwritten
                    } else {
                        RestoreStatus::Declined
                    }
                }
            }
        };
        Ok((dest, status))
    }
}

fn read_manifest<R: io::Read + io::Seek>(zip: &mut ZipArchive<R>, archive: &Path) -> Result<Profile> {
    let invalid = |reason: String| Error::InvalidArchive {
        path: archive.to_path_buf(),
        reason,
    };
    let mut entry = match zip.by_name(MANIFEST_NAME) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(invalid(format!("missing {MANIFEST_NAME}")));
        }
        Err(e) => return Err(e.into()),
    };
    let mut json = String::new();
    entry
        .read_to_string(&mut json)
        .map_err(|e| invalid(format!("unreadable {MANIFEST_NAME}: {e}")))?;
    Profile::from_json(&json)
}

/// Atomically replaces `dest` with a copy of `src`, creating parent directories.
fn replace(src: &Path, dest: &Path) -> Result<()> {
    let parent = dest
        .parent()
        .ok_or_else(|| Error::invalid_path(dest.to_string_lossy(), "has no parent directory"))?;
    fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| Error::io_at(parent, e))?;
    let mut reader = File::open(src).map_err(|e| Error::io_at(src, e))?;
    io::copy(&mut reader, tmp.as_file_mut()).map_err(|e| Error::io_at(tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| Error::io_at(tmp.path(), e))?;
    tmp.persist(dest).map_err(|e| Error::io_at(dest, e.error))?;
    Ok(())
}

/// Returns the hex-encoded SHA-256 digest of a file's content.
pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|e| Error::io_at(path, e))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(|e| Error::io_at(path, e))?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive;
    use crate::prompt::{LinePrompt, ScriptedPrompt};
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    struct Fixture {
        dir: TempDir,
        files: Vec<PathBuf>,
        archive: PathBuf,
        store: ProfileStore,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let src = dir.path().join("src");
            fs::create_dir_all(src.join("nested")).unwrap();
            let a = src.join("a.txt");
            let b = src.join("nested").join("b.bin");
            fs::write(&a, b"alpha").unwrap();
            fs::write(&b, [0u8, 1, 2, 3, 255]).unwrap();

            let profile = Profile::new("fixture", dir.path().join("backups"))
                .unwrap()
                .with_sources([src.to_string_lossy()]);
            let files = vec![a, b];
            let archive = archive::write(&files, &profile, &CancelToken::new())
                .unwrap()
                .path;
            let store = ProfileStore::open(dir.path().join("profiles"));
            Self {
                dir,
                files,
                archive,
                store,
            }
        }

        fn temp_root(&self) -> PathBuf {
            let root = self.dir.path().join("work");
            fs::create_dir_all(&root).unwrap();
            root
        }

        fn restore(&self, policy: OverwritePolicy, prompt: &mut dyn Prompt) -> Result<RestoreReport> {
            Restorer::new(&self.store, policy)
                .with_temp_root(self.temp_root())
                .restore(&self.archive, prompt)
        }

        fn work_is_empty(&self) -> bool {
            fs::read_dir(self.temp_root()).unwrap().next().is_none()
        }
    }

    #[test]
    fn test_restore_missing_files_as_new() {
        let fx = Fixture::new();
        fs::remove_dir_all(fx.dir.path().join("src")).unwrap();

        let report = fx.restore(OverwritePolicy::Never, &mut ScriptedPrompt::default()).unwrap();

        assert_eq!(report.new, 2);
        assert_eq!(report.restored(), 2);
        assert_eq!(fs::read(&fx.files[0]).unwrap(), b"alpha");
        assert_eq!(fs::read(&fx.files[1]).unwrap(), [0u8, 1, 2, 3, 255]);
        assert!(fx.work_is_empty());
    }

    #[test]
    fn test_always_reproduces_original_bytes() {
        let fx = Fixture::new();
        fs::write(&fx.files[0], b"changed").unwrap();

        let report = fx.restore(OverwritePolicy::Always, &mut ScriptedPrompt::default()).unwrap();

        assert_eq!(report.overwritten, 2);
        assert_eq!(fs::read(&fx.files[0]).unwrap(), b"alpha");
        assert_eq!(fs::read(&fx.files[1]).unwrap(), [0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn test_never_keeps_existing_files() {
        let fx = Fixture::new();
        fs::write(&fx.files[0], b"changed").unwrap();

        let report = fx.restore(OverwritePolicy::Never, &mut ScriptedPrompt::default()).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(report.restored(), 0);
        assert_eq!(fs::read(&fx.files[0]).unwrap(), b"changed");
    }

    #[test]
    fn test_ask_never_prompts_for_identical_files() {
        let fx = Fixture::new();
        let mut prompt = ScriptedPrompt::default();

        let report = fx.restore(OverwritePolicy::Ask, &mut prompt).unwrap();

        assert_eq!(report.identical, 2);
        assert!(prompt.questions.is_empty());
    }

    #[test]
    fn test_ask_prompts_for_changed_files() {
        let fx = Fixture::new();
        fs::write(&fx.files[0], b"changed").unwrap();
        fs::write(&fx.files[1], b"changed too").unwrap();
        let mut prompt = ScriptedPrompt::new(["n", "y"]);

        let report = fx.restore(OverwritePolicy::Ask, &mut prompt).unwrap();

        assert_eq!(prompt.questions.len(), 2);
        assert_eq!(report.declined, 1);
        assert_eq!(report.overwritten, 1);
        assert_eq!(fs::read(&fx.files[0]).unwrap(), b"changed");
        assert_eq!(fs::read(&fx.files[1]).unwrap(), [0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn test_profile_is_saved_once() {
        let fx = Fixture::new();

        let first = fx.restore(OverwritePolicy::Never, &mut ScriptedPrompt::default()).unwrap();
        assert!(first.profile_saved);
        assert_eq!(first.profile, "fixture");
        assert_eq!(fx.store.load("fixture").unwrap().name(), "fixture");

        let second = fx.restore(OverwritePolicy::Never, &mut ScriptedPrompt::default()).unwrap();
        assert!(!second.profile_saved);
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn test_failed_entry_does_not_stop_others() {
        let fx = Fixture::new();
        fs::remove_file(&fx.files[0]).unwrap();
        fs::create_dir_all(&fx.files[0]).unwrap();
        fs::remove_file(&fx.files[1]).unwrap();

        let report = fx.restore(OverwritePolicy::Always, &mut ScriptedPrompt::default()).unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.new, 1);
        assert_eq!(fs::read(&fx.files[1]).unwrap(), [0u8, 1, 2, 3, 255]);
    }

    #[test]
    fn test_cancel_removes_working_directory() {
        let fx = Fixture::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Restorer::new(&fx.store, OverwritePolicy::Always)
            .with_cancel(cancel)
            .with_temp_root(fx.temp_root())
            .restore(&fx.archive, &mut ScriptedPrompt::default());

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(fx.work_is_empty());
    }

    #[test]
    fn test_cancel_during_question_removes_working_directory() {
        let fx = Fixture::new();
        fs::write(&fx.files[0], b"changed").unwrap();
        let (reader, _writer) = io::pipe().unwrap();
        let cancel = CancelToken::new();
        let mut prompt = LinePrompt::new(BufReader::new(reader), io::sink(), cancel.clone());
        let canceller = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                std::thread::sleep(std::time::Duration::from_millis(200));
                cancel.cancel();
            })
        };

        let result = Restorer::new(&fx.store, OverwritePolicy::Ask)
            .with_cancel(cancel)
            .with_temp_root(fx.temp_root())
            .restore(&fx.archive, &mut prompt);

        canceller.join().unwrap();
        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(fx.work_is_empty());
        assert_eq!(fs::read(&fx.files[0]).unwrap(), b"changed");
    }

    #[test]
    fn test_forced_exit_cleanup_covers_working_directory() {
        let fx = Fixture::new();
        fs::write(&fx.files[0], b"changed").unwrap();
        let cancel = CancelToken::new();
        let mut prompt = CleanupPrompt {
            cancel: cancel.clone(),
            work: fx.temp_root(),
        };

        let result = Restorer::new(&fx.store, OverwritePolicy::Ask)
            .with_cancel(cancel)
            .with_temp_root(fx.temp_root())
            .restore(&fx.archive, &mut prompt);

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(fx.work_is_empty());
    }

    /// Runs the forced-exit cleanup while a question is pending, then ends input.
    struct CleanupPrompt {
        cancel: CancelToken,
        work: PathBuf,
    }

    impl Prompt for CleanupPrompt {
        fn ask(&mut self, _question: &str) -> Result<Option<String>> {
            assert!(fs::read_dir(&self.work).unwrap().next().is_some());
            self.cancel.remove_scratch();
            assert!(fs::read_dir(&self.work).unwrap().next().is_none());
            Ok(None)
        }
    }

    #[test]
    fn test_missing_manifest_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.zip");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        zip.start_file("tmp/x", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"x").unwrap();
        zip.finish().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles"));

        let result = Restorer::new(&store, OverwritePolicy::Never)
            .restore(&path, &mut ScriptedPrompt::default());

        assert!(matches!(result, Err(Error::InvalidArchive { .. })));
    }

    #[test]
    fn test_missing_archive() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles"));

        let result = Restorer::new(&store, OverwritePolicy::Never)
            .restore(&dir.path().join("nope.zip"), &mut ScriptedPrompt::default());

        assert!(matches!(result, Err(Error::ArchiveNotFound(_))));
    }

    #[test]
    fn test_file_sha256() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(
            file_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(
            OverwritePolicy::from_str("ask", true).unwrap(),
            OverwritePolicy::Ask
        );
        assert_eq!(RestoreStatus::Overwritten.to_string(), "overwritten");
    }
}
