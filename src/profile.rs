//! Backup profiles and their on-disk store.
//!
//! A profile names a set of source patterns, an ignore list and a
//! destination directory. Profiles are stored as one JSON record per file,
//! and the same record is embedded in every archive as its manifest.

use crate::constants::PROFILE_VERSION;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A named backup configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    name: String,
    /// Source paths or glob patterns, in the order they are selected.
    pub sources: Vec<String>,
    /// Files and directories excluded from the backup.
    pub ignore_list: Vec<PathBuf>,
    /// Directory archives are written to.
    pub destination: PathBuf,
}

/// Serialized form of a [`Profile`].
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProfileRecord {
    version: u32,
    name: String,
    sources: Vec<String>,
    destination: PathBuf,
    #[serde(default)]
    ignore_list: Vec<PathBuf>,
}

impl Profile {
    /// Creates a profile with no sources and an empty ignore list.
    pub fn new(name: impl Into<String>, destination: impl Into<PathBuf>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            sources: Vec::new(),
            ignore_list: Vec::new(),
            destination: destination.into(),
        })
    }

    pub fn with_sources<I, S>(mut self, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sources = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ignore_list<I, P>(mut self, ignore_list: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.ignore_list = ignore_list.into_iter().map(Into::into).collect();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Serializes the profile as a pretty-printed JSON record.
    pub fn to_json(&self) -> Result<String> {
        let record = ProfileRecord {
            version: PROFILE_VERSION,
            name: self.name.clone(),
            sources: self.sources.clone(),
            destination: self.destination.clone(),
            ignore_list: self.ignore_list.clone(),
        };
        Ok(serde_json::to_string_pretty(&record)?)
    }

    /// Parses a JSON record, rejecting unknown versions and invalid names.
    pub fn from_json(json: &str) -> Result<Self> {
        let record: ProfileRecord = serde_json::from_str(json)?;
        if record.version != PROFILE_VERSION {
            return Err(Error::VersionMismatch {
                expected: PROFILE_VERSION,
                found: record.version,
            });
        }
        validate_name(&record.name)?;
        Ok(Self {
            name: record.name,
            sources: record.sources,
            ignore_list: record.ignore_list,
            destination: record.destination,
        })
    }
}

/// Checks that `name` matches `^[A-Za-z0-9_-]+$`.
pub fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidProfileName(name.to_string()))
    }
}

/// Directory of `<name>.json` profile records.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file a profile with this name is stored in.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    pub fn load(&self, name: &str) -> Result<Profile> {
        validate_name(name)?;
        let path = self.path_of(name);
        let json = match fs::read_to_string(&path) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::ProfileNotFound(name.to_string()));
            }
            Err(e) => return Err(Error::io_at(path, e)),
        };
        let profile = Profile::from_json(&json)?;
        debug!("Loaded profile {} from {}", profile.name(), path.display());
        Ok(profile)
    }

    /// Saves a new profile. Never replaces an existing one.
    pub fn save(&self, profile: &Profile) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir).map_err(|e| Error::io_at(&self.dir, e))?;
        let path = self.path_of(profile.name());
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(Error::ProfileExists(profile.name().to_string()));
            }
            Err(e) => return Err(Error::io_at(path, e)),
        };
        let mut writer = io::BufWriter::new(file);
        writer
            .write_all(profile.to_json()?.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| Error::io_at(&path, e))?;
        debug!("Saved profile {} to {}", profile.name(), path.display());
        Ok(path)
    }

    /// Returns the names of all stored profiles, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(Error::io_at(&self.dir, e)),
        };
        let mut names = vec![];
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
                    if validate_name(name).is_ok() {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }
}
