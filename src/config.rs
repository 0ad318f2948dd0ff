//! Global settings for this application.
//!
//! Settings live in a small TOML file in the platform configuration
//! directory. It is optional: a missing file means defaults. The settings
//! decide where profiles are stored and which overwrite policy `restore`
//! uses when none is given on the command line.

use crate::constants::{CONFIG_NAME, PKG_NAME, PROFILES_DIR_NAME, SETTINGS_VERSION};
use crate::profile::ProfileStore;
use crate::restore::OverwritePolicy;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::fs;

/// The application settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Settings file version.
    pub version: String,
    /// Directory holding profile records. Defaults to `<config dir>/profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profiles_dir: Option<PathBuf>,
    /// Overwrite policy used by `restore` when none is given.
    #[serde(default)]
    pub overwrite: OverwritePolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_VERSION.to_string(),
            profiles_dir: None,
            overwrite: OverwritePolicy::default(),
        }
    }
}

impl Settings {
    /// Loads settings from the default settings file, or defaults if it does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_file()?)
    }

    /// Loads settings from `path`, or defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        let toml_str = match fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(Error::io_at(path, e)),
        };
        let settings: Settings = toml::from_str(&toml_str).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        if settings.version != SETTINGS_VERSION {
            return Err(Error::Settings {
                path: path.to_path_buf(),
                message: format!(
                    "unsupported version \"{}\", expected \"{SETTINGS_VERSION}\"",
                    settings.version
                ),
            });
        }
        Ok(settings)
    }

    /// Writes the settings to `path` in TOML format.
    ///
    /// Creates the parent directory if it does not exist.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io_at(parent, e))?;
        }
        let toml_str = toml::to_string_pretty(self).map_err(|e| Error::Settings {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let file = fs::File::create(path).map_err(|e| Error::io_at(path, e))?;
        let mut writer = io::BufWriter::new(file);
        writer.write_all(toml_str.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Returns the directory profiles are stored in.
    pub fn profiles_dir(&self) -> Result<PathBuf> {
        match &self.profiles_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(config_dir()?.join(PROFILES_DIR_NAME)),
        }
    }

    /// Opens the profile store these settings point at.
    pub fn profile_store(&self) -> Result<ProfileStore> {
        Ok(ProfileStore::open(self.profiles_dir()?))
    }
}

/// Returns the absolute path to the settings file.
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_NAME))
}

/// Returns the configuration directory for the application, platform-specific.
#[cfg(not(target_os = "macos"))]
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().ok_or(Error::NoConfigDir)?;
    Ok(config_dir.join(PKG_NAME))
}

/// Returns the configuration directory for the application, platform-specific.
#[cfg(target_os = "macos")]
pub fn config_dir() -> Result<PathBuf> {
    let home_dir = dirs::home_dir().ok_or(Error::NoConfigDir)?;
    Ok(home_dir.join(".config").join(PKG_NAME))
}
