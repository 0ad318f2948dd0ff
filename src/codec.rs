//! Archive path codec.
//!
//! Files from several volumes share one flat archive namespace. An absolute
//! path is stored without its root: on Windows the drive designator `C:`
//! becomes a top-level `C` directory, on Unix the leading `/` is dropped.
//! Archive paths always use `/` separators.
//!
//! The two encodings are pure string functions selected by [`PathStyle`] so
//! both can be exercised on any host; [`to_archive_path`] and
//! [`to_absolute_path`] use the style of the running platform.

use crate::constants::MANIFEST_NAME;
use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Path syntax of a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    /// Single root `/`, `/` separators.
    Posix,
    /// Drive-letter roots such as `C:\`, `\` or `/` separators.
    Windows,
}

impl PathStyle {
    /// The path style of the platform this binary was built for.
    pub const fn host() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }
}

/// Converts an absolute filesystem path into its archive entry name.
pub fn to_archive_path(path: &Path) -> Result<String> {
    let path = path
        .to_str()
        .ok_or_else(|| Error::invalid_path(path.to_string_lossy(), "not valid UTF-8"))?;
    encode(PathStyle::host(), path)
}

/// Converts an archive entry name back into the absolute filesystem path it was taken from.
pub fn to_absolute_path(name: &str) -> Result<PathBuf> {
    decode(PathStyle::host(), name).map(PathBuf::from)
}

/// Encodes an absolute path written in `style` as an archive path.
pub fn encode(style: PathStyle, path: &str) -> Result<String> {
    match style {
        PathStyle::Posix => {
            let rest = path
                .strip_prefix('/')
                .ok_or_else(|| Error::invalid_path(path, "not an absolute path"))?;
            let parts = components(path, rest, &['/'])?;
            if parts.is_empty() {
                return Err(Error::invalid_path(path, "refers to the filesystem root"));
            }
            let name = parts.join("/");
            if name == MANIFEST_NAME {
                return Err(Error::invalid_path(path, "collides with the archive manifest"));
            }
            Ok(name)
        }
        PathStyle::Windows => {
            if path.starts_with(r"\\") || path.starts_with("//") {
                return Err(Error::invalid_path(path, "UNC and device paths are not supported"));
            }
            let (drive, rest) = split_drive(path)
                .ok_or_else(|| Error::invalid_path(path, "not an absolute path with a drive letter"))?;
            let parts = components(path, rest, &['\\', '/'])?;
            if parts.is_empty() {
                return Err(Error::invalid_path(path, "refers to a drive root"));
            }
            let mut name = String::with_capacity(path.len());
            name.push(drive);
            for part in parts {
                name.push('/');
                name.push_str(part);
            }
            Ok(name)
        }
    }
}

/// Decodes an archive path into an absolute path written in `style`.
pub fn decode(style: PathStyle, name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split('/').collect();
    for part in &parts {
        if part.is_empty() || *part == "." || *part == ".." {
            return Err(Error::invalid_path(name, "contains an empty or relative component"));
        }
    }
    match style {
        PathStyle::Posix => Ok(format!("/{name}")),
        PathStyle::Windows => {
            let drive = single_drive_letter(parts[0])
                .ok_or_else(|| Error::invalid_path(name, "does not start with a drive letter"))?;
            if parts.len() < 2 {
                return Err(Error::invalid_path(name, "refers to a drive root"));
            }
            if parts[1..].iter().any(|p| p.contains(['\\', ':'])) {
                return Err(Error::invalid_path(name, "contains a reserved character"));
            }
            Ok(format!("{drive}:\\{}", parts[1..].join("\\")))
        }
    }
}

/// Splits `C:\rest` into (`C`, `rest`).
fn split_drive(path: &str) -> Option<(char, &str)> {
    let mut chars = path.chars();
    let drive = chars.next().filter(char::is_ascii_alphabetic)?;
    if chars.next() != Some(':') {
        return None;
    }
    let rest = chars.as_str();
    let rest = rest.strip_prefix(['\\', '/'])?;
    Some((drive, rest))
}

fn single_drive_letter(part: &str) -> Option<char> {
    let mut chars = part.chars();
    let drive = chars.next().filter(char::is_ascii_alphabetic)?;
    chars.next().is_none().then_some(drive)
}

/// Splits the part of `path` after its root into non-empty components.
fn components<'a>(path: &str, rest: &'a str, separators: &[char]) -> Result<Vec<&'a str>> {
    let mut parts = vec![];
    for part in rest.split(separators) {
        match part {
            "" => continue,
            "." | ".." => {
                return Err(Error::invalid_path(path, "contains a relative component"));
            }
            part => parts.push(part),
        }
    }
    Ok(parts)
}
