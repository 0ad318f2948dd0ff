use crate::Result;
use path_clean::PathClean;
use std::env;
use std::path::{Path, PathBuf};

/// Expands a profile path, replacing `~` or `$HOME` with the user's home
/// directory and resolving relative paths against the current directory.
///
/// The result is cleaned lexically; symbolic links are not resolved, so the
/// path stays the one the user wrote and round-trips through the archive.
pub fn expand_path(path: &str) -> Result<PathBuf> {
    let path = expand_home(path);
    let path = Path::new(&path);

    let abs_path = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()?.join(path)
    };
    Ok(abs_path.clean())
}

/// [`expand_path`] for paths read from a profile record.
///
/// Paths that are not valid UTF-8 cannot hold `~` or `$HOME` and are only
/// made absolute.
pub fn expand_profile_path(path: &Path) -> Result<PathBuf> {
    match path.to_str() {
        Some(s) => expand_path(s),
        None if path.is_absolute() => Ok(path.clean()),
        None => Ok(env::current_dir()?.join(path).clean()),
    }
}

/// Returns true if `path` is `base` or lies beneath it, comparing whole components.
pub fn is_within(path: &Path, base: &Path) -> bool {
    path.starts_with(base)
}

fn expand_home(input: &str) -> String {
    if input == "~" || input.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            return input.replacen('~', &home.to_string_lossy(), 1);
        }
    } else if input == "$HOME" || input.starts_with("$HOME/") {
        if let Some(home) = dirs::home_dir() {
            return input.replacen("$HOME", &home.to_string_lossy(), 1);
        }
    }
    input.into()
}
