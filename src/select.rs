//! File selection.
//!
//! Expands the source patterns of a profile into the list of files to
//! archive. A directory source selects every file beneath it; any other
//! source is a glob pattern where `**` matches any number of directories.
//! Files equal to or beneath an ignore-list entry are excluded, but only
//! entries that can overlap the source are consulted.

use crate::codec;
use crate::path::{expand_path, expand_profile_path, is_within};
use crate::profile::Profile;
use crate::stats::BackupStats;
use crate::Result;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

/// Files chosen for one backup, with the statistics gathered while choosing them.
#[derive(Debug, Default)]
pub struct Selection {
    /// Absolute file paths in discovery order, without duplicates.
    pub files: Vec<PathBuf>,
    pub stats: BackupStats,
}

struct IgnoreEntry {
    path: PathBuf,
    is_dir: bool,
}

impl IgnoreEntry {
    /// An entry matters to a source when one contains the other. File
    /// entries are always consulted.
    fn is_relevant(&self, base: &Path) -> bool {
        !self.is_dir || is_within(base, &self.path) || is_within(&self.path, base)
    }
}

/// Selects the files described by `profile`.
///
/// Missing sources and unreadable entries are logged and counted as
/// warnings; invalid patterns are counted as errors. An empty selection is
/// not an error here, the caller decides what to do with it.
pub fn select(profile: &Profile) -> Result<Selection> {
    let ignore_list = profile
        .ignore_list
        .iter()
        .map(|path| {
            let path = expand_profile_path(path)?;
            let is_dir = path.is_dir();
            Ok(IgnoreEntry { path, is_dir })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut selector = Selector {
        selection: Selection::default(),
        seen: HashSet::new(),
        matched: 0,
    };

    for pattern in &profile.sources {
        selector.selection.stats.sources += 1;
        let source = expand_path(pattern)?;

        if let Some(entry) = ignore_list.iter().find(|e| is_within(&source, &e.path)) {
            info!(
                "Skipping source {} inside ignored path {}",
                source.display(),
                entry.path.display()
            );
            selector.selection.stats.ignored_sources += 1;
            continue;
        }

        let base = literal_prefix(&source);
        let relevant: Vec<&Path> = ignore_list
            .iter()
            .filter(|e| e.is_relevant(&base))
            .map(|e| e.path.as_path())
            .collect();

        let before = selector.matched;
        if source.is_dir() {
            debug!("D: {}", source.display());
            selector.walk(&source, &relevant);
        } else if source.is_file() {
            selector.consider(source.clone(), &relevant);
        } else {
            selector.expand_glob(&source, &relevant);
        }

        if selector.matched == before && !source.exists() {
            warn!("Source {} does not exist", source.display());
            selector.selection.stats.warnings += 1;
        }
    }

    Ok(selector.selection)
}

struct Selector {
    selection: Selection,
    /// Every regular file examined so far, included or ignored.
    seen: HashSet<PathBuf>,
    /// Regular files matched by any source, duplicates included.
    matched: u64,
}

impl Selector {
    fn walk(&mut self, dir: &Path, ignore: &[&Path]) {
        for entry in WalkDir::new(dir).follow_links(false).sort_by_file_name() {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => {}
                Ok(entry) => self.consider(entry.into_path(), ignore),
                Err(e) => {
                    warn!("Couldn't read {}: {e}", path_of_walk_error(&e, dir).display());
                    self.selection.stats.warnings += 1;
                }
            }
        }
    }

    fn expand_glob(&mut self, pattern: &Path, ignore: &[&Path]) {
        let Some(pattern_str) = pattern.to_str() else {
            error!("Source pattern {} is not valid UTF-8", pattern.display());
            self.selection.stats.errors += 1;
            return;
        };
        let paths = match glob::glob(pattern_str) {
            Ok(paths) => paths,
            Err(e) => {
                error!("Invalid source pattern {pattern_str}: {e}");
                self.selection.stats.errors += 1;
                return;
            }
        };
        for entry in paths {
            match entry {
                Ok(path) => self.consider(path, ignore),
                Err(e) => {
                    warn!("Couldn't read {}: {}", e.path().display(), e.error());
                    self.selection.stats.warnings += 1;
                }
            }
        }
    }

    /// Adds `path` if it is a regular file (or a link to one) outside every ignored path.
    fn consider(&mut self, path: PathBuf, ignore: &[&Path]) {
        let metadata = match fs::metadata(&path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Couldn't stat {}: {e}", path.display());
                self.selection.stats.warnings += 1;
                return;
            }
        };
        if !metadata.is_file() {
            return;
        }
        self.matched += 1;
        if !self.seen.insert(path.clone()) {
            return;
        }
        if ignore.iter().any(|i| is_within(&path, i)) {
            debug!("I: {}", path.display());
            self.selection.stats.ignored_files += 1;
            return;
        }
        if let Err(e) = codec::to_archive_path(&path) {
            warn!("Skipping {}: {e}", path.display());
            self.selection.stats.warnings += 1;
            return;
        }
        debug!("F: {}", path.display());
        let stats = &mut self.selection.stats;
        stats.files += 1;
        stats.src_bytes += metadata.len();
        self.selection.files.push(path);
    }
}

/// Returns the leading components of `pattern` that contain no glob syntax.
fn literal_prefix(pattern: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in pattern.components() {
        if let Component::Normal(part) = component {
            if part.to_string_lossy().contains(['*', '?', '[']) {
                break;
            }
        }
        prefix.push(component);
    }
    prefix
}

fn path_of_walk_error<'a>(e: &'a walkdir::Error, fallback: &'a Path) -> &'a Path {
    e.path().unwrap_or(fallback)
}
