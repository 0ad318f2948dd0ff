//! Command-line interface definition for crb.
//!
//! This module defines the CLI commands, their arguments, and the handlers
//! that connect them to the profile store, backup and restore.

use crb::backup;
use crb::cancel::CancelToken;
use crb::config::{self, Settings};
use crb::path::expand_path;
use crb::profile::{self, Profile, ProfileStore};
use crb::prompt::{self, Prompt};
use crb::restore::{OverwritePolicy, Restorer};
use crb::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface definition for crb.
#[derive(Parser)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub(crate) struct Cli {
    /// Print debug output.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    pub commands: Commands,
}

/// Supported crb commands.
#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Create a new backup profile.
    Init {
        /// Profile name. Asked interactively when omitted.
        #[arg(short, long)]
        name: Option<String>,
        /// Directory the archives are written to. Asked interactively when omitted.
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },
    /// Back up the files selected by a profile.
    Backup {
        /// Name of the profile to back up.
        #[arg(short, long)]
        profile: String,
    },
    /// Restore the files of a backup archive to their original locations.
    Restore {
        /// Archive to restore.
        #[arg(short, long)]
        file: PathBuf,
        /// What to do with files that already exist. Defaults to the settings value.
        #[arg(short, long)]
        overwrite: Option<OverwritePolicy>,
    },
    /// List the saved profiles.
    List,
    /// Show the settings file and the profile directory.
    Config {
        /// Replace the settings file with the defaults.
        #[arg(long)]
        reset: bool,
    },
}

/// Runs one command.
pub(crate) fn dispatch(commands: Commands, cancel: &CancelToken) -> Result<()> {
    if let Commands::Config { reset: true } = commands {
        reset_config(&config::config_file()?)?;
    }
    let settings = Settings::load()?;
    let store = settings.profile_store()?;

    match commands {
        Commands::Init { name, destination } => {
            init(&store, name, destination, &mut prompt::stdio(cancel.clone()), cancel)
        }
        Commands::Backup { profile } => run_backup(&store, &profile, cancel),
        Commands::Restore { file, overwrite } => {
            let policy = overwrite.unwrap_or(settings.overwrite);
            restore(&store, &file, policy, cancel)
        }
        Commands::List => list(&store),
        Commands::Config { .. } => show_config(&settings, &store),
    }
}

/// Creates a profile with no sources, asking for missing values.
pub(crate) fn init(
    store: &ProfileStore,
    name: Option<String>,
    destination: Option<PathBuf>,
    prompt: &mut dyn Prompt,
    cancel: &CancelToken,
) -> Result<()> {
    let name = match name {
        Some(name) => {
            profile::validate_name(&name)?;
            name
        }
        None => prompt::ask_until(prompt, cancel, "Profile name: ", |answer| {
            profile::validate_name(answer)
                .map(|_| answer.to_string())
                .map_err(|e| e.to_string())
        })?,
    };

    let destination = match destination {
        Some(dir) => {
            let dir = expand_path(&dir.to_string_lossy())?;
            if !dir.is_dir() {
                return Err(Error::invalid_path(
                    dir.display().to_string(),
                    "not an existing directory",
                ));
            }
            dir
        }
        None => prompt::ask_until(prompt, cancel, "Destination directory: ", |answer| {
            let dir = expand_path(answer).map_err(|e| e.to_string())?;
            if dir.is_dir() {
                Ok(dir)
            } else {
                Err(format!("'{}' is not an existing directory.", dir.display()))
            }
        })?,
    };

    let profile = Profile::new(name, destination)?;
    let path = store.save(&profile)?;
    info!("Created profile {}", profile.name());
    println!("Profile created at: {}", path.display());
    println!("Edit it to add backup sources.");
    Ok(())
}

/// Backs up a stored profile and prints the run summary.
fn run_backup(store: &ProfileStore, name: &str, cancel: &CancelToken) -> Result<()> {
    let profile = store.load(name)?;
    let run = backup::run(&profile, cancel);
    println!("{}", run.stats);
    let archive = run.outcome?;
    println!("Archive: {}", archive.path.display());
    Ok(())
}

fn restore(
    store: &ProfileStore,
    file: &Path,
    policy: OverwritePolicy,
    cancel: &CancelToken,
) -> Result<()> {
    let report = Restorer::new(store, policy)
        .with_cancel(cancel.clone())
        .restore(file, &mut prompt::stdio(cancel.clone()))?;
    println!("{report}");
    if report.failed > 0 {
        return Err(Error::RestoreIncomplete {
            failed: report.failed,
        });
    }
    Ok(())
}

fn list(store: &ProfileStore) -> Result<()> {
    for name in store.list()? {
        println!("{name}");
    }
    Ok(())
}

/// Writes the default settings to `path`.
fn reset_config(path: &Path) -> Result<()> {
    Settings::default().write_to(path)?;
    info!("Reset settings file {}", path.display());
    Ok(())
}

fn show_config(settings: &Settings, store: &ProfileStore) -> Result<()> {
    println!("Settings file: {}", config::config_file()?.display());
    println!("Profiles:      {}", store.dir().display());
    println!("Overwrite:     {:?}", settings.overwrite);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crb::prompt::ScriptedPrompt;
    use tempfile::TempDir;

    #[test]
    fn test_init_asks_until_answers_are_valid() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles"));
        let dest = dir.path().join("backups");
        std::fs::create_dir_all(&dest).unwrap();
        let missing = dir.path().join("missing");
        let mut prompt = ScriptedPrompt::new([
            "bad name",
            "docs",
            missing.to_str().unwrap(),
            dest.to_str().unwrap(),
        ]);

        init(&store, None, None, &mut prompt, &CancelToken::new()).unwrap();

        assert_eq!(prompt.questions.len(), 4);
        let profile = store.load("docs").unwrap();
        assert_eq!(profile.destination, dest);
        assert!(profile.sources.is_empty());
    }

    #[test]
    fn test_init_end_of_input_cancels() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles"));
        let mut prompt = ScriptedPrompt::default();

        let result = init(&store, None, None, &mut prompt, &CancelToken::new());

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_init_rejects_invalid_name_argument() {
        let dir = TempDir::new().unwrap();
        let store = ProfileStore::open(dir.path().join("profiles"));

        let result = init(
            &store,
            Some("no/slashes".into()),
            Some(dir.path().to_path_buf()),
            &mut ScriptedPrompt::default(),
            &CancelToken::new(),
        );

        assert!(matches!(result, Err(Error::InvalidProfileName(_))));
    }

    #[test]
    fn test_reset_config_replaces_invalid_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crb").join("config.toml");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "version = \"0\"").unwrap();
        assert!(matches!(Settings::load_from(&path), Err(Error::Settings { .. })));

        reset_config(&path).unwrap();

        assert_eq!(Settings::load_from(&path).unwrap(), Settings::default());
    }

    #[test]
    fn test_cli_parses_restore_policy() {
        let cli = Cli::try_parse_from(["crb", "restore", "-f", "a.zip", "-o", "never"]).unwrap();
        match cli.commands {
            Commands::Restore { file, overwrite } => {
                assert_eq!(file, PathBuf::from("a.zip"));
                assert_eq!(overwrite, Some(OverwritePolicy::Never));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
