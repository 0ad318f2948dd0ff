mod commands;

use crate::commands::Cli;
use anyhow::{Context, Result};
use clap::Parser;
use crb::cancel::{self, CancelToken};
use crb::logging;
use std::process;
use tokio::runtime::Builder;

/// Entry point for the crb CLI application.
/// Parses command-line arguments, starts the interrupt listener and
/// dispatches to the command handler.
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let runtime = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("Failed to start the interrupt listener")?;
    let cancel = CancelToken::new();
    runtime.spawn(cancel::cancel_on_interrupt(cancel.clone()));

    if let Err(e) = commands::dispatch(cli.commands, &cancel) {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
    Ok(())
}
