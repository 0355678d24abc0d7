//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options shared by
//! every polling mode.

use std::path::PathBuf;

use clap::Parser;

use cdwatch_core::DEFAULT_POLL_INTERVAL_SECS;

use crate::commands::Commands;

/// Command-line interface definition for the deployment watcher.
///
/// This is the top-level parser that handles global options and dispatches
/// to the polling-mode subcommands.
#[derive(Parser)]
#[command(name = "cdwatch")]
#[command(about = "Watch git repositories or artifact URLs and redeploy on change")]
#[command(version)]
pub struct Cli {
    /// Working directory for checkouts, artifacts and deployed binaries
    #[arg(short = 'w', long = "working-dir", global = true, default_value = ".")]
    pub working_dir: PathBuf,

    /// Seconds between polls
    #[arg(short = 't', long = "timeout", global = true, default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub timeout: u64,

    /// Command executed once before polling starts; may hold several
    /// subcommands separated with `;` (repeatable)
    #[arg(long = "init", global = true)]
    pub init: Vec<String>,

    /// Deploy-script environment variable as KEY=VALUE (repeatable)
    #[arg(long = "deployer-env", global = true)]
    pub deployer_env: Vec<String>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}
