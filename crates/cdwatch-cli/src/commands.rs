//! Polling-mode subcommand definitions.

use clap::Subcommand;

/// The three polling modes.
#[derive(Subcommand)]
pub enum Commands {
    /// Poll git repositories and rebuild the main one when anything changes.
    ///
    /// The main repository is built with the built-in build-and-run strategy
    /// unless the working directory carries a custom deploy script.
    Cd {
        /// Main repository URL
        #[arg(short = 'r', long = "repo")]
        repo: String,

        /// Dependency repository to track: <url> or <from>=<to> (repeatable)
        #[arg(long = "extra-repo")]
        extra_repo: Vec<String>,

        /// Output binary name
        #[arg(short = 'o', long = "output")]
        output: String,

        /// Arguments passed through to the managed binary
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Poll a status-document URL (line 1: artifact zip URL, line 2:
    /// deploy-script URL) and run the script when either changes.
    CdUrl {
        /// URL of the two-line status document
        #[arg(short = 'u', long = "url")]
        url: String,
    },

    /// Poll git repositories, learning new commits from a Gotify server
    /// instead of pulling each interval.
    CdNotify {
        /// Main repository URL
        #[arg(short = 'r', long = "repo")]
        repo: String,

        /// Dependency repository to track: <url> or <from>=<to> (repeatable)
        #[arg(long = "extra-repo")]
        extra_repo: Vec<String>,

        /// Output binary name
        #[arg(short = 'o', long = "output")]
        output: String,

        /// Gotify server URL
        #[arg(short = 'u', long = "url")]
        url: String,

        /// Gotify client token
        #[arg(long = "token")]
        token: String,

        /// Arguments passed through to the managed binary
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}
