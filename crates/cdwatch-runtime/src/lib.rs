//! Runtime adapters for cdwatch.
//!
//! Everything that touches a subprocess, the network or an archive lives
//! here: the git and notification commit trackers, the git and URL watchers,
//! the script and build-and-run deployers, managed-process lifecycle, and
//! the orchestrator loop that ties them together.

pub mod archive;
pub mod command;
pub mod deploy;
pub mod fetch;
pub mod orchestrator;
pub mod process;
pub mod tracker;
pub mod watcher;

// Re-export the main entry points for the composition root
pub use deploy::{CargoDeployer, ScriptDeployer};
pub use fetch::{Fetcher, HttpFetcher};
pub use orchestrator::{IterationError, LoopHooks, Orchestrator};
pub use process::ManagedProcess;
pub use tracker::{GotifyTracker, PullTracker};
pub use watcher::{GitWatcher, UrlWatcher};
