//! Port definitions (trait abstractions) for the watch/deploy loop.
//!
//! Ports define what the orchestrator expects from its collaborators.
//! They contain no subprocess, network or archive implementation details.
//!
//! # Design Rules
//!
//! - Implementations are selected once at the composition root
//! - Watchers and deployers own their mutable state; no shared mutation
//! - Iteration-scoped failures are typed errors, never panics

pub mod deployer;
pub mod tracker;
pub mod watcher;

pub use deployer::{DeployError, Deployer};
pub use tracker::{CommitTracker, TrackerError};
pub use watcher::{WatchError, Watcher};

use thiserror::Error;

/// Failure of an external command, shared by watch, deploy and tracker
/// operations.
#[derive(Debug, Error)]
#[error("command `{command}` failed: {reason}")]
pub struct CommandError {
    /// The command line as it was invoked.
    pub command: String,
    /// Exit status or spawn failure description.
    pub reason: String,
}

impl CommandError {
    /// Create a new command error.
    pub fn new(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            reason: reason.into(),
        }
    }
}
