//! Core domain types and port definitions for cdwatch.
//!
//! This crate holds everything the watch/deploy loop agrees on without
//! touching a subprocess, the filesystem layout conventions, and the port
//! traits that the runtime adapters implement. It contains no network or
//! process code.

pub mod config;
pub mod paths;
pub mod ports;
pub mod status;

// Re-export commonly used types for convenience
pub use config::{
    ConfigError, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_STOP_TIMEOUT_SECS, EnvPair, Replacement,
    WatchConfig,
};
pub use paths::PathError;
pub use ports::{
    CommandError, CommitTracker, DeployError, Deployer, TrackerError, WatchError, Watcher,
};
pub use status::{StatusDocument, StatusDocumentError};
