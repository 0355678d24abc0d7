//! Deployer trait definition.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use super::CommandError;

/// Deployment strategy for changed local paths.
///
/// At most one managed process is live per deployer instance; replacing it
/// is strictly stop-then-start.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Upfront validation before the poll loop starts. Must not panic;
    /// failure here is fatal at startup.
    async fn start(&mut self) -> Result<(), DeployError>;

    /// Stop the managed deployment. Must not panic and must not fail the
    /// run: implementations log problems and return.
    async fn stop(&mut self);

    /// Deploy a single changed path.
    async fn deploy(&mut self, path: &Path) -> Result<(), DeployError>;

    /// Deploy after all changed paths of one iteration are known.
    async fn deploy_all(&mut self, paths: &[PathBuf]) -> Result<(), DeployError>;
}

/// Iteration-scoped deploy failure (or startup validation failure from
/// [`Deployer::start`]).
#[derive(Debug, Error)]
pub enum DeployError {
    /// A subprocess (build, script, move) failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem operation failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The build-and-run strategy requires an output binary name.
    #[error("no output binary name configured")]
    MissingOutputName,

    /// The build completed but the expected binary is absent.
    #[error("built binary not found at {0}")]
    BinaryNotFound(PathBuf),

    /// The managed process could not be spawned.
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// A replacement repository URL could not be mapped to a local clone.
    #[error(transparent)]
    Path(#[from] crate::paths::PathError),
}

impl DeployError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
