//! Watcher trait definition.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use super::{CommandError, TrackerError};
use crate::status::StatusDocumentError;

/// Change detection and local materialization for a set of targets.
///
/// A watcher owns the per-target change state across calls. `watch` performs
/// whatever cloning, pulling or downloading is needed to bring the local
/// materialization of each changed target up to date, and reports the local
/// paths that changed since the previous call.
#[async_trait]
pub trait Watcher: Send + Sync {
    /// Check all targets and return the local paths whose contents changed,
    /// in target order. When the main target (element 0) changed, its path
    /// is first in the result.
    async fn watch(&mut self, targets: &[String]) -> Result<Vec<PathBuf>, WatchError>;
}

/// Iteration-scoped watch failure.
#[derive(Debug, Error)]
pub enum WatchError {
    /// A subprocess (clone, pull, reset, submodule update) failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem operation failed.
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An HTTP transport failure (non-success statuses are not errors; they
    /// are reported as "nothing fetched" and leave stored state untouched).
    #[error("fetching {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// The downloaded artifact could not be unpacked.
    #[error("archive {path}: {reason}")]
    Archive { path: PathBuf, reason: String },

    /// The status document was malformed.
    #[error(transparent)]
    Status(#[from] StatusDocumentError),

    /// The commit tracker failed.
    #[error(transparent)]
    Tracker(#[from] TrackerError),

    /// A target identifier could not be mapped to a local path.
    #[error(transparent)]
    Path(#[from] crate::paths::PathError),

    /// The watcher was invoked with an empty target list.
    #[error("no targets configured")]
    NoTargets,
}

impl WatchError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
