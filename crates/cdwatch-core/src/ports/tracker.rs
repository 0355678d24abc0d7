//! Commit tracker trait definition.

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use super::CommandError;

/// Strategy for learning a target's latest change identifier.
///
/// Implementations may mutate the local checkout (the pull-based tracker
/// fetches into it) or consult an external channel without touching disk.
#[async_trait]
pub trait CommitTracker: Send + Sync {
    /// Latest known change identifier for `target`.
    ///
    /// `Ok(None)` means no change signal has ever been received for this
    /// target — distinct from "confirmed unchanged", which is `Ok(Some(id))`
    /// with an identifier equal to the previously recorded one.
    async fn last_change(
        &self,
        target: &str,
        local_path: &Path,
    ) -> Result<Option<String>, TrackerError>;
}

/// Tracker failure; iteration-scoped like the watch errors that wrap it.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A git subprocess failed.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The notification server could not be reached.
    #[error("notification server request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    /// The notification server rejected a request.
    #[error("notification server returned {status} for {url}")]
    Api { url: String, status: u16 },

    /// The notification server URL is malformed.
    #[error("invalid notification server URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}
