//! Pull-based commit tracker.

use std::path::Path;

use async_trait::async_trait;
use cdwatch_core::{CommitTracker, TrackerError};
use tracing::debug;

use crate::command;

/// Learns the latest commit by pulling the repository into its local
/// checkout and reading the head commit hash.
///
/// A change signal is always known after a successful pull; any git failure
/// is an iteration-scoped error.
pub struct PullTracker;

#[async_trait]
impl CommitTracker for PullTracker {
    async fn last_change(
        &self,
        target: &str,
        local_path: &Path,
    ) -> Result<Option<String>, TrackerError> {
        debug!(repo = target, path = %local_path.display(), "pulling");
        command::run_capture("git", &["pull", target], local_path).await?;

        let head = command::run_capture(
            "git",
            &["log", "-n", "1", "--pretty=format:%H"],
            local_path,
        )
        .await?;
        Ok(Some(head.trim().to_string()))
    }
}
