//! Git-backed watcher.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use cdwatch_core::paths;
use cdwatch_core::{CommitTracker, WatchConfig, WatchError, Watcher};
use tracing::{debug, info};

use crate::command;

/// Watches a set of git repositories through a [`CommitTracker`].
///
/// Owns all per-target state: the last recorded change identifier per local
/// checkout, and the flag that forces a hard reset of existing checkouts on
/// the pass after any change (a deploy may have written build outputs into
/// the tree).
pub struct GitWatcher {
    working_dir: PathBuf,
    tracker: Box<dyn CommitTracker>,
    clean_required: bool,
    /// Last recorded change identifier per checkout path. A `None` value
    /// means the target was built once without a change signal.
    last_changes: HashMap<PathBuf, Option<String>>,
}

impl GitWatcher {
    /// Create a watcher rooted at the configured working directory.
    pub fn new(config: &WatchConfig, tracker: Box<dyn CommitTracker>) -> Self {
        Self {
            working_dir: config.working_dir.clone(),
            tracker,
            clean_required: false,
            last_changes: HashMap::new(),
        }
    }
}

/// Decide whether a target changed given the tracker signal and the
/// recorded state.
///
/// "No signal yet" on a never-built target means first-time build; on an
/// already-built target it means nothing fresher is known.
fn is_changed(signal: Option<&str>, recorded: Option<&Option<String>>) -> bool {
    match (signal, recorded) {
        (Some(id), Some(Some(last))) => id != last,
        (Some(_), _) => true,
        (None, None) => true,
        (None, Some(_)) => false,
    }
}

#[async_trait]
impl Watcher for GitWatcher {
    async fn watch(&mut self, targets: &[String]) -> Result<Vec<PathBuf>, WatchError> {
        let repos_root = paths::repos_dir(&self.working_dir);
        fs::create_dir_all(&repos_root).map_err(|e| WatchError::io(&repos_root, e))?;

        // Set by the previous pass; a deploy may have written build outputs
        // into the checkouts since then.
        let clean_needed = self.clean_required;

        let mut changed = Vec::new();
        for target in targets {
            let local = paths::repo_local_path(&self.working_dir, target)?;
            debug!(repo = target, path = %local.display(), "checking");

            if local.exists() {
                if clean_needed {
                    info!(path = %local.display(), "resetting checkout");
                    command::run("git", &["reset", "--hard"], &local).await?;
                }
            } else {
                info!(repo = target, path = %local.display(), "checkout missing, cloning");
                command::run("git", &["clone", "--recurse-submodules", target], &repos_root)
                    .await?;
            }

            let signal = self.tracker.last_change(target, &local).await?;
            let recorded = self.last_changes.get(&local);
            if !is_changed(signal.as_deref(), recorded) {
                continue;
            }

            let previous = recorded.cloned().flatten();
            info!(repo = target, old = ?previous, new = ?signal, "change detected");

            // A fresh clone already carries its submodules; only an
            // already-built checkout needs them brought up to date.
            if previous.is_some() && local.join(".gitmodules").exists() {
                info!(path = %local.display(), "updating submodules");
                command::run("git", &["submodule", "update", "--recursive"], &local).await?;
            }

            self.clean_required = true;
            self.last_changes.insert(local.clone(), signal);
            changed.push(local);
        }

        if changed.is_empty() {
            self.clean_required = false;
        }
        Ok(changed)
    }
}
