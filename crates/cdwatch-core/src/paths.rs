//! Filesystem layout under the configured working directory.
//!
//! Layout:
//! - `<working-dir>/repos/<repo-folder>` per git target
//! - `<working-dir>/artifacts/<sanitized-target>/` per URL target, holding
//!   the downloaded archive, `deploy.sh`, and `work-dir/`
//!
//! Everything here is pure path arithmetic; directory creation is the
//! runtime's job.

use std::path::{Path, PathBuf};

use thiserror::Error;
use url::Url;

/// File name of the deploy script, both as a working-directory override
/// and inside an artifact directory.
pub const DEPLOY_SCRIPT: &str = "deploy.sh";

/// Alternative working-directory override script name.
pub const DEPLOYER_SCRIPT: &str = "deployer.sh";

/// Name of the extraction directory inside an artifact home.
pub const WORK_DIR: &str = "work-dir";

/// Errors from deriving filesystem locations out of target identifiers.
#[derive(Debug, Error)]
pub enum PathError {
    /// The target is not a parseable URL.
    #[error("invalid target URL `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The URL has no usable final path segment.
    #[error("target URL `{0}` has no file name component")]
    NoFileName(String),
}

/// Root folder for git checkouts.
#[must_use]
pub fn repos_dir(working_dir: &Path) -> PathBuf {
    working_dir.join("repos")
}

/// Root folder for URL-watched artifacts.
#[must_use]
pub fn artifacts_dir(working_dir: &Path) -> PathBuf {
    working_dir.join("artifacts")
}

/// Folder name for a repository: the last path segment of its URL.
pub fn repo_folder_name(repo_url: &str) -> Result<String, PathError> {
    last_path_segment(repo_url)
}

/// Local checkout path for a repository target.
pub fn repo_local_path(working_dir: &Path, repo_url: &str) -> Result<PathBuf, PathError> {
    Ok(repos_dir(working_dir).join(repo_folder_name(repo_url)?))
}

/// Home directory for one URL target's artifact state.
#[must_use]
pub fn artifact_home(working_dir: &Path, target: &str) -> PathBuf {
    artifacts_dir(working_dir).join(sanitize_target(target))
}

/// File name under which a downloaded artifact is stored: the last path
/// segment of its download URL.
pub fn artifact_file_name(artifact_url: &str) -> Result<String, PathError> {
    last_path_segment(artifact_url)
}

/// Collapse every run of non-alphanumeric characters in a target identifier
/// into a single underscore, yielding a directory-safe name.
#[must_use]
pub fn sanitize_target(target: &str) -> String {
    let mut out = String::with_capacity(target.len());
    let mut in_run = false;
    for ch in target.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

fn last_path_segment(raw_url: &str) -> Result<String, PathError> {
    let url = Url::parse(raw_url).map_err(|e| PathError::InvalidUrl {
        url: raw_url.to_string(),
        reason: e.to_string(),
    })?;
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
        .map(ToString::to_string)
        .ok_or_else(|| PathError::NoFileName(raw_url.to_string()))
}
