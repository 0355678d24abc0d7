//! Build-and-run deployer for cargo checkouts.
//!
//! Rebuilds the whole dependency graph from the main checkout, so `deploy`
//! for a single changed path is a no-op and all the work happens in
//! `deploy_all`: patch the manifest, build, stop the old process, move the
//! binary into the working directory, start the new process.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use cdwatch_core::paths;
use cdwatch_core::{DeployError, Deployer, Replacement, WatchConfig};
use tracing::{info, warn};

use crate::command;
use crate::process::ManagedProcess;

/// Build-and-run deployment strategy. Owns the at-most-one managed process.
pub struct CargoDeployer {
    /// Main repository checkout the build runs in.
    checkout: PathBuf,
    /// Directory the built binary is moved into.
    working_dir: PathBuf,
    /// Name of the built binary, also its deployed file name.
    output: String,
    /// Arguments passed through to the managed binary.
    extra_args: Vec<String>,
    replacements: Vec<Replacement>,
    stop_timeout: Duration,
    child: Option<ManagedProcess>,
}

impl CargoDeployer {
    /// Create a deployer for the given main checkout.
    pub fn new(
        config: &WatchConfig,
        checkout: impl Into<PathBuf>,
        output: impl Into<String>,
        extra_args: Vec<String>,
        replacements: Vec<Replacement>,
    ) -> Self {
        Self {
            checkout: checkout.into(),
            working_dir: config.working_dir.clone(),
            output: output.into(),
            extra_args,
            replacements,
            stop_timeout: config.stop_timeout,
            child: None,
        }
    }

    /// Append one `[patch]` section per replacement to the checkout's
    /// manifest, pointing each dependency source at its sibling clone.
    ///
    /// The checkout is hard-reset before the next pull, so the manifest is
    /// pristine whenever this runs again.
    fn patch_manifest(&self) -> Result<(), DeployError> {
        if self.replacements.is_empty() {
            return Ok(());
        }
        let manifest = self.checkout.join("Cargo.toml");
        let mut content =
            fs::read_to_string(&manifest).map_err(|e| DeployError::io(&manifest, e))?;
        let sections = patch_sections(&self.replacements)?;
        info!(manifest = %manifest.display(), "patching manifest:\n{sections}");
        content.push_str(&sections);
        fs::write(&manifest, content).map_err(|e| DeployError::io(&manifest, e))?;
        Ok(())
    }

    /// Stop the current managed process, if any. Never fails the deploy:
    /// the old process is being replaced regardless of how it exits.
    async fn stop_current(&mut self) {
        let Some(child) = self.child.take() else {
            return;
        };
        info!(pid = child.pid(), "stopping managed process");
        match child.shutdown(self.stop_timeout).await {
            Ok(status) if status.success() => info!("managed process exited cleanly"),
            Ok(status) => warn!(%status, "managed process exited with non-zero status"),
            Err(e) => warn!(error = %e, "failed to stop managed process"),
        }
    }
}

/// Render the `[patch]` sections for the configured replacements.
fn patch_sections(replacements: &[Replacement]) -> Result<String, DeployError> {
    let mut out = String::new();
    for rep in replacements {
        let folder = paths::repo_folder_name(&rep.to)?;
        out.push_str(&format!(
            "\n[patch.\"{}\"]\n{folder} = {{ path = \"../{folder}\" }}\n",
            rep.from
        ));
    }
    Ok(out)
}

#[async_trait]
impl Deployer for CargoDeployer {
    async fn start(&mut self) -> Result<(), DeployError> {
        if self.output.is_empty() {
            return Err(DeployError::MissingOutputName);
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.stop_current().await;
    }

    async fn deploy(&mut self, _path: &Path) -> Result<(), DeployError> {
        // This strategy only ever rebuilds the whole graph in deploy_all
        Ok(())
    }

    async fn deploy_all(&mut self, _paths: &[PathBuf]) -> Result<(), DeployError> {
        self.patch_manifest()?;

        info!(checkout = %self.checkout.display(), "rebuilding main checkout");
        command::run("cargo", &["build", "--release"], &self.checkout).await?;
        info!("build finished");

        self.stop_current().await;

        let built = self
            .checkout
            .join("target")
            .join("release")
            .join(&self.output);
        if !built.exists() {
            return Err(DeployError::BinaryNotFound(built));
        }
        let deployed = self.working_dir.join(&self.output);
        info!(from = %built.display(), to = %deployed.display(), "moving binary");
        move_file(&built, &deployed)?;

        info!(binary = %deployed.display(), "starting managed process");
        let child = ManagedProcess::spawn(&deployed, &self.extra_args, &self.checkout).map_err(
            |e| DeployError::Spawn {
                command: deployed.display().to_string(),
                source: e,
            },
        )?;
        info!(pid = child.pid(), "managed process started");
        self.child = Some(child);
        Ok(())
    }
}

/// Rename, falling back to copy-and-remove across filesystems.
fn move_file(from: &Path, to: &Path) -> Result<(), DeployError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to).map_err(|e| DeployError::io(to, e))?;
    fs::remove_file(from).map_err(|e| DeployError::io(from, e))?;
    Ok(())
}
