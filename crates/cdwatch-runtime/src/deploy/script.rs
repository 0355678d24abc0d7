//! Script-based deployer.
//!
//! Everything about the deployment is the script's business; this strategy
//! just invokes it with a fixed first argument (`start`, `stop`, `deploy`,
//! `deploy-all`), the changed path(s) for the deploy commands, any
//! configured extra arguments, and the configured environment pairs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cdwatch_core::paths;
use cdwatch_core::{CommandError, DeployError, Deployer, EnvPair, WatchConfig};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Invokes an external `deploy.sh`-style script for every operation.
pub struct ScriptDeployer {
    /// The script itself.
    script: PathBuf,
    /// Directory the script runs in.
    dir: PathBuf,
    env: Vec<EnvPair>,
    extra_args: Vec<String>,
}

impl ScriptDeployer {
    /// Create a deployer for the script at `script`, running it from the
    /// script's directory.
    pub fn new(script: impl Into<PathBuf>, config: &WatchConfig) -> Self {
        let script = script.into();
        let dir = script
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self {
            script,
            dir,
            env: config.deployer_env.clone(),
            extra_args: Vec::new(),
        }
    }

    /// Append fixed extra arguments to every invocation.
    #[must_use]
    pub fn with_extra_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Invocation: `<script> <command> [changed-paths...] [extra-args...]`
    /// with the configured environment applied.
    async fn exec(&self, command: &str, changed: &[&Path]) -> Result<(), CommandError> {
        let rendered = format!("{} {command}", self.script.display());
        info!(command = %rendered, "invoking deploy script");

        let mut cmd = Command::new(&self.script);
        cmd.arg(command);
        for path in changed {
            cmd.arg(path);
        }
        cmd.args(&self.extra_args).current_dir(&self.dir);
        for pair in &self.env {
            cmd.env(&pair.key, &pair.value);
        }

        let status = cmd
            .status()
            .await
            .map_err(|e| CommandError::new(&rendered, e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(CommandError::new(&rendered, status.to_string()))
        }
    }
}

#[async_trait]
impl Deployer for ScriptDeployer {
    async fn start(&mut self) -> Result<(), DeployError> {
        // In URL mode the script only appears after the first successful
        // poll; nothing to validate or run until then.
        if self.script.exists() {
            self.exec("start", &[]).await?;
        } else {
            debug!(script = %self.script.display(), "no deploy script yet, skipping start");
        }
        Ok(())
    }

    async fn stop(&mut self) {
        // Shutdown must not hang on a broken script
        if let Err(e) = self.exec("stop", &[]).await {
            warn!(error = %e, "deploy script stop failed");
        }
    }

    async fn deploy(&mut self, path: &Path) -> Result<(), DeployError> {
        self.exec("deploy", &[path]).await?;
        Ok(())
    }

    async fn deploy_all(&mut self, paths: &[PathBuf]) -> Result<(), DeployError> {
        let changed: Vec<&Path> = paths.iter().map(PathBuf::as_path).collect();
        self.exec("deploy-all", &changed).await?;
        Ok(())
    }
}

/// Locate a custom deploy script in the working directory, if any.
///
/// A script at `<working-dir>/deploy.sh` or `<working-dir>/deployer.sh`
/// overrides the built-in build-and-run strategy.
#[must_use]
pub fn custom_script(working_dir: &Path) -> Option<PathBuf> {
    [paths::DEPLOY_SCRIPT, paths::DEPLOYER_SCRIPT]
        .iter()
        .map(|name| working_dir.join(name))
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[cfg(unix)]
    fn write_recorder_script(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = dir.join("deploy.sh");
        fs::write(&script, "#!/bin/sh\necho \"$@\" >> invocations.log\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[cfg(unix)]
    fn invocations(dir: &Path) -> Vec<String> {
        fs::read_to_string(dir.join("invocations.log"))
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn deploy_passes_command_and_path() {
        let tmp = TempDir::new().unwrap();
        let script = write_recorder_script(tmp.path());
        let config = WatchConfig::new(tmp.path());
        let mut deployer = ScriptDeployer::new(script, &config);

        deployer.deploy(Path::new("/repos/widget")).await.unwrap();
        deployer
            .deploy_all(&[PathBuf::from("/repos/widget"), PathBuf::from("/repos/gadget")])
            .await
            .unwrap();

        let log = invocations(tmp.path());
        assert_eq!(log[0], "deploy /repos/widget");
        assert_eq!(log[1], "deploy-all /repos/widget /repos/gadget");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn script_sees_configured_environment() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("deploy.sh");
        fs::write(&script, "#!/bin/sh\necho \"VER=$VER\" >> invocations.log\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let config = WatchConfig::new(tmp.path())
            .with_deployer_env(vec![EnvPair::parse("VER=5-SNAPSHOT").unwrap()]);
        let mut deployer = ScriptDeployer::new(script, &config);
        deployer.deploy(Path::new("/x")).await.unwrap();

        assert_eq!(invocations(tmp.path()), vec!["VER=5-SNAPSHOT"]);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_stop_is_swallowed() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("deploy.sh");
        fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let config = WatchConfig::new(tmp.path());
        let mut deployer = ScriptDeployer::new(script, &config);
        // Must not panic or propagate
        deployer.stop().await;
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn failing_deploy_is_an_error() {
        use std::os::unix::fs::PermissionsExt;
        let tmp = TempDir::new().unwrap();
        let script = tmp.path().join("deploy.sh");
        fs::write(&script, "#!/bin/sh\nexit 1\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let config = WatchConfig::new(tmp.path());
        let mut deployer = ScriptDeployer::new(script, &config);
        assert!(deployer.deploy(Path::new("/x")).await.is_err());
    }

    #[tokio::test]
    async fn start_without_script_is_ok() {
        let tmp = TempDir::new().unwrap();
        let config = WatchConfig::new(tmp.path());
        let mut deployer = ScriptDeployer::new(tmp.path().join("deploy.sh"), &config);
        assert!(deployer.start().await.is_ok());
    }

    #[test]
    fn custom_script_prefers_deploy_sh() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(custom_script(tmp.path()), None);

        fs::write(tmp.path().join("deployer.sh"), "").unwrap();
        assert_eq!(
            custom_script(tmp.path()),
            Some(tmp.path().join("deployer.sh"))
        );

        fs::write(tmp.path().join("deploy.sh"), "").unwrap();
        assert_eq!(custom_script(tmp.path()), Some(tmp.path().join("deploy.sh")));
    }
}
