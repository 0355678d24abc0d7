//! The watch/deploy loop.
//!
//! One worker task owns the watcher, the deployer and all loop state. The
//! caller requests shutdown through a [`CancellationToken`]; cancellation
//! takes effect at the sleep-or-cancelled point between iterations, never
//! mid-iteration.

use anyhow::Context;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use cdwatch_core::{DeployError, Deployer, WatchConfig, WatchError, Watcher};

use crate::command;

/// One iteration's failure, caught at the loop boundary.
///
/// A transient git/network/build error must never kill the long-running
/// watch process; the orchestrator logs it and polls again.
#[derive(Debug, Error)]
pub enum IterationError {
    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Deploy(#[from] DeployError),
}

/// Observation hooks for tests; no production behavior hangs off these.
#[derive(Default)]
pub struct LoopHooks {
    after_iteration: Option<Box<dyn FnMut() + Send + Sync>>,
    on_error: Option<Box<dyn FnMut(&IterationError) + Send + Sync>>,
}

impl LoopHooks {
    /// Hooks that observe nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every iteration, failed or not.
    #[must_use]
    pub fn on_after_iteration(mut self, hook: impl FnMut() + Send + Sync + 'static) -> Self {
        self.after_iteration = Some(Box::new(hook));
        self
    }

    /// Called when an iteration fails, before the loop continues.
    #[must_use]
    pub fn on_error(mut self, hook: impl FnMut(&IterationError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(hook));
        self
    }
}

/// The top-level watch/deploy loop.
///
/// State machine per run: idle → init commands → polling ⟲ → stopped.
pub struct Orchestrator {
    config: WatchConfig,
    targets: Vec<String>,
    watcher: Box<dyn Watcher>,
    deployer: Box<dyn Deployer>,
    hooks: LoopHooks,
}

impl Orchestrator {
    /// Assemble a run from its collaborators.
    pub fn new(
        config: WatchConfig,
        targets: Vec<String>,
        watcher: Box<dyn Watcher>,
        deployer: Box<dyn Deployer>,
    ) -> Self {
        Self {
            config,
            targets,
            watcher,
            deployer,
            hooks: LoopHooks::new(),
        }
    }

    /// Attach observation hooks.
    #[must_use]
    pub fn with_hooks(mut self, hooks: LoopHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run until cancelled.
    ///
    /// Startup failures (working-dir creation, deployer validation, init
    /// commands) are fatal and returned before the first poll; iteration
    /// failures are logged and the loop continues. On cancellation the
    /// deployer is stopped exactly once before returning.
    pub async fn run(mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!(
            working_dir = %self.config.working_dir.display(),
            interval = ?self.config.poll_interval,
            targets = ?self.targets,
            "starting watch loop"
        );

        std::fs::create_dir_all(&self.config.working_dir).with_context(|| {
            format!(
                "creating working directory {}",
                self.config.working_dir.display()
            )
        })?;

        self.deployer
            .start()
            .await
            .context("deployer validation failed")?;

        self.run_init_commands().await?;

        loop {
            if let Err(e) = self.iteration().await {
                error!(error = %e, "iteration failed");
                if let Some(hook) = self.hooks.on_error.as_mut() {
                    hook(&e);
                }
            }
            if let Some(hook) = self.hooks.after_iteration.as_mut() {
                hook();
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.poll_interval) => {}
                () = cancel.cancelled() => break,
            }
        }

        self.deployer.stop().await;
        info!("watch loop stopped");
        Ok(())
    }

    /// Execute the configured init command lines once, sequentially, in the
    /// working directory. Each line may hold several `;`-separated
    /// subcommands. Any failure stops the run before polling starts.
    async fn run_init_commands(&self) -> anyhow::Result<()> {
        for line in &self.config.init_commands {
            for sub in line.split(';').map(str::trim).filter(|s| !s.is_empty()) {
                info!(command = sub, "executing init command");
                command::run_line(sub, &self.config.working_dir)
                    .await
                    .with_context(|| format!("init command `{sub}` failed"))?;
            }
        }
        Ok(())
    }

    /// One pass: watch, then deploy every changed path in order, then
    /// deploy-all.
    async fn iteration(&mut self) -> Result<(), IterationError> {
        debug!("checking targets for changes");
        let changed = self.watcher.watch(&self.targets).await?;
        if changed.is_empty() {
            debug!("nothing changed");
            return Ok(());
        }

        info!(changed = ?changed, "deploying changed paths");
        for path in &changed {
            self.deployer.deploy(path).await?;
        }
        self.deployer.deploy_all(&changed).await?;
        Ok(())
    }
}
