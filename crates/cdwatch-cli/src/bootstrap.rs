//! Composition root: turn parsed flags into a configured session.
//!
//! This is the only place where watchers, trackers and deployers are
//! selected and wired together.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use cdwatch_core::paths;
use cdwatch_core::{
    CommitTracker, Deployer, EnvPair, Replacement, WatchConfig, Watcher,
};
use cdwatch_runtime::deploy::custom_script;
use cdwatch_runtime::{
    CargoDeployer, GitWatcher, GotifyTracker, HttpFetcher, PullTracker, ScriptDeployer, UrlWatcher,
};

use crate::commands::Commands;
use crate::parser::Cli;

/// Everything the orchestrator needs for one run.
pub struct Session {
    pub config: WatchConfig,
    pub targets: Vec<String>,
    pub watcher: Box<dyn Watcher>,
    pub deployer: Box<dyn Deployer>,
}

/// Build the session for the parsed command line.
///
/// All configuration validation happens here, so a bad flag fails before the
/// poll loop starts.
pub fn build_session(cli: Cli) -> Result<Session> {
    let working_dir = std::path::absolute(&cli.working_dir).with_context(|| {
        format!(
            "resolving working directory {}",
            cli.working_dir.display()
        )
    })?;

    let deployer_env = cli
        .deployer_env
        .iter()
        .map(|raw| EnvPair::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let config = WatchConfig::new(working_dir)
        .with_poll_interval(Duration::from_secs(cli.timeout))
        .with_deployer_env(deployer_env)
        .with_init_commands(cli.init);

    match cli.command {
        Commands::Cd {
            repo,
            extra_repo,
            output,
            args,
        } => git_session(config, repo, &extra_repo, output, args, Box::new(PullTracker)),

        Commands::CdNotify {
            repo,
            extra_repo,
            output,
            url,
            token,
            args,
        } => {
            let tracker = GotifyTracker::new(&url, token)?;
            git_session(config, repo, &extra_repo, output, args, Box::new(tracker))
        }

        Commands::CdUrl { url } => {
            let work_dir = paths::artifact_home(&config.working_dir, &url).join(paths::WORK_DIR);
            let fetcher = HttpFetcher::new().context("building HTTP client")?;
            let watcher = UrlWatcher::new(&config, Box::new(fetcher));
            let deployer = ScriptDeployer::new(work_dir.join(paths::DEPLOY_SCRIPT), &config);
            Ok(Session {
                targets: vec![url],
                watcher: Box::new(watcher),
                deployer: Box::new(deployer),
                config,
            })
        }
    }
}

fn git_session(
    config: WatchConfig,
    repo: String,
    extra_repos: &[String],
    output: String,
    args: Vec<String>,
    tracker: Box<dyn CommitTracker>,
) -> Result<Session> {
    let replacements = extra_repos
        .iter()
        .map(|raw| Replacement::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let mut targets = vec![repo.clone()];
    targets.extend(replacements.iter().map(|rep| rep.to.clone()));

    let watcher = GitWatcher::new(&config, tracker);
    let deployer = select_git_deployer(&config, &repo, output, args, replacements)?;

    Ok(Session {
        targets,
        watcher: Box::new(watcher),
        deployer,
        config,
    })
}

/// A custom deploy script in the working directory overrides the built-in
/// build-and-run strategy.
fn select_git_deployer(
    config: &WatchConfig,
    repo: &str,
    output: String,
    args: Vec<String>,
    replacements: Vec<Replacement>,
) -> Result<Box<dyn Deployer>> {
    if let Some(script) = custom_script(&config.working_dir) {
        info!(script = %script.display(), "custom deploy script will be used");
        return Ok(Box::new(
            ScriptDeployer::new(script, config).with_extra_args(args),
        ));
    }

    info!("built-in cargo deployer will be used");
    let checkout = repo_checkout(&config.working_dir, repo)?;
    Ok(Box::new(CargoDeployer::new(
        config,
        checkout,
        output,
        args,
        replacements,
    )))
}

fn repo_checkout(working_dir: &Path, repo: &str) -> Result<std::path::PathBuf> {
    paths::repo_local_path(working_dir, repo)
        .with_context(|| format!("resolving local checkout for {repo}"))
}
