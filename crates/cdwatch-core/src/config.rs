//! Watch configuration domain types.
//!
//! All components receive one immutable [`WatchConfig`] by reference at
//! construction time; nothing here is mutated after the CLI finishes
//! assembling it.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default seconds between poll iterations.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default seconds to wait for a managed process to exit gracefully
/// before it is killed.
pub const DEFAULT_STOP_TIMEOUT_SECS: u64 = 30;

/// Shared configuration for a watch run.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory under which checkouts, artifacts and deployed binaries live.
    pub working_dir: PathBuf,
    /// Delay between poll iterations.
    pub poll_interval: Duration,
    /// Grace period for stopping the managed process.
    pub stop_timeout: Duration,
    /// Environment pairs applied to deploy-script invocations.
    pub deployer_env: Vec<EnvPair>,
    /// Shell command lines executed once before polling starts.
    /// Each line may contain several subcommands separated by `;`.
    pub init_commands: Vec<String>,
}

impl WatchConfig {
    /// Create a configuration with default timings and no extras.
    #[must_use]
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            stop_timeout: Duration::from_secs(DEFAULT_STOP_TIMEOUT_SECS),
            deployer_env: Vec::new(),
            init_commands: Vec::new(),
        }
    }

    /// Set the poll interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the graceful-stop timeout.
    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Set the deploy-script environment pairs.
    #[must_use]
    pub fn with_deployer_env(mut self, env: Vec<EnvPair>) -> Self {
        self.deployer_env = env;
        self
    }

    /// Set the init command lines.
    #[must_use]
    pub fn with_init_commands(mut self, commands: Vec<String>) -> Self {
        self.init_commands = commands;
        self
    }
}

/// One `KEY=VALUE` environment entry for deploy-script invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvPair {
    pub key: String,
    pub value: String,
}

impl EnvPair {
    /// Parse a `KEY=VALUE` string. The value may itself contain `=`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.split_once('=') {
            Some((key, value)) if !key.is_empty() => Ok(Self {
                key: key.to_string(),
                value: value.to_string(),
            }),
            _ => Err(ConfigError::InvalidEnvPair(raw.to_string())),
        }
    }
}

/// A tracked dependency repository and the dependency source it replaces.
///
/// Parsed from `--extra-repo` values: `from=to` tracks `to` and patches the
/// manifest dependency on `from` to the local clone of `to`; a bare URL is
/// shorthand for replacing a repository with itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Dependency source URL as it appears in the main checkout's manifest.
    pub from: String,
    /// Repository URL that is cloned and tracked locally.
    pub to: String,
}

impl Replacement {
    /// Parse an `--extra-repo` value.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (from, to) = match raw.split_once('=') {
            Some((from, to)) if !from.is_empty() && !to.is_empty() => (from, to),
            Some(_) => return Err(ConfigError::InvalidExtraRepo(raw.to_string())),
            None if !raw.is_empty() => (raw, raw),
            None => return Err(ConfigError::InvalidExtraRepo(raw.to_string())),
        };
        Ok(Self {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// Errors raised while assembling a [`WatchConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A `--deployer-env` value was not of the form `KEY=VALUE`.
    #[error("invalid environment pair `{0}` (expected KEY=VALUE)")]
    InvalidEnvPair(String),

    /// An `--extra-repo` value was empty or half of a `from=to` pair.
    #[error("invalid extra repository `{0}` (expected <url> or <from>=<to>)")]
    InvalidExtraRepo(String),
}
