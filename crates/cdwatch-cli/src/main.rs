//! CLI entry point - the composition root.
//!
//! Parses flags, wires up the session via bootstrap, then runs the
//! orchestrator on a worker task while waiting for ctrl-c. Cancellation is
//! cooperative: the loop stops after its current iteration.

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cdwatch_cli::{Cli, build_session};
use cdwatch_runtime::Orchestrator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments first; --verbose drives the log filter
    let cli = Cli::parse();

    // Initialize logging: RUST_LOG wins, --verbose lowers the default
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Assemble watcher + deployer (composition root)
    let session = build_session(cli)?;

    let orchestrator = Orchestrator::new(
        session.config,
        session.targets,
        session.watcher,
        session.deployer,
    );

    let cancel = CancellationToken::new();
    let worker = tokio::spawn(orchestrator.run(cancel.clone()));

    // First interrupt requests a stop at the next iteration boundary;
    // further interrupts are ignored while shutdown is in progress
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, stopping after current iteration");
                cancel.cancel();
            }
        }
    });

    worker.await.context("watch worker panicked")??;

    info!("finished");
    Ok(())
}
