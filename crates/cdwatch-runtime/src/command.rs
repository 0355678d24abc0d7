//! Subprocess helpers.
//!
//! Build, clone and deploy commands inherit the worker's stdout/stderr so
//! their output lands in the operator's terminal; commands whose output is
//! the value being read (`git log`) are captured instead.

use std::path::Path;

use cdwatch_core::CommandError;
use tokio::process::Command;
use tracing::{debug, warn};

/// Run a command to completion with inherited stdio.
///
/// A non-zero exit status is an error.
pub async fn run(program: &str, args: &[&str], cwd: &Path) -> Result<(), CommandError> {
    let rendered = render(program, args);
    debug!(command = %rendered, cwd = %cwd.display(), "running");
    let status = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .status()
        .await
        .map_err(|e| CommandError::new(&rendered, e.to_string()))?;
    if status.success() {
        Ok(())
    } else {
        Err(CommandError::new(&rendered, status.to_string()))
    }
}

/// Run a command and capture its stdout as a string.
///
/// On failure the captured output is logged before the error is returned,
/// since it would otherwise be lost.
pub async fn run_capture(program: &str, args: &[&str], cwd: &Path) -> Result<String, CommandError> {
    let rendered = render(program, args);
    debug!(command = %rendered, cwd = %cwd.display(), "running (captured)");
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .await
        .map_err(|e| CommandError::new(&rendered, e.to_string()))?;
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        warn!(
            command = %rendered,
            stdout = %String::from_utf8_lossy(&output.stdout),
            stderr = %String::from_utf8_lossy(&output.stderr),
            "command failed"
        );
        Err(CommandError::new(&rendered, output.status.to_string()))
    }
}

/// Run a whitespace-separated command line with inherited stdio.
pub async fn run_line(line: &str, cwd: &Path) -> Result<(), CommandError> {
    let mut parts = line.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| CommandError::new(line, "empty command"))?;
    let args: Vec<&str> = parts.collect();
    run(program, &args, cwd).await
}

fn render(program: &str, args: &[&str]) -> String {
    if args.is_empty() {
        program.to_string()
    } else {
        format!("{program} {}", args.join(" "))
    }
}
