//! Managed-process lifecycle with graceful SIGTERM → SIGKILL escalation.
//!
//! The build-and-run deployer owns at most one of these at a time; replacing
//! the deployment always shuts the previous child down first.

use std::io;
use std::path::Path;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::debug;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;
#[cfg(unix)]
use tokio::time::timeout;

/// One spawned long-running deployment process.
pub struct ManagedProcess {
    child: Child,
    pid: u32,
}

impl ManagedProcess {
    /// Spawn `program` with `args` in `cwd`, inheriting stdout/stderr.
    pub fn spawn(program: &Path, args: &[String], cwd: &Path) -> io::Result<Self> {
        let mut child = Command::new(program).args(args).current_dir(cwd).spawn()?;
        let pid = child
            .id()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;
        debug!(program = %program.display(), pid, "spawned managed process");
        Ok(Self { child, pid })
    }

    /// OS process id of the child.
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Shut the child down: graceful signal, bounded wait, then force-kill.
    ///
    /// # Strategy
    /// 1. Send SIGTERM and wait up to `grace` for a clean exit
    /// 2. If still running, send SIGKILL
    /// 3. Wait for process reaping (required to avoid zombies)
    ///
    /// # Platform behavior
    /// - Unix: SIGTERM via nix, then SIGKILL via `Child::kill`
    /// - Windows: immediate kill (no graceful shutdown available)
    ///
    /// Returns the exit status once the process has been reaped.
    pub async fn shutdown(mut self, grace: Duration) -> io::Result<ExitStatus> {
        #[cfg(unix)]
        {
            self.shutdown_unix(grace).await
        }

        #[cfg(not(unix))]
        {
            let _ = grace;
            self.child.kill().await?;
            self.child.wait().await
        }
    }

    #[cfg(unix)]
    async fn shutdown_unix(&mut self, grace: Duration) -> io::Result<ExitStatus> {
        // Phase 1: SIGTERM with a bounded grace period
        if let Err(e) = signal::kill(Pid::from_raw(self.pid as i32), Signal::SIGTERM) {
            // Process may have already exited
            if e == nix::errno::Errno::ESRCH {
                return self.child.wait().await;
            }
            return Err(io::Error::other(e));
        }

        match timeout(grace, self.child.wait()).await {
            Ok(result) => return result,
            Err(_) => {
                // Grace period elapsed - escalate to SIGKILL
            }
        }

        // Phase 2: SIGKILL (via Child::kill which uses SIGKILL on Unix)
        self.child.kill().await?;

        // Phase 3: Wait for reaping (should be fast after SIGKILL)
        self.child.wait().await
    }
}
