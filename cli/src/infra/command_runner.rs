//! Infrastructure implementation of the `CommandRunner` port.

use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::AsyncReadExt;
use tokio::process::Child;

use crate::application::ports::CommandRunner;

/// Default timeout for short tool invocations (virsh, euca-*, glance).
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for guest disk edits, which boot a libguestfs appliance.
pub const GUEST_CMD_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs VM tooling as tokio child processes.
///
/// A timed-out child is killed explicitly; dropping the `output()` future
/// alone can leave it running.
pub struct TokioCommandRunner {
    timeout: Duration,
}

impl TokioCommandRunner {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TokioCommandRunner {
    fn default() -> Self {
        Self::new(DEFAULT_CMD_TIMEOUT)
    }
}

async fn read_all<R: tokio::io::AsyncRead + Unpin>(handle: Option<R>) -> Vec<u8> {
    let mut buf = Vec::new();
    if let Some(mut h) = handle {
        let _ = h.read_to_end(&mut buf).await;
    }
    buf
}

/// Drain a piped child's output, killing it once `timeout` elapses.
async fn collect(mut child: Child, program: &str, timeout: Duration) -> Result<Output> {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let drained = async {
        let (status, stdout, stderr) = tokio::join!(child.wait(), read_all(stdout), read_all(stderr));
        Ok::<_, std::io::Error>(Output {
            status: status?,
            stdout,
            stderr,
        })
    };
    match tokio::time::timeout(timeout, drained).await {
        Ok(result) => result.with_context(|| format!("waiting for {program}")),
        Err(_) => {
            let _ = child.kill().await;
            anyhow::bail!("{program} timed out after {}s", timeout.as_secs())
        }
    }
}

impl CommandRunner for TokioCommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.run_with_timeout(program, args, self.timeout).await
    }

    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output> {
        tracing::debug!(program, ?args, "running");
        let child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        collect(child, program, timeout).await
    }

    // oz and qemu-img report progress on the terminal, so no timeout and no
    // capture here.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus> {
        tracing::debug!(program, ?args, "running attached");
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        child
            .wait()
            .await
            .with_context(|| format!("waiting for {program}"))
    }
}

/// Error carrying a failed command's exit status and trimmed stderr.
#[must_use]
pub fn command_failed(what: &str, output: &Output) -> anyhow::Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::anyhow!("{what} failed ({}): {}", output.status, stderr.trim())
}
