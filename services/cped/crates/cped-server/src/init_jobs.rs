//! Init-system control of per-deployable policy engine jobs.

use anyhow::{Context, Result};

/// Lifecycle action on a job instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Stop,
    Reload,
}

impl JobAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reload => "reload",
        }
    }
}

/// Runs init-system jobs. Returns the job command's exit code.
#[allow(async_fn_in_trait)]
pub trait JobRunner {
    async fn control(&self, action: JobAction, unit: &str) -> Result<i32>;
}

/// Instance name of the job for a deployable: `{template}@{uuid}`.
#[must_use]
pub fn instance_unit(template: &str, uuid: &str) -> String {
    format!("{template}@{uuid}")
}

/// `systemctl`-backed job runner.
pub struct Systemctl;

impl JobRunner for Systemctl {
    async fn control(&self, action: JobAction, unit: &str) -> Result<i32> {
        let status = tokio::process::Command::new("systemctl")
            .args([action.as_str(), unit])
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("systemctl {} {unit}", action.as_str()))?;
        // Killed by a signal: no code, report a generic failure.
        Ok(status.code().unwrap_or(1))
    }
}
