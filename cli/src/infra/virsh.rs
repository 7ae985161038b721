//! `Hypervisor` over the `virsh` CLI.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, Hypervisor};
use crate::domain::AssemblyState;
use crate::infra::command_runner::command_failed;
use crate::infra::platform::ShellPlatform;

/// True when virsh reports that the domain does not exist.
fn is_missing_domain(stderr: &str) -> bool {
    stderr.contains("failed to get domain") || stderr.contains("Domain not found")
}

/// Map `virsh domstate` output onto an assembly state.
pub(crate) fn parse_domstate(stdout: &str) -> AssemblyState {
    if stdout.trim() == "running" {
        AssemblyState::Running
    } else {
        AssemblyState::Stopped
    }
}

impl<R: CommandRunner> ShellPlatform<R> {
    async fn virsh(&self, args: &[&str]) -> Result<std::process::Output> {
        let mut full = vec!["-c", self.libvirt_uri.as_str()];
        full.extend_from_slice(args);
        self.runner.run("virsh", &full).await
    }
}

impl<R: CommandRunner> Hypervisor for ShellPlatform<R> {
    async fn domain_create(&self, xml_path: &Path) -> Result<()> {
        let path = xml_path.to_string_lossy();
        let output = self
            .virsh(&["create", &path])
            .await
            .context("virsh create")?;
        if !output.status.success() {
            return Err(command_failed("virsh create", &output));
        }
        Ok(())
    }

    async fn domain_destroy(&self, name: &str) -> Result<()> {
        let output = self
            .virsh(&["destroy", name])
            .await
            .context("virsh destroy")?;
        if output.status.success() {
            return Ok(());
        }
        if is_missing_domain(&String::from_utf8_lossy(&output.stderr)) {
            tracing::debug!(domain = name, "destroy: domain not defined");
            return Ok(());
        }
        Err(command_failed("virsh destroy", &output))
    }

    async fn domain_state(&self, name: &str) -> Result<AssemblyState> {
        let output = self
            .virsh(&["domstate", name])
            .await
            .context("virsh domstate")?;
        if output.status.success() {
            return Ok(parse_domstate(&String::from_utf8_lossy(&output.stdout)));
        }
        if is_missing_domain(&String::from_utf8_lossy(&output.stderr)) {
            return Ok(AssemblyState::Undefined);
        }
        Err(command_failed("virsh domstate", &output))
    }
}
