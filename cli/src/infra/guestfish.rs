//! `GuestCustomizer` over libguestfs tools.

use std::path::Path;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, GuestCustomizer};
use crate::infra::command_runner::{GUEST_CMD_TIMEOUT, command_failed};
use crate::infra::platform::{ShellPlatform, stdout_or_bail};

/// Split a guest path into its directory and file name.
fn split_guest_path(guest_path: &str) -> Result<(&str, &str)> {
    match guest_path.rsplit_once('/') {
        Some((dir, file)) if !file.is_empty() => Ok((if dir.is_empty() { "/" } else { dir }, file)),
        _ => anyhow::bail!("not a guest file path: {guest_path}"),
    }
}

impl<R: CommandRunner> GuestCustomizer for ShellPlatform<R> {
    async fn guest_download(&self, disk: &Path, guest_path: &str) -> Result<String> {
        let disk = disk.to_string_lossy();
        let output = self
            .runner
            .run_with_timeout("virt-cat", &["-a", &disk, guest_path], GUEST_CMD_TIMEOUT)
            .await
            .context("virt-cat")?;
        stdout_or_bail(&format!("virt-cat {guest_path}"), &output)
    }

    async fn guest_upload(&self, disk: &Path, guest_path: &str, content: &str) -> Result<()> {
        let (dir, file) = split_guest_path(guest_path)?;
        let staging = tempfile::tempdir().context("creating staging directory")?;
        let local = staging.path().join(file);
        std::fs::write(&local, content)
            .with_context(|| format!("writing {}", local.display()))?;

        let disk = disk.to_string_lossy();
        let local = local.to_string_lossy();
        let output = self
            .runner
            .run_with_timeout(
                "virt-copy-in",
                &["-a", &disk, &local, dir],
                GUEST_CMD_TIMEOUT,
            )
            .await
            .context("virt-copy-in")?;
        if !output.status.success() {
            return Err(command_failed(&format!("virt-copy-in {guest_path}"), &output));
        }
        Ok(())
    }

    async fn guest_remove(&self, disk: &Path, guest_path: &str) -> Result<()> {
        let disk = disk.to_string_lossy();
        let output = self
            .runner
            .run_with_timeout(
                "guestfish",
                &["--rw", "-a", &disk, "-i", "rm-f", guest_path],
                GUEST_CMD_TIMEOUT,
            )
            .await
            .context("guestfish rm-f")?;
        if !output.status.success() {
            return Err(command_failed(&format!("guestfish rm-f {guest_path}"), &output));
        }
        Ok(())
    }
}
