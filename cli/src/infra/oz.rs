//! `ImageBuilder` over oz and qemu-img.
//!
//! These tools run attached to the terminal so their progress output
//! reaches the user; only the exit status is returned.

use std::path::Path;
use std::process::ExitStatus;

use anyhow::{Context, Result};

use crate::application::ports::{CommandRunner, ImageBuilder};
use crate::infra::platform::ShellPlatform;

impl<R: CommandRunner> ImageBuilder for ShellPlatform<R> {
    async fn oz_install(&self, tdl: &Path, xml: &Path) -> Result<ExitStatus> {
        let tdl = tdl.to_string_lossy();
        let xml = xml.to_string_lossy();
        self.runner
            .run_status("oz-install", &["-t", "50000", "-u", "-d3", "-x", &xml, &tdl])
            .await
            .context("oz-install")
    }

    async fn oz_customize(&self, tdl: &Path, xml: &Path) -> Result<ExitStatus> {
        let tdl = tdl.to_string_lossy();
        let xml = xml.to_string_lossy();
        self.runner
            .run_status("oz-customize", &["-d3", &tdl, &xml])
            .await
            .context("oz-customize")
    }

    async fn convert_to_qcow2(&self, from: &Path, to: &Path) -> Result<ExitStatus> {
        let from = from.to_string_lossy();
        let to = to.to_string_lossy();
        self.runner
            .run_status("qemu-img", &["convert", "-O", "qcow2", &from, &to])
            .await
            .context("qemu-img convert")
    }
}
