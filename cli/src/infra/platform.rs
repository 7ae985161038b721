//! Shell-backed VM platform.
//!
//! `ShellPlatform<R>` drives virsh, libguestfs, oz, euca2ools, glance and
//! nova-manage through a `CommandRunner`. Each port is implemented in its
//! own module: `virsh`, `guestfish`, `oz` and `openstack`.

use std::process::Output;

use crate::application::ports::CommandRunner;
use crate::domain::config::{GlanceConfig, PcloudConfig};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};

/// Infrastructure adapter that routes every VM tool invocation through a
/// `CommandRunner`.
///
/// Generic over `R: CommandRunner` so that tests can inject a mock runner
/// without spawning real processes.
pub struct ShellPlatform<R: CommandRunner> {
    pub(crate) runner: R,
    pub(crate) libvirt_uri: String,
    pub(crate) glance: GlanceConfig,
}

impl<R: CommandRunner> ShellPlatform<R> {
    pub fn new(runner: R, cfg: &PcloudConfig) -> Self {
        Self {
            runner,
            libvirt_uri: cfg.libvirt_uri.clone(),
            glance: cfg.glance.clone(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }
}

impl ShellPlatform<TokioCommandRunner> {
    /// Convenience constructor for production use.
    #[must_use]
    pub fn default_runner(cfg: &PcloudConfig) -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT), cfg)
    }
}

/// Trimmed stdout of a successful command, or an error naming `what`.
pub(crate) fn stdout_or_bail(what: &str, output: &Output) -> anyhow::Result<String> {
    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        Err(crate::infra::command_runner::command_failed(what, output))
    }
}
