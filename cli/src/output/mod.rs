//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use std::path::Path;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;
use pcloud_common::BusEvent;

use crate::domain::{Assembly, AssemblyState, Deployable, Jeos, PcloudConfig, Resource};

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }
}

/// Output renderer selected by `--json`.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl<'a> Renderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext, json: bool) -> Self {
        if json {
            Self::Json(JsonRenderer)
        } else {
            Self::Human(HumanRenderer::new(ctx))
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_jeos_list(&self, images: &[Jeos]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_jeos_list(images);
                Ok(())
            }
            Self::Json(r) => r.render_jeos_list(images),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_assembly_list(&self, assemblies: &[Assembly]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_assembly_list(assemblies);
                Ok(())
            }
            Self::Json(r) => r.render_assembly_list(assemblies),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_assembly_status(&self, name: &str, state: AssemblyState) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_assembly_status(name, state);
                Ok(())
            }
            Self::Json(r) => r.render_assembly_status(name, state),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_resource_list(&self, resources: &[Resource]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_resource_list(resources);
                Ok(())
            }
            Self::Json(r) => r.render_resource_list(resources),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deployable_list(&self, deployables: &[Deployable]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deployable_list(deployables);
                Ok(())
            }
            Self::Json(r) => r.render_deployable_list(deployables),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_member_list(&self, deployable: &str, members: &[String]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_member_list(members);
                Ok(())
            }
            Self::Json(r) => r.render_member_list(deployable, members),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_deployable_status(
        &self,
        deployable: &str,
        rows: &[(String, AssemblyState)],
    ) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deployable_status(rows);
                Ok(())
            }
            Self::Json(r) => r.render_deployable_status(deployable, rows),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_config(&self, config: &PcloudConfig, path: &Path) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_config(config, path);
                Ok(())
            }
            Self::Json(r) => r.render_config(config, path),
        }
    }

    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }

    /// Print one bus event as it arrives.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn render_event(&self, event: &BusEvent) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_event(event);
                Ok(())
            }
            Self::Json(r) => r.render_event(event),
        }
    }
}
