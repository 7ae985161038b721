//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once from the top-level flags and the loaded
//! configuration. Command handlers borrow the store, filesystem and VM
//! platform from it instead of constructing their own.

use std::io::IsTerminal as _;

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{DBDIR_ENV, PcloudConfig};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::cpe_client::BusCpeClient;
use crate::infra::fs::HostFs;
use crate::infra::platform::ShellPlatform;
use crate::infra::xml_store::XmlStore;
use crate::output::{OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `PCLOUD_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    /// Output rendering options.
    pub output: OutputFlags,
    /// Behaviour options.
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// Effective configuration, after environment overrides.
    pub config: PcloudConfig,
    /// Where `config` was loaded from.
    pub config_store: YamlConfigStore,
    /// XML collections under `config.dbdir`.
    pub store: XmlStore,
    pub fs: HostFs,
    /// virsh / libguestfs / oz / openstack tooling.
    pub platform: ShellPlatform<TokioCommandRunner>,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, when the `CI` or `PCLOUD_YES`
    /// environment variables are present, or when stdin is not a terminal.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("PCLOUD_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env || !std::io::stdin().is_terminal();

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        let config_store = YamlConfigStore;
        let mut config = config_store.load()?;
        if let Ok(dbdir) = std::env::var(DBDIR_ENV) {
            tracing::debug!(%dbdir, "dbdir overridden from environment");
            config.dbdir = dbdir.into();
        }

        // Progress lines would corrupt JSON documents on stdout.
        let quiet = flags.output.quiet || flags.output.json;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            store: XmlStore::new(&config.dbdir, &config.version),
            fs: HostFs,
            platform: ShellPlatform::default_runner(&config),
            config,
            config_store,
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        Renderer::new(&self.output, self.is_json())
    }

    /// Progress reporter for application services.
    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Client for the Cloud Policy Engine on the configured bus.
    ///
    /// # Errors
    ///
    /// Returns an error if `bus_url` is not a valid bus URL.
    pub fn policy_engine(&self) -> Result<BusCpeClient> {
        BusCpeClient::new(&self.config.bus_url)
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }
}
