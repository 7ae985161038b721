//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::domain::{
    AssemblyError, ConfigError, CpeError, DeployableError, JeosError, NameError, StoreError,
};
use crate::output::{OutputContext, Renderer};

/// Operator shell for pacemaker-cloud assemblies and deployables
#[derive(Parser)]
#[command(
    name = "pcloudsh",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage base image templates
    #[command(subcommand)]
    Jeos(commands::jeos::JeosCommand),

    /// Manage assemblies
    #[command(subcommand)]
    Assembly(commands::assembly::AssemblyCommand),

    /// Manage resources monitored inside assemblies
    #[command(subcommand)]
    Resource(commands::resource::ResourceCommand),

    /// Manage deployables
    #[command(subcommand)]
    Deployable(commands::deployable::DeployableCommand),

    /// Print agent events until interrupted
    Events,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
            ..
        } = self;

        let flags = AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        };
        let app = || AppContext::new(&flags);

        match command {
            Command::Jeos(cmd) => commands::jeos::run(&app()?, cmd).await,
            Command::Assembly(cmd) => commands::assembly::run(&app()?, cmd).await,
            Command::Resource(cmd) => commands::resource::run(&app()?, cmd),
            Command::Deployable(cmd) => commands::deployable::run(&app()?, cmd).await,
            Command::Events => commands::events::run(&app()?).await,
            Command::Config(cmd) => commands::config::run(&app()?, cmd),
            Command::Version => {
                let output = OutputContext::new(no_color, quiet || json);
                commands::version::run(&Renderer::new(&output, json))
            }
        }
    }
}

/// Process exit code and machine-readable code for a failed command.
#[must_use]
pub fn failure(err: &anyhow::Error) -> (u8, &'static str) {
    if let Some(e) = err.downcast_ref::<CpeError>() {
        return (e.exit_code(), "CPE_NOT_FOUND");
    }
    let code = if err.downcast_ref::<StoreError>().is_some() {
        "NOT_FOUND"
    } else if err.downcast_ref::<AssemblyError>().is_some() {
        "ASSEMBLY"
    } else if err.downcast_ref::<DeployableError>().is_some() {
        "DEPLOYABLE"
    } else if err.downcast_ref::<JeosError>().is_some() {
        "JEOS"
    } else if err.downcast_ref::<ConfigError>().is_some() {
        "CONFIG"
    } else if err.downcast_ref::<NameError>().is_some() {
        "INVALID_NAME"
    } else {
        "ERROR"
    };
    (1, code)
}
