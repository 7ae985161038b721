//! `pcloudsh deployable`: groups of assemblies run by the policy engine.

use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::application::services::deployable_service;
use crate::domain::deployable::DEFAULT_USERNAME;
use crate::domain::{Infrastructure, MonitorMode};
use crate::output::progress;

/// Deployable subcommands.
#[derive(Subcommand)]
pub enum DeployableCommand {
    /// Create a deployable
    Create(CreateArgs),
    /// Tear down and forget a deployable
    Delete { name: String },
    /// List deployables
    List,
    /// Add an assembly to a deployable
    Add { deployable: String, assembly: String },
    /// Remove an assembly from a deployable
    Remove { deployable: String, assembly: String },
    /// List a deployable's assemblies
    Assemblies { deployable: String },
    /// Write the policy engine configuration to `<run_dir>/<name>.xml`
    Config { deployable: String },
    /// Start a deployable through the policy engine
    Start { deployable: String },
    /// Stop a deployable through the policy engine
    Stop { deployable: String },
    /// Reload a deployable's configuration in the policy engine
    Reload { deployable: String },
    /// Show the state of each assembly
    Status { deployable: String },
}

/// Arguments for `deployable create`.
#[derive(Args)]
pub struct CreateArgs {
    pub name: String,
    /// libvirt or openstack
    #[arg(long, default_value = "libvirt")]
    pub infrastructure: Infrastructure,
    /// Local user owning the deployable's cloud credentials
    #[arg(long, default_value = DEFAULT_USERNAME)]
    pub username: String,
    /// active or passive
    #[arg(long, default_value = "active")]
    pub monitor: MonitorMode,
}

/// Run a deployable command.
///
/// # Errors
///
/// Returns an error if the underlying service fails, including a missing
/// policy engine (`CpeError`) for start, stop and reload.
pub async fn run(app: &AppContext, cmd: DeployableCommand) -> Result<ExitCode> {
    let reporter = app.reporter();
    match cmd {
        DeployableCommand::Create(args) => {
            deployable_service::create(
                &app.config,
                &app.store,
                &app.fs,
                &app.platform,
                &reporter,
                &args.name,
                args.infrastructure,
                &args.username,
                args.monitor,
            )
            .await?;
        }
        DeployableCommand::Delete { name } => {
            if !app.confirm(&format!("Delete deployable {name}?"), true)? {
                app.output.info("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            deployable_service::delete(&app.config, &app.store, &app.fs, &app.platform, &reporter, &name)
                .await?;
        }
        DeployableCommand::List => {
            app.renderer()
                .render_deployable_list(&deployable_service::list(&app.store)?)?;
        }
        DeployableCommand::Add {
            deployable,
            assembly,
        } => {
            deployable_service::assembly_add(&app.store, &app.platform, &reporter, &deployable, &assembly)
                .await?;
        }
        DeployableCommand::Remove {
            deployable,
            assembly,
        } => {
            deployable_service::assembly_remove(&app.store, &deployable, &assembly)?;
            app.output
                .success(&format!("assembly {assembly} removed from {deployable}"));
        }
        DeployableCommand::Assemblies { deployable } => {
            let members = deployable_service::assembly_list(&app.store, &deployable)?;
            app.renderer().render_member_list(&deployable, &members)?;
        }
        DeployableCommand::Config { deployable } => {
            let path = deployable_service::generate_config(&app.config, &app.store, &app.fs, &deployable)?;
            app.output
                .success(&format!("wrote {}", path.display()));
        }
        DeployableCommand::Start { deployable } => {
            let engine = app.policy_engine()?;
            deployable_service::start(&app.config, &app.store, &app.fs, &engine, &reporter, &deployable)
                .await?;
        }
        DeployableCommand::Stop { deployable } => {
            let engine = app.policy_engine()?;
            deployable_service::stop(&app.store, &engine, &reporter, &deployable).await?;
        }
        DeployableCommand::Reload { deployable } => {
            let engine = app.policy_engine()?;
            deployable_service::reload(&app.store, &engine, &reporter, &deployable).await?;
        }
        DeployableCommand::Status { deployable } => {
            let pb = progress::spinner(&app.output, &format!("querying {deployable}..."));
            let rows = deployable_service::status(&app.store, &app.platform, &deployable).await;
            progress::finish_clear(&pb);
            app.renderer().render_deployable_status(&deployable, &rows?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
