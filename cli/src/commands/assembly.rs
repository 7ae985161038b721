//! `pcloudsh assembly`: managed VMs.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::assembly_service;
use crate::domain::Escalation;
use crate::output::progress;

/// Assembly subcommands.
#[derive(Subcommand)]
pub enum AssemblyCommand {
    /// Create an assembly from a JEOS, customized by `<dbdir>/assemblies/<name>.tdl`
    Create {
        name: String,
        /// JEOS identifier, `<name>-<arch>`
        jeos: String,
    },
    /// Copy an existing assembly under a new name
    Clone { source: String, dest: String },
    /// List assemblies
    List,
    /// Stop and forget an assembly
    Delete { name: String },
    /// Start the assembly's VM
    Start { name: String },
    /// Stop the assembly's VM
    Stop { name: String },
    /// Show the assembly's VM state
    Status { name: String },
    /// Set recovery escalation thresholds
    Escalation {
        name: String,
        /// Failures tolerated within the period before escalating
        #[arg(long)]
        failures: Option<u32>,
        /// Escalation period in seconds
        #[arg(long)]
        period: Option<u32>,
    },
}

/// Run an assembly command.
///
/// # Errors
///
/// Returns an error if the underlying service fails.
pub async fn run(app: &AppContext, cmd: AssemblyCommand) -> Result<ExitCode> {
    let reporter = app.reporter();
    match cmd {
        AssemblyCommand::Create { name, jeos } => {
            assembly_service::create(
                &app.config,
                &app.store,
                &app.fs,
                &app.platform,
                &reporter,
                &name,
                &jeos,
            )
            .await?;
        }
        AssemblyCommand::Clone { source, dest } => {
            assembly_service::clone(
                &app.config,
                &app.store,
                &app.fs,
                &app.platform,
                &reporter,
                &source,
                &dest,
            )
            .await?;
        }
        AssemblyCommand::List => {
            app.renderer()
                .render_assembly_list(&assembly_service::list(&app.store)?)?;
        }
        AssemblyCommand::Delete { name } => {
            if !app.confirm(&format!("Delete assembly {name}?"), true)? {
                app.output.info("Cancelled.");
                return Ok(ExitCode::SUCCESS);
            }
            assembly_service::delete(&app.config, &app.store, &app.platform, &reporter, &name)
                .await?;
        }
        AssemblyCommand::Start { name } => {
            let record = assembly_service::get(&app.store, &name)?;
            let pb = progress::spinner(&app.output, &format!("starting {name}..."));
            let result = assembly_service::start(&app.config, &app.platform, &record).await;
            progress::finish_clear(&pb);
            result?;
            app.output.success(&format!("assembly {name} started"));
        }
        AssemblyCommand::Stop { name } => {
            let record = assembly_service::get(&app.store, &name)?;
            assembly_service::stop(&app.config, &app.platform, &reporter, &record).await?;
            app.output.success(&format!("assembly {name} stopped"));
        }
        AssemblyCommand::Status { name } => {
            let record = assembly_service::get(&app.store, &name)?;
            let state = assembly_service::status(&app.platform, &record).await;
            app.renderer().render_assembly_status(&name, state)?;
        }
        AssemblyCommand::Escalation {
            name,
            failures,
            period,
        } => {
            let record =
                assembly_service::set_escalation(&app.store, &name, Escalation { failures, period })?;
            app.output.success(&format!(
                "assembly {name} escalation: failures={} period={}",
                fmt_opt(record.escalation.failures),
                fmt_opt(record.escalation.period),
            ));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn fmt_opt(v: Option<u32>) -> String {
    v.map_or_else(|| "unset".to_string(), |v| v.to_string())
}
