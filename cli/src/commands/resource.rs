//! `pcloudsh resource`: services monitored inside an assembly.

use std::collections::BTreeMap;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Args, Subcommand};

use crate::app::AppContext;
use crate::application::services::resource_service;
use crate::domain::{Escalation, ResourceSpec};

/// Resource subcommands.
#[derive(Subcommand)]
pub enum ResourceCommand {
    /// Add a resource to an assembly, or update an existing one
    Add(AddArgs),
    /// Remove a resource from an assembly
    Remove { assembly: String, name: String },
    /// List an assembly's resources
    List { assembly: String },
}

/// Arguments for `resource add`.
#[derive(Args)]
pub struct AddArgs {
    pub assembly: String,
    pub name: String,
    /// Resource type; also selects the template `<resource_templates>/<type>.xml`
    #[arg(long = "type")]
    pub kind: Option<String>,
    #[arg(long)]
    pub class: Option<String>,
    #[arg(long)]
    pub provider: Option<String>,
    /// Monitor interval (e.g. `60s`)
    #[arg(long)]
    pub monitor_interval: Option<String>,
    #[arg(long)]
    pub escalation_failures: Option<u32>,
    #[arg(long)]
    pub escalation_period: Option<u32>,
    /// Resource parameter, repeatable
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
    pub params: Vec<(String, String)>,
}

impl AddArgs {
    fn into_spec(self) -> ResourceSpec {
        ResourceSpec {
            name: self.name,
            kind: self.kind,
            class: self.class,
            provider: self.provider,
            monitor_interval: self.monitor_interval,
            escalation: Escalation {
                failures: self.escalation_failures,
                period: self.escalation_period,
            },
            params: self.params.into_iter().collect::<BTreeMap<_, _>>(),
        }
    }
}

/// Parse a `key=value` pair.
fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.is_empty() => Ok((k.to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{s}'")),
    }
}

/// Run a resource command.
///
/// # Errors
///
/// Returns an error if the underlying service fails.
pub fn run(app: &AppContext, cmd: ResourceCommand) -> Result<ExitCode> {
    match cmd {
        ResourceCommand::Add(args) => {
            let assembly = args.assembly.clone();
            let spec = args.into_spec();
            let resource = resource_service::add(&app.config, &app.store, &app.fs, &assembly, &spec)?;
            app.output.success(&format!(
                "resource {} ({}) saved on {assembly}",
                resource.name, resource.kind
            ));
        }
        ResourceCommand::Remove { assembly, name } => {
            resource_service::remove(&app.store, &assembly, &name)?;
            app.output
                .success(&format!("resource {name} removed from {assembly}"));
        }
        ResourceCommand::List { assembly } => {
            app.renderer()
                .render_resource_list(&resource_service::list(&app.store, &assembly)?)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}
