//! `pcloudsh jeos`: base image templates.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::jeos_service;

/// JEOS subcommands.
#[derive(Subcommand)]
pub enum JeosCommand {
    /// Install a JEOS from `<dbdir>/jeos/<name>-<arch>-jeos.tdl`
    Create {
        /// Operating system name (e.g. F16)
        name: String,
        /// Architecture (e.g. x86_64)
        arch: String,
    },
    /// List installed JEOS images
    List,
    /// Forget a JEOS (image files are kept)
    Delete { name: String, arch: String },
}

/// Run a jeos command.
///
/// # Errors
///
/// Returns an error if the underlying service fails.
pub async fn run(app: &AppContext, cmd: JeosCommand) -> Result<ExitCode> {
    match cmd {
        JeosCommand::Create { name, arch } => {
            jeos_service::create(
                &app.config,
                &app.store,
                &app.fs,
                &app.platform,
                &app.reporter(),
                &name,
                &arch,
            )
            .await?;
        }
        JeosCommand::List => {
            app.renderer()
                .render_jeos_list(&jeos_service::list(&app.store)?)?;
        }
        JeosCommand::Delete { name, arch } => {
            jeos_service::delete(&app.store, &name, &arch)?;
            app.output.success(&format!("jeos {name}-{arch} deleted"));
        }
    }
    Ok(ExitCode::SUCCESS)
}
