//! `pcloudsh events`: print agent events until interrupted.

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::event_service;
use crate::infra::events::BusEventSource;

/// Follow the event channel until Ctrl-C or the bus closes it.
///
/// # Errors
///
/// Returns an error if the bus is unreachable.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let mut source = BusEventSource::connect(&app.config.bus_url).await?;
    app.output.info("listening for events (Ctrl-C to stop)");
    let renderer = app.renderer();

    let delivered = tokio::select! {
        result = event_service::follow(&mut source, |ev| {
            if let Err(e) = renderer.render_event(ev) {
                tracing::warn!(error = %e, "cannot print event");
            }
        }) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::debug!("interrupted");
            return Ok(ExitCode::SUCCESS);
        }
    };
    tracing::info!(delivered, "event stream closed");
    Ok(ExitCode::SUCCESS)
}
