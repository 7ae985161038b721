//! Cloud Policy Engine agent: method dispatch and the request loop.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::Utc;
use pcloud_common::{
    reply_key, validate_request_id, AgentInfo, BusEvent, CpedServerConfig, Method, MethodRequest,
    MethodResponse, Severity, CPE_CLASS, PACKAGE, VENDOR,
};
use tokio::time::Instant;

use crate::init_jobs::{instance_unit, JobAction, JobRunner};
use crate::state::BusState;

/// Delay between polls of an empty request list.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Registry entry this daemon advertises.
#[must_use]
pub fn agent_info(agent_id: &str) -> AgentInfo {
    AgentInfo {
        id: agent_id.to_string(),
        vendor: VENDOR.to_string(),
        product: "cped".to_string(),
        package: PACKAGE.to_string(),
        class: CPE_CLASS.to_string(),
    }
}

/// Outcome of one method call: the reply, and an event for lifecycle calls.
pub struct Dispatched {
    pub response: MethodResponse,
    pub event: Option<BusEvent>,
}

/// Run a method request against the init system.
pub async fn dispatch(
    config: &CpedServerConfig,
    jobs: &impl JobRunner,
    request: &MethodRequest,
) -> Dispatched {
    let id = &request.request_id;
    let method = match request.method.parse::<Method>() {
        Ok(m) => m,
        Err(e) => {
            return Dispatched {
                response: MethodResponse::exception(id, e),
                event: None,
            }
        }
    };
    let action = match method {
        Method::DeployableStart => JobAction::Start,
        Method::DeployableStop => JobAction::Stop,
        Method::DeployableReload => JobAction::Reload,
        Method::DeployableList => {
            return Dispatched {
                response: MethodResponse::success(id, 0),
                event: None,
            }
        }
    };
    let (Some(name), Some(uuid)) = (request.args.get("name"), request.args.get("uuid")) else {
        return Dispatched {
            response: MethodResponse::exception(id, format!("{method} requires name and uuid")),
            event: None,
        };
    };

    let unit = instance_unit(&config.init_unit, uuid);
    let rc = match jobs.control(action, &unit).await {
        Ok(code) => i64::from(code),
        Err(e) => {
            tracing::warn!(%unit, error = %e, "init job control failed");
            1
        }
    };
    tracing::info!(%method, deployable = %name, %unit, rc, "dispatched");

    let mut properties = BTreeMap::new();
    properties.insert("deployable".to_string(), name.clone());
    properties.insert("uuid".to_string(), uuid.clone());
    properties.insert("action".to_string(), action.as_str().to_string());
    properties.insert("rc".to_string(), rc.to_string());
    let event = BusEvent {
        agent: config.agent_id.clone(),
        vendor: VENDOR.to_string(),
        severity: if rc == 0 { Severity::Info } else { Severity::Error },
        timestamp: Utc::now(),
        properties,
    };

    Dispatched {
        response: MethodResponse::success(id, rc),
        event: Some(event),
    }
}

/// True when the request's reply list is the one derived from its id.
#[must_use]
pub fn reply_target_ok(request: &MethodRequest) -> bool {
    validate_request_id(&request.request_id).is_ok()
        && request.reply_to == reply_key(&request.request_id)
}

async fn handle(state: &BusState, config: &CpedServerConfig, jobs: &impl JobRunner, request: MethodRequest) {
    if !reply_target_ok(&request) {
        tracing::warn!(request_id = %request.request_id, reply_to = %request.reply_to, "dropping request with invalid reply target");
        return;
    }
    let out = dispatch(config, jobs, &request).await;
    if let Err(e) = state.reply(&request.reply_to, &out.response).await {
        tracing::warn!(request_id = %request.request_id, error = %e, "reply failed");
    }
    if let Some(event) = out.event {
        if let Err(e) = state.publish(&event).await {
            tracing::warn!(error = %e, "event publish failed");
        }
    }
}

/// Serve requests until the future is dropped, refreshing the heartbeat.
///
/// A popped request is always handled to completion before the heartbeat
/// is checked again, so no request is lost between the two.
pub async fn run(state: &BusState, config: &CpedServerConfig, jobs: &impl JobRunner) {
    let period = Duration::from_secs(config.heartbeat_secs.max(1));
    let mut last_beat = Instant::now();
    loop {
        if last_beat.elapsed() >= period {
            if let Err(e) = state.heartbeat(&config.agent_id).await {
                tracing::warn!(error = %e, "heartbeat failed");
            }
            last_beat = Instant::now();
        }
        match state.pop_request(&config.agent_id).await {
            Ok(Some(request)) => handle(state, config, jobs, request).await,
            Ok(None) => tokio::time::sleep(POLL_INTERVAL).await,
            Err(e) => {
                tracing::warn!(error = %e, "request poll failed");
                tokio::time::sleep(POLL_INTERVAL * 10).await;
            }
        }
    }
}
