//! `PolicyEngine` over the Redis message bus.
//!
//! The engine is found through the agent registry hash, then called by
//! pushing a `MethodRequest` onto its request list and blocking on the
//! reply list named in the request. Registry entries whose heartbeat key
//! has expired belong to dead daemons and are skipped.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use pcloud_common::{
    AgentInfo, Method, MethodOutcome, MethodRequest, MethodResponse, agent_heartbeat_key,
    agent_requests_key, discovery, keys, validate_agent_id,
};
use redis::aio::MultiplexedConnection;

use crate::application::ports::PolicyEngine;
use crate::domain::CpeError;

/// Message-bus client for the Cloud Policy Engine.
pub struct BusCpeClient {
    client: redis::Client,
    reply_timeout: Duration,
    poll_interval: Duration,
    max_attempts: u32,
}

impl BusCpeClient {
    /// Create a client for the bus at `url`. No connection is made yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("failed to create bus client")?;
        Ok(Self {
            client,
            reply_timeout: Duration::from_secs(discovery::REPLY_TIMEOUT_SECS),
            poll_interval: Duration::from_millis(discovery::POLL_INTERVAL_MS),
            max_attempts: discovery::MAX_ATTEMPTS,
        })
    }

    /// Override discovery polling.
    #[must_use]
    pub fn with_discovery(mut self, max_attempts: u32, poll_interval: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.poll_interval = poll_interval;
        self
    }

    /// Override how long to block for a reply. Rounded down to whole
    /// seconds, at least one.
    #[must_use]
    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    fn reply_timeout_secs(&self) -> u64 {
        self.reply_timeout.as_secs().max(1)
    }

    async fn agents(&self) -> Result<(MultiplexedConnection, HashMap<String, String>)> {
        let mut con = self
            .client
            .get_multiplexed_async_connection()
            .await
            .context("failed to connect to the message bus")?;
        let agents: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(keys::AGENTS)
            .query_async(&mut con)
            .await
            .context("failed to read agent registry")?;
        Ok((con, agents))
    }

    /// First registered CPE whose heartbeat key is still present.
    async fn live_cpe(&self) -> Result<Option<(MultiplexedConnection, String)>> {
        let (mut con, agents) = self.agents().await?;
        let candidates = cpe_candidates(&agents);
        if candidates.is_empty() {
            tracing::debug!(agents = agents.len(), "no policy engine registered");
        }
        for id in candidates {
            let alive: bool = redis::cmd("EXISTS")
                .arg(agent_heartbeat_key(&id))
                .query_async(&mut con)
                .await
                .context("failed to check agent heartbeat")?;
            if alive {
                return Ok(Some((con, id)));
            }
            tracing::debug!(agent = %id, "skipping agent with expired heartbeat");
        }
        Ok(None)
    }

    /// Poll the registry until a live CPE shows up.
    async fn discover(&self) -> Result<(MultiplexedConnection, String), CpeError> {
        for attempt in 1..=self.max_attempts {
            match self.live_cpe().await {
                Ok(Some((con, id))) => {
                    tracing::debug!(agent = %id, attempt, "found policy engine");
                    return Ok((con, id));
                }
                Ok(None) => {}
                Err(e) => tracing::debug!(attempt, error = %e, "discovery attempt failed"),
            }
            if attempt < self.max_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Err(CpeError::AgentNotFound {
            attempts: self.max_attempts,
        })
    }

    async fn call(
        &self,
        con: &mut MultiplexedConnection,
        agent_id: &str,
        request: &MethodRequest,
    ) -> Result<MethodResponse> {
        let payload = serde_json::to_string(request).context("failed to encode request")?;
        let _: i64 = redis::cmd("RPUSH")
            .arg(agent_requests_key(agent_id))
            .arg(payload)
            .query_async(con)
            .await
            .context("failed to send request")?;

        let reply: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(&request.reply_to)
            .arg(self.reply_timeout_secs())
            .query_async(con)
            .await
            .context("failed to wait for reply")?;
        let (_, body) = reply.ok_or_else(|| {
            anyhow::anyhow!(
                "no reply to {} within {}s",
                request.method,
                self.reply_timeout_secs()
            )
        })?;
        let response: MethodResponse =
            serde_json::from_str(&body).context("failed to decode reply")?;
        if response.request_id != request.request_id {
            anyhow::bail!(
                "reply for {} does not match request {}",
                response.request_id,
                request.request_id
            );
        }
        Ok(response)
    }
}

/// Ids of registered Cloud Policy Engines, in id order.
pub(crate) fn cpe_candidates(agents: &HashMap<String, String>) -> Vec<String> {
    let mut ids: Vec<String> = agents
        .values()
        .filter_map(|raw| serde_json::from_str::<AgentInfo>(raw).ok())
        .filter(|a| a.is_cpe() && validate_agent_id(&a.id).is_ok())
        .map(|a| a.id)
        .collect();
    ids.sort();
    ids
}

/// Fresh request id in the `req-<16 hex>` wire format.
pub(crate) fn new_request_id() -> String {
    format!("req-{:016x}", rand::random::<u64>())
}

impl PolicyEngine for BusCpeClient {
    async fn invoke(&self, method: Method, name: &str, uuid: &str) -> Result<i64, CpeError> {
        let (mut con, agent_id) = self.discover().await?;
        let request = MethodRequest::deployable(method, new_request_id(), name, uuid);
        tracing::info!(%method, name, agent = %agent_id, request_id = %request.request_id, "calling policy engine");

        match self.call(&mut con, &agent_id, &request).await {
            Ok(response) => {
                if let MethodOutcome::Exception { message } = &response.outcome {
                    tracing::warn!(%method, name, %message, "policy engine raised");
                }
                Ok(response.return_code())
            }
            Err(e) => {
                tracing::warn!(%method, name, error = %format!("{e:#}"), "policy engine call failed");
                Ok(1)
            }
        }
    }
}
