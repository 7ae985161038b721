//! Bus state wrapping a `deadpool-redis` connection pool.
//!
//! Every registry, request, reply and event operation the daemon performs
//! goes through `BusState`.

use anyhow::{Context, Result};
use deadpool_redis::redis;
use deadpool_redis::{Config, Pool, Runtime};

use pcloud_common::{
    agent_heartbeat_key, agent_requests_key, keys, ttl, AgentInfo, BusEvent, MethodRequest,
    MethodResponse,
};

/// Default connection-pool size.
const DEFAULT_POOL_SIZE: usize = 4;

/// Shared handle on the message bus.
#[derive(Clone)]
pub struct BusState {
    pool: Pool,
}

impl BusState {
    /// Build the pool and verify connectivity with a `PING`.
    ///
    /// # Errors
    /// Returns an error if the pool cannot be created or the PING fails.
    pub async fn new(redis_url: &str) -> Result<Self> {
        let mut cfg = Config::from_url(redis_url);
        cfg.pool = Some(deadpool_redis::PoolConfig {
            max_size: DEFAULT_POOL_SIZE,
            ..Default::default()
        });
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .context("failed to create bus connection pool")?;

        let mut conn = pool
            .get()
            .await
            .context("failed to get bus connection for startup PING")?;
        redis::cmd("PING")
            .query_async::<String>(&mut conn)
            .await
            .context("bus startup PING failed; is the bus reachable?")?;

        tracing::info!("bus connection pool ready (size={DEFAULT_POOL_SIZE})");
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<deadpool_redis::Connection> {
        self.pool
            .get()
            .await
            .context("pool: failed to get connection")
    }

    /// Add the agent to the registry and start its heartbeat.
    ///
    /// Requests left on the agent's list by a previous run are discarded
    /// first; their callers have long since timed out.
    pub async fn register(&self, info: &AgentInfo) -> Result<()> {
        let json = serde_json::to_string(info).context("failed to serialize AgentInfo")?;
        let mut conn = self.conn().await?;
        redis::pipe()
            .cmd("DEL")
            .arg(agent_requests_key(&info.id))
            .ignore()
            .cmd("HSET")
            .arg(keys::AGENTS)
            .arg(&info.id)
            .arg(json)
            .ignore()
            .cmd("SET")
            .arg(agent_heartbeat_key(&info.id))
            .arg("alive")
            .arg("EX")
            .arg(ttl::HEARTBEAT_SECS)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .context("failed to register agent")?;
        tracing::info!(agent = %info.id, "registered on bus");
        Ok(())
    }

    /// Refresh the heartbeat key.
    pub async fn heartbeat(&self, agent_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::cmd("SET")
            .arg(agent_heartbeat_key(agent_id))
            .arg("alive")
            .arg("EX")
            .arg(ttl::HEARTBEAT_SECS)
            .query_async::<()>(&mut conn)
            .await
            .context("heartbeat SET failed")
    }

    /// Remove the agent from the registry.
    pub async fn deregister(&self, agent_id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        redis::pipe()
            .cmd("HDEL")
            .arg(keys::AGENTS)
            .arg(agent_id)
            .ignore()
            .cmd("DEL")
            .arg(agent_heartbeat_key(agent_id))
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .context("failed to deregister agent")?;
        tracing::info!(agent = %agent_id, "deregistered from bus");
        Ok(())
    }

    /// Pop the next pending request, if any.
    ///
    /// Undecodable entries are dropped with a warning.
    pub async fn pop_request(&self, agent_id: &str) -> Result<Option<MethodRequest>> {
        let mut conn = self.conn().await?;
        let raw: Option<String> = redis::cmd("LPOP")
            .arg(agent_requests_key(agent_id))
            .query_async(&mut conn)
            .await
            .context("LPOP failed for request list")?;
        Ok(raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(req) => Some(req),
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed request");
                None
            }
        }))
    }

    /// Push a reply onto `reply_to`; unclaimed replies expire.
    pub async fn reply(&self, reply_to: &str, response: &MethodResponse) -> Result<()> {
        let json = serde_json::to_string(response).context("failed to serialize reply")?;
        let mut conn = self.conn().await?;
        redis::pipe()
            .cmd("RPUSH")
            .arg(reply_to)
            .arg(json)
            .ignore()
            .cmd("EXPIRE")
            .arg(reply_to)
            .arg(ttl::REPLY_SECS)
            .ignore()
            .query_async::<()>(&mut conn)
            .await
            .context("failed to push reply")
    }

    /// Publish an event on the event channel.
    pub async fn publish(&self, event: &BusEvent) -> Result<()> {
        let json = serde_json::to_string(event).context("failed to serialize event")?;
        let mut conn = self.conn().await?;
        redis::cmd("PUBLISH")
            .arg(keys::EVENTS)
            .arg(json)
            .query_async::<i64>(&mut conn)
            .await
            .context("PUBLISH failed")?;
        Ok(())
    }
}
