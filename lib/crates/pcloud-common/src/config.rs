use serde::Deserialize;
use std::path::PathBuf;

use crate::redis_keys::{ttl, validate_agent_id};

/// CPE daemon configuration, loaded from `PCLOUD_CPED_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct CpedServerConfig {
    /// Unix socket the daemon listens on (default: /var/run/pacemaker-cloud-cped)
    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    /// Message bus connection URL
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Init job started once per deployable, as `{init_unit}@{uuid}`
    #[serde(default = "default_init_unit")]
    pub init_unit: String,

    /// Seconds between registry heartbeats. Must stay below
    /// [`ttl::HEARTBEAT_SECS`] or the heartbeat key lapses between refreshes.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,

    /// Id this daemon registers under on the bus
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/var/run/pacemaker-cloud-cped")
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_init_unit() -> String {
    "pcloud-dped".to_string()
}

fn default_heartbeat_secs() -> u64 {
    30
}

fn default_agent_id() -> String {
    "cped".to_string()
}

impl Default for CpedServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            redis_url: default_redis_url(),
            init_unit: default_init_unit(),
            heartbeat_secs: default_heartbeat_secs(),
            agent_id: default_agent_id(),
        }
    }
}

impl CpedServerConfig {
    /// Reject settings the daemon cannot run with.
    ///
    /// # Errors
    ///
    /// Returns a message naming the offending setting.
    pub fn validate(&self) -> Result<(), &'static str> {
        validate_agent_id(&self.agent_id)?;
        if self.heartbeat_secs == 0 {
            return Err("heartbeat_secs must be at least 1");
        }
        if self.heartbeat_secs >= ttl::HEARTBEAT_SECS {
            return Err("heartbeat_secs must be below the 90s heartbeat key lifetime");
        }
        Ok(())
    }
}
