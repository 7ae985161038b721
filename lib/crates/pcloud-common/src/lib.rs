pub mod config;
pub mod redis_keys;
pub mod types;

pub use config::CpedServerConfig;
pub use redis_keys::{
    agent_heartbeat_key, agent_requests_key, discovery, keys, reply_key, ttl, validate_agent_id,
    validate_request_id,
};
pub use types::*;
