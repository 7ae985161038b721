/// Redis key prefixes for the pacemaker-cloud message bus
pub mod keys {
    /// Agent registry (hash)
    /// Field: agent id
    /// Value: JSON-serialized AgentInfo
    pub const AGENTS: &str = "pcloud:agents";

    /// Per-agent keys
    /// Format: pcloud:agent:{agent_id}:requests (list of JSON MethodRequest)
    /// Format: pcloud:agent:{agent_id}:heartbeat (string, expires)
    pub const AGENT: &str = "pcloud:agent";

    /// Method replies
    /// Format: pcloud:reply:{request_id}
    /// Value: list holding a single JSON-serialized MethodResponse
    pub const REPLY: &str = "pcloud:reply";

    /// Event channel (pub/sub)
    /// Payload: JSON-serialized BusEvent
    pub const EVENTS: &str = "pcloud:events";
}

/// TTL constants
pub mod ttl {
    /// Agent heartbeat key lifetime. Agents refresh well before expiry.
    pub const HEARTBEAT_SECS: u64 = 90;

    /// Unclaimed replies are dropped after this many seconds
    pub const REPLY_SECS: u64 = 60;
}

/// Agent discovery polling parameters
pub mod discovery {
    /// Attempts before giving up on finding an agent
    pub const MAX_ATTEMPTS: u32 = 50;

    /// Delay between discovery attempts
    pub const POLL_INTERVAL_MS: u64 = 100;

    /// Default time to wait for a method reply
    pub const REPLY_TIMEOUT_SECS: u64 = 30;
}

pub fn agent_requests_key(agent_id: &str) -> String {
    format!("{}:{}:requests", keys::AGENT, agent_id)
}

pub fn agent_heartbeat_key(agent_id: &str) -> String {
    format!("{}:{}:heartbeat", keys::AGENT, agent_id)
}

pub fn reply_key(request_id: &str) -> String {
    format!("{}:{}", keys::REPLY, request_id)
}

/// Validate that a request_id matches the expected format: req-[a-f0-9]{16}
/// Always call before constructing Redis keys from data read off the bus.
pub fn validate_request_id(request_id: &str) -> Result<(), &'static str> {
    if request_id.len() != 20 {
        return Err("request_id must be exactly 20 characters");
    }
    if !request_id.starts_with("req-") {
        return Err("request_id must start with 'req-'");
    }
    if !request_id[4..]
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        return Err("request_id suffix must be lowercase hex [a-f0-9]");
    }
    Ok(())
}

/// Validate an agent id: 1-64 characters of [a-z0-9-], not starting with '-'.
pub fn validate_agent_id(agent_id: &str) -> Result<(), &'static str> {
    if agent_id.is_empty() || agent_id.len() > 64 {
        return Err("agent id must be 1-64 characters");
    }
    if agent_id.starts_with('-') {
        return Err("agent id must not start with '-'");
    }
    if !agent_id
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("agent id must match [a-z0-9-]");
    }
    Ok(())
}
