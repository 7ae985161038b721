use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Vendor string every pacemaker-cloud agent advertises.
pub const VENDOR: &str = "pacemakercloud.org";

/// Schema package shared by all agents.
pub const PACKAGE: &str = "org.pacemakercloud";

/// Class name of the Cloud Policy Engine agent.
pub const CPE_CLASS: &str = "cpe";

/// Registry entry describing an agent attached to the bus
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub vendor: String,
    pub product: String,
    pub package: String,
    pub class: String,
}

impl AgentInfo {
    /// True when this agent is a Cloud Policy Engine from our vendor.
    #[must_use]
    pub fn is_cpe(&self) -> bool {
        self.vendor.contains(VENDOR) && self.package == PACKAGE && self.class == CPE_CLASS
    }
}

/// Methods exposed by the Cloud Policy Engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    DeployableStart,
    DeployableStop,
    DeployableReload,
    DeployableList,
}

impl Method {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeployableStart => "deployable_start",
            Self::DeployableStop => "deployable_stop",
            Self::DeployableReload => "deployable_reload",
            Self::DeployableList => "deployable_list",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deployable_start" => Ok(Self::DeployableStart),
            "deployable_stop" => Ok(Self::DeployableStop),
            "deployable_reload" => Ok(Self::DeployableReload),
            "deployable_list" => Ok(Self::DeployableList),
            other => Err(format!("unknown method: {other}")),
        }
    }
}

/// A method call pushed onto an agent's request list.
///
/// `method` stays a plain string on the wire so an agent can answer calls it
/// does not know with an exception instead of failing to decode them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodRequest {
    pub request_id: String,
    pub method: String,
    #[serde(default)]
    pub args: BTreeMap<String, String>,
    pub reply_to: String,
}

impl MethodRequest {
    /// Build a deployable lifecycle call carrying `name` and `uuid` arguments.
    #[must_use]
    pub fn deployable(method: Method, request_id: String, name: &str, uuid: &str) -> Self {
        let mut args = BTreeMap::new();
        args.insert("name".to_string(), name.to_string());
        args.insert("uuid".to_string(), uuid.to_string());
        let reply_to = crate::redis_keys::reply_key(&request_id);
        Self {
            request_id,
            method: method.as_str().to_string(),
            args,
            reply_to,
        }
    }
}

/// Outcome of a method call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Success {
        #[serde(default)]
        values: BTreeMap<String, serde_json::Value>,
    },
    Exception {
        message: String,
    },
}

/// Reply pushed onto the caller's `reply_to` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub request_id: String,
    #[serde(flatten)]
    pub outcome: MethodOutcome,
}

impl MethodResponse {
    #[must_use]
    pub fn success(request_id: &str, rc: i64) -> Self {
        let mut values = BTreeMap::new();
        values.insert("rc".to_string(), serde_json::Value::from(rc));
        Self {
            request_id: request_id.to_string(),
            outcome: MethodOutcome::Success { values },
        }
    }

    #[must_use]
    pub fn exception(request_id: &str, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.to_string(),
            outcome: MethodOutcome::Exception {
                message: message.into(),
            },
        }
    }

    /// Collapse the reply into a single return code.
    ///
    /// Exceptions map to `1`. A successful call returns its `rc` value, or the
    /// first value in the map when there is no `rc`. Non-integer values map
    /// to `1`; an empty result map means `0`.
    #[must_use]
    pub fn return_code(&self) -> i64 {
        match &self.outcome {
            MethodOutcome::Exception { .. } => 1,
            MethodOutcome::Success { values } => values
                .get("rc")
                .or_else(|| values.values().next())
                .map_or(0, |v| v.as_i64().unwrap_or(1)),
        }
    }
}

/// Event severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Emerg,
    Alert,
    Crit,
    Error,
    Warn,
    Notice,
    #[default]
    Info,
    Debug,
}

/// Event published on the bus by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusEvent {
    pub agent: String,
    pub vendor: String,
    #[serde(default)]
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

impl BusEvent {
    /// True when the event comes from a pacemaker-cloud agent.
    #[must_use]
    pub fn from_our_vendor(&self) -> bool {
        self.vendor.contains(VENDOR)
    }
}
