//! Domain types and validators for pcloud configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "dbdir",
    "images_dir",
    "run_dir",
    "libvirt_uri",
    "bus_url",
    "resource_templates",
    "glance.host",
    "glance.port",
];

/// Environment variable overriding `dbdir` after the file is loaded.
pub const DBDIR_ENV: &str = "PCLOUD_DBDIR";

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.pcloud/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcloudConfig {
    /// Schema version stamped on every XML collection as `pcmkc-version`.
    pub version: String,
    /// Directory holding the XML collections and per-entity files.
    pub dbdir: PathBuf,
    /// Directory holding VM disk images.
    pub images_dir: PathBuf,
    /// Directory receiving generated deployable configs.
    pub run_dir: PathBuf,
    /// libvirt connection URI passed to `virsh -c`.
    pub libvirt_uri: String,
    /// Message bus URL.
    pub bus_url: String,
    /// Directory of `<type>.xml` resource templates.
    pub resource_templates: PathBuf,
    /// Glance image registry endpoint.
    pub glance: GlanceConfig,
}

/// Glance endpoint used when registering openstack images.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GlanceConfig {
    pub host: String,
    pub port: u16,
}

impl Default for GlanceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9292,
        }
    }
}

impl Default for PcloudConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            dbdir: PathBuf::from("/var/lib/pacemaker-cloud"),
            images_dir: PathBuf::from("/var/lib/libvirt/images"),
            run_dir: PathBuf::from("/var/run"),
            libvirt_uri: "qemu:///system".to_string(),
            bus_url: "redis://127.0.0.1:6379".to_string(),
            resource_templates: PathBuf::from("/usr/share/pacemaker-cloud/resource_templates"),
            glance: GlanceConfig::default(),
        }
    }
}

impl PcloudConfig {
    /// Directory holding per-assembly domain XML and TDL files.
    #[must_use]
    pub fn assemblies_dir(&self) -> PathBuf {
        self.dbdir.join("assemblies")
    }

    /// Directory holding JEOS TDL and domain XML files.
    #[must_use]
    pub fn jeos_dir(&self) -> PathBuf {
        self.dbdir.join("jeos")
    }

    /// Apply a validated `key = value` assignment.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value is invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "dbdir" => self.dbdir = PathBuf::from(value),
            "images_dir" => self.images_dir = PathBuf::from(value),
            "run_dir" => self.run_dir = PathBuf::from(value),
            "libvirt_uri" => self.libvirt_uri = value.to_string(),
            "bus_url" => self.bus_url = value.to_string(),
            "resource_templates" => self.resource_templates = PathBuf::from(value),
            "glance.host" => self.glance.host = value.to_string(),
            "glance.port" => self.glance.port = parse_port(key, value)?,
            _ => anyhow::bail!("Unknown setting: {key}"),
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |reason: &str| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    };
    match key {
        "dbdir" | "images_dir" | "run_dir" | "resource_templates" => {
            if !value.starts_with('/') {
                return Err(invalid("Expected an absolute path").into());
            }
        }
        "bus_url" => {
            if !(value.starts_with("redis://") || value.starts_with("rediss://")) {
                return Err(invalid("Expected a redis:// or rediss:// URL").into());
            }
        }
        "libvirt_uri" | "glance.host" => {
            if value.trim().is_empty() {
                return Err(invalid("Value must not be empty").into());
            }
        }
        "glance.port" => {
            parse_port(key, value)?;
        }
        _ => {}
    }
    Ok(())
}

fn parse_port(key: &str, value: &str) -> Result<u16> {
    match value.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "Expected a port number between 1 and 65535".to_string(),
        }
        .into()),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
