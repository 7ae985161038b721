//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use thiserror::Error;

// ── Store errors ──────────────────────────────────────────────────────────────

/// Errors raised by the XML collection store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{singular} \"{name}\" does not exist")]
    NotFound { singular: &'static str, name: String },

    #[error("cannot serialize {file}: {reason}")]
    Serialize { file: &'static str, reason: String },
}

// ── Name errors ───────────────────────────────────────────────────────────────

/// A user-supplied name that is unsafe to use as a path segment or argument.
#[derive(Debug, Error)]
pub enum NameError {
    #[error(
        "Invalid {kind} name '{name}': must match ^[A-Za-z0-9][A-Za-z0-9._-]{{0,63}}$"
    )]
    Invalid { kind: &'static str, name: String },
}

// ── Domain XML errors ─────────────────────────────────────────────────────────

/// A libvirt domain document lacks an element we need to rewrite.
#[derive(Debug, Error)]
pub enum DomainXmlError {
    #[error("domain XML has no <{0}> element")]
    MissingElement(&'static str),
}

// ── Assembly errors ───────────────────────────────────────────────────────────

/// Errors related to assemblies and their resources.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("The assembly \"{0}\" does not exist in the system")]
    NotFound(String),

    #[error("Please provide {} to customize your assembly", path.display())]
    MissingTdl { name: String, path: PathBuf },

    #[error("Please create the \"{0}\" jeos first")]
    MissingJeos(String),

    #[error("Resource \"{resource}\" does not exist in assembly \"{assembly}\"")]
    ResourceNotFound { assembly: String, resource: String },

    #[error("Unknown infrastructure \"{0}\" (expected libvirt or openstack)")]
    UnknownInfrastructure(String),
}

// ── Deployable errors ─────────────────────────────────────────────────────────

/// Errors related to deployables.
#[derive(Debug, Error)]
pub enum DeployableError {
    #[error("Deployable \"{0}\" already exists")]
    AlreadyExists(String),

    #[error("Assembly \"{assembly}\" is already in deployable \"{deployable}\"")]
    AssemblyAlreadyMember { deployable: String, assembly: String },

    #[error("Assembly \"{assembly}\" is not in deployable \"{deployable}\"")]
    AssemblyNotMember { deployable: String, assembly: String },

    #[error("Unknown monitor mode \"{0}\" (expected active or passive)")]
    UnknownMonitor(String),

    #[error("Failed to {op} deployable \"{name}\" (rc {rc})")]
    CpeFailed { op: &'static str, name: String, rc: i64 },
}

// ── JEOS errors ───────────────────────────────────────────────────────────────

/// Errors related to JEOS base images.
#[derive(Debug, Error)]
pub enum JeosError {
    #[error("jeos \"{name}\" for arch \"{arch}\" already exists")]
    AlreadyExists { name: String, arch: String },

    #[error("jeos \"{name}\" for arch \"{arch}\" does not exist")]
    NotFound { name: String, arch: String },

    #[error("Please provide {} to install the jeos", path.display())]
    MissingTdl { path: PathBuf },

    #[error("oz-install failed for {name}-{arch}")]
    InstallFailed { name: String, arch: String },

    #[error("qemu-img convert failed for {name}-{arch}")]
    ConvertFailed { name: String, arch: String },
}

// ── Policy engine errors ──────────────────────────────────────────────────────

/// Errors talking to the Cloud Policy Engine.
///
/// Transport failures, timeouts and exceptions are not errors: they collapse
/// into a non-zero return code. Only a missing agent is reported here.
#[derive(Debug, Error)]
pub enum CpeError {
    #[error("Cloud Policy Engine agent not found after {attempts} attempts. Is pcloud-cped running?")]
    AgentNotFound { attempts: u32 },
}

impl CpeError {
    /// Process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::AgentNotFound { .. } => 3,
        }
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}
