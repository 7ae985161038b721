//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod assembly;
pub mod collection;
pub mod config;
pub mod deployable;
pub mod error;
pub mod jeos;
pub mod name;
pub mod openstack;
pub mod resource;
pub mod xml;

pub use assembly::{Assembly, AssemblyState, Escalation, Infrastructure};
pub use collection::{Collection, CollectionKind};
pub use config::{PcloudConfig, validate_config_key, validate_config_value};
pub use deployable::{Deployable, MonitorMode};
pub use error::{
    AssemblyError, ConfigError, CpeError, DeployableError, JeosError, NameError, StoreError,
};
pub use jeos::{Jeos, JeosPaths};
pub use name::validate_name;
pub use resource::{Resource, ResourceSpec};
