//! Infrastructure layer: concrete implementations of application ports.
//!
//! Modules here may import from `crate::domain` and
//! `crate::application::ports`. They must not import from `crate::commands`
//! or `crate::output`.

pub mod command_runner;
pub mod config;
pub mod cpe_client;
pub mod events;
pub mod fs;
pub mod guestfish;
pub mod openstack;
pub mod oz;
pub mod platform;
pub mod virsh;
pub mod xml_store;
