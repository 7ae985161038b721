//! Command implementations

pub mod assembly;
pub mod config;
pub mod deployable;
pub mod events;
pub mod jeos;
pub mod resource;
pub mod version;
