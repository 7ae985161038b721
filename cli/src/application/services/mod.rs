//! Application services: use-case orchestration.
//!
//! Each service module implements a single use-case by composing domain logic
//! with port trait calls. Services import only from `crate::domain` and
//! `crate::application::ports`: never from `crate::infra`, `crate::commands`,
//! or `crate::output`.

pub mod assembly_service;
pub mod config_service;
pub mod deployable_service;
pub mod event_service;
pub mod jeos_service;
pub mod resource_service;
