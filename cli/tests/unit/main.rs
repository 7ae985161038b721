//! Unit tests for pcloudsh
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod assembly_service;
mod deployable_service;
mod jeos_service;
mod property_tests;
