//! JSON output helpers.
//!
//! `JsonRenderer` prints machine-readable documents for list and status
//! commands; `format_error` builds the error object every `--json` code path
//! prints when a command fails.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;

use crate::domain::{Assembly, AssemblyState, Deployable, Jeos, PcloudConfig, Resource};

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("JSON serialization failed")?
    );
    Ok(())
}

/// Renders domain types as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// Render JEOS images.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_jeos_list(&self, images: &[Jeos]) -> Result<()> {
        let rows: Vec<_> = images
            .iter()
            .map(|j| {
                json!({
                    "id": j.id(),
                    "name": j.name,
                    "arch": j.arch,
                    "tdl_path": j.tdl_path,
                    "xml_path": j.xml_path,
                })
            })
            .collect();
        print(&rows)
    }

    /// Render assemblies.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_assembly_list(&self, assemblies: &[Assembly]) -> Result<()> {
        print(assemblies)
    }

    /// Render the state of a single assembly.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_assembly_status(&self, name: &str, state: AssemblyState) -> Result<()> {
        print(&json!({ "assembly": name, "state": state }))
    }

    /// Render an assembly's resources.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_resource_list(&self, resources: &[Resource]) -> Result<()> {
        print(resources)
    }

    /// Render deployables.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_deployable_list(&self, deployables: &[Deployable]) -> Result<()> {
        print(deployables)
    }

    /// Render a deployable's member assemblies.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_member_list(&self, deployable: &str, members: &[String]) -> Result<()> {
        print(&json!({ "deployable": deployable, "assemblies": members }))
    }

    /// Render the per-assembly state of a deployable.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_deployable_status(
        &self,
        deployable: &str,
        rows: &[(String, AssemblyState)],
    ) -> Result<()> {
        let assemblies: Vec<_> = rows
            .iter()
            .map(|(name, state)| json!({ "assembly": name, "state": state }))
            .collect();
        print(&json!({ "deployable": deployable, "assemblies": assemblies }))
    }

    /// Render the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_config(&self, config: &PcloudConfig, path: &std::path::Path) -> Result<()> {
        print(&json!({ "path": path, "config": config }))
    }

    /// Render version information.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_version(&self, version: &str) -> Result<()> {
        print(&json!({ "version": version }))
    }

    /// Render a bus event as a single line, so a stream of them stays
    /// line-delimited.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render_event(&self, event: &pcloud_common::BusEvent) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string(event).context("JSON serialization failed")?
        );
        Ok(())
    }
}
