//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `pcloud_common`: never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};

use anyhow::Result;
use pcloud_common::{BusEvent, Method};

use crate::domain::{AssemblyState, Collection, CollectionKind, CpeError, PcloudConfig};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Credentials context for running euca2ools as a deployable's user.
#[derive(Debug, Clone, Copy)]
pub struct NovaSession<'a> {
    /// Directory holding `novarc` and the key pair.
    pub keydir: &'a Path,
    /// Local user the commands run as.
    pub user: &'a str,
}

/// Image registration request for glance.
#[derive(Debug, Clone, Copy)]
pub struct GlanceImage<'a> {
    pub name: &'a str,
    /// Local disk image path, registered as a `file://` location.
    pub location: &'a Path,
    pub owner: &'a str,
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: std::time::Duration,
    ) -> Result<Output>;
    /// Run a program with inherited stdio and return only its exit status.
    async fn run_status(&self, program: &str, args: &[&str]) -> Result<ExitStatus>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Synchronous; no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

// ── Persistence Ports ─────────────────────────────────────────────────────────

/// Loads and saves whole XML collections.
pub trait CollectionStore {
    /// Load a collection; a missing or unparsable file yields an empty one.
    fn load(&self, kind: CollectionKind) -> Result<Collection>;
    /// Replace the collection file with `collection`.
    fn save(&self, collection: &Collection) -> Result<()>;
}

/// Abstracts configuration persistence.
pub trait ConfigStore {
    /// Load configuration, falling back to defaults when no file exists.
    fn load(&self) -> Result<PcloudConfig>;
    /// Persist configuration.
    fn save(&self, config: &PcloudConfig) -> Result<()>;
    /// Location of the configuration file.
    fn path(&self) -> Result<PathBuf>;
}

/// Raw local filesystem operations.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn write(&self, path: &Path, content: String) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    /// Copy a file, preserving permissions.
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()>;
}

// ── VM Platform Ports ─────────────────────────────────────────────────────────

/// libvirt domain lifecycle.
#[allow(async_fn_in_trait)]
pub trait Hypervisor {
    /// Start a transient domain from its definition file.
    async fn domain_create(&self, xml_path: &Path) -> Result<()>;
    /// Destroy a running domain. A domain that does not exist is already
    /// stopped and is not an error.
    async fn domain_destroy(&self, name: &str) -> Result<()>;
    /// `Running`, `Stopped`, or `Undefined` when libvirt does not know it.
    async fn domain_state(&self, name: &str) -> Result<AssemblyState>;
}

/// File access inside a guest disk image.
#[allow(async_fn_in_trait)]
pub trait GuestCustomizer {
    /// Read a guest file.
    async fn guest_download(&self, disk: &Path, guest_path: &str) -> Result<String>;
    /// Replace a guest file.
    async fn guest_upload(&self, disk: &Path, guest_path: &str, content: &str) -> Result<()>;
    /// Delete a guest file; a missing file is not an error.
    async fn guest_remove(&self, disk: &Path, guest_path: &str) -> Result<()>;
}

/// Image building tools.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// `oz-install` a template, writing the domain definition to `xml`.
    async fn oz_install(&self, tdl: &Path, xml: &Path) -> Result<ExitStatus>;
    /// `oz-customize` an installed domain with a template.
    async fn oz_customize(&self, tdl: &Path, xml: &Path) -> Result<ExitStatus>;
    /// Convert a raw disk to qcow2.
    async fn convert_to_qcow2(&self, from: &Path, to: &Path) -> Result<ExitStatus>;
}

/// Openstack (nova + glance) operations.
#[allow(async_fn_in_trait)]
pub trait CloudProvider {
    /// Launch an instance from the image registered under `image`.
    async fn run_instance(&self, session: NovaSession<'_>, image: &str) -> Result<()>;
    /// Raw `euca-describe-images` output.
    async fn describe_images(&self, session: NovaSession<'_>) -> Result<String>;
    /// Raw `euca-describe-instances` output.
    async fn describe_instances(&self, session: NovaSession<'_>) -> Result<String>;
    async fn terminate_instance(&self, session: NovaSession<'_>, instance: &str) -> Result<()>;
    /// Raw `glance index` output.
    async fn glance_index(&self) -> Result<String>;
    /// Register an image, returning glance's reply.
    async fn glance_add(&self, image: GlanceImage<'_>) -> Result<String>;
    async fn glance_delete(&self, image_id: &str) -> Result<()>;
    /// Create the nova project for a deployable and unpack its credentials
    /// and key pair under `project_dir`. The caller creates the credentials
    /// directory first.
    async fn project_create(&self, project: &str, user: &str, project_dir: &Path) -> Result<()>;
    async fn project_delete(&self, project: &str) -> Result<()>;
}

/// Composite trait: any type implementing all four sub-traits is a `VmPlatform`.
pub trait VmPlatform: Hypervisor + GuestCustomizer + ImageBuilder + CloudProvider {}

/// Blanket implementation: any type implementing all four sub-traits is a `VmPlatform`.
impl<T> VmPlatform for T where T: Hypervisor + GuestCustomizer + ImageBuilder + CloudProvider {}

// ── Messaging Ports ───────────────────────────────────────────────────────────

/// The Cloud Policy Engine reached over the message bus.
#[allow(async_fn_in_trait)]
pub trait PolicyEngine {
    /// Invoke a deployable method and collapse the reply into a return code.
    ///
    /// # Errors
    ///
    /// Only `CpeError::AgentNotFound`; every other failure is a non-zero
    /// return code.
    async fn invoke(&self, method: Method, name: &str, uuid: &str) -> Result<i64, CpeError>;
}

/// Stream of bus events.
#[allow(async_fn_in_trait)]
pub trait EventSource {
    /// Next event, or `None` once the stream ends.
    async fn next_event(&mut self) -> Result<Option<BusEvent>>;
}
