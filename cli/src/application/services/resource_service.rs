//! Application service: resources monitored inside an assembly.

use anyhow::{Context, Result};

use crate::application::ports::{CollectionStore, LocalFs};
use crate::application::services::assembly_service;
use crate::domain::{PcloudConfig, Resource, ResourceSpec, validate_name, xml};

/// Add a resource to an assembly, or update it if it already exists.
///
/// New resources start from `<resource_templates>/<type>.xml` when that
/// template exists.
///
/// # Errors
///
/// Returns an error if the assembly does not exist or the template cannot be
/// parsed.
pub fn add(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    assembly: &str,
    spec: &ResourceSpec,
) -> Result<Resource> {
    validate_name("resource", &spec.name)?;
    if let Some(kind) = &spec.kind {
        validate_name("resource type", kind)?;
    }
    let mut record = assembly_service::get(store, assembly)?;
    if let Some(existing) = record.resource_mut(&spec.name) {
        existing.apply(spec);
    } else {
        let template = cfg
            .resource_templates
            .join(format!("{}.xml", spec.template_type()));
        let mut resource = if fs.exists(&template) {
            let text = fs.read_to_string(&template)?;
            let root = xml::parse(&text)
                .with_context(|| format!("parsing template {}", template.display()))?;
            Resource::from_template(&root, &spec.name)
        } else {
            tracing::debug!(template = %template.display(), "no resource template, using a bare resource");
            Resource::new(&spec.name)
        };
        resource.apply(spec);
        record.resources.push(resource);
    }
    assembly_service::save(store, &record)?;
    record
        .resource(&spec.name)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("resource {} vanished while saving", spec.name))
}

/// Remove a resource from an assembly.
///
/// # Errors
///
/// Returns `AssemblyError::NotFound` or `AssemblyError::ResourceNotFound`.
pub fn remove(store: &impl CollectionStore, assembly: &str, name: &str) -> Result<Resource> {
    let mut record = assembly_service::get(store, assembly)?;
    let removed = record.remove_resource(name)?;
    assembly_service::save(store, &record)?;
    Ok(removed)
}

/// Resources of an assembly in stored order.
pub fn list(store: &impl CollectionStore, assembly: &str) -> Result<Vec<Resource>> {
    Ok(assembly_service::get(store, assembly)?.resources)
}
