//! Application service: assembly use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{
    CloudProvider, CollectionStore, GlanceImage, GuestCustomizer, Hypervisor, ImageBuilder,
    LocalFs, NovaSession, ProgressReporter,
};
use crate::application::services::jeos_service;
use crate::domain::assembly::{self, GUEST_IFCFG, GUEST_PERSISTENT_NET_RULES};
use crate::domain::error::{AssemblyError, DomainXmlError, StoreError};
use crate::domain::{
    Assembly, AssemblyState, Collection, CollectionKind, Escalation, Infrastructure, PcloudConfig,
    openstack, validate_name, xml,
};

/// Domain definition of an assembly.
#[must_use]
pub fn domain_xml_path(cfg: &PcloudConfig, name: &str) -> PathBuf {
    cfg.assemblies_dir().join(format!("{name}.xml"))
}

/// Customization template of an assembly.
#[must_use]
pub fn tdl_path(cfg: &PcloudConfig, name: &str) -> PathBuf {
    cfg.assemblies_dir().join(format!("{name}.tdl"))
}

/// Load one assembly from an already-loaded collection.
///
/// # Errors
///
/// Returns `AssemblyError::NotFound` if there is no such entry.
pub fn from_collection(assemblies: &Collection, name: &str) -> Result<Assembly> {
    let el = assemblies
        .get(name)
        .ok_or_else(|| AssemblyError::NotFound(name.to_string()))?;
    Ok(Assembly::from_element(el)?)
}

/// Load one assembly.
pub fn get(store: &impl CollectionStore, name: &str) -> Result<Assembly> {
    from_collection(&store.load(CollectionKind::Assemblies)?, name)
}

/// Every assembly in store order.
pub fn list(store: &impl CollectionStore) -> Result<Vec<Assembly>> {
    let assemblies = store.load(CollectionKind::Assemblies)?;
    assemblies
        .names()
        .iter()
        .map(|n| from_collection(&assemblies, n))
        .collect()
}

/// Write an assembly back, replacing its previous entry.
pub fn save(store: &impl CollectionStore, assembly: &Assembly) -> Result<()> {
    let mut assemblies = store.load(CollectionKind::Assemblies)?;
    assemblies.upsert(assembly.to_element());
    store.save(&assemblies)
}

/// Create an assembly from a JEOS and customize it with
/// `<dbdir>/assemblies/<name>.tdl`.
///
/// # Errors
///
/// Returns an error if the template or the JEOS is missing, or cloning
/// fails. A failed clone leaves no entry behind.
pub async fn create(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    platform: &(impl ImageBuilder + GuestCustomizer),
    reporter: &impl ProgressReporter,
    name: &str,
    jeos_id: &str,
) -> Result<Assembly> {
    validate_name("assembly", name)?;
    validate_name("jeos", jeos_id)?;
    let tdl = tdl_path(cfg, name);
    if !fs.exists(&tdl) {
        return Err(AssemblyError::MissingTdl {
            name: name.to_string(),
            path: tdl,
        }
        .into());
    }
    let jeos_xml = jeos_service::domain_xml_for(cfg, store, jeos_id)?;
    if !fs.exists(&jeos_xml) {
        return Err(AssemblyError::MissingJeos(jeos_id.to_string()).into());
    }

    let mut assemblies = store.load(CollectionKind::Assemblies)?;
    let mut record = match assemblies.get(name) {
        Some(el) => Assembly::from_element(el)?,
        None => Assembly::new(name),
    };
    let dest_xml = domain_xml_path(cfg, name);
    if let Err(e) = clone_from(cfg, fs, platform, reporter, &mut record, &jeos_xml, &dest_xml).await
    {
        if assemblies.remove(name).is_ok() {
            store.save(&assemblies)?;
        }
        return Err(e.context(format!("cloning {jeos_id} into {name}")));
    }

    reporter.step(&format!("customizing {name} with oz-customize..."));
    let status = platform.oz_customize(&tdl, &dest_xml).await?;
    if !status.success() {
        reporter.warn(&format!("oz-customize exited with {status}"));
    }
    normalize_domain_xml(fs, &dest_xml)?;

    assemblies.upsert(record.to_element());
    store.save(&assemblies)?;
    reporter.success(&format!("assembly {name} created from {jeos_id}"));
    Ok(record)
}

/// Clone an existing assembly under a new name.
///
/// # Errors
///
/// Returns `AssemblyError::NotFound` if the source is missing or has never
/// been built.
pub async fn clone(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    guest: &impl GuestCustomizer,
    reporter: &impl ProgressReporter,
    source: &str,
    dest: &str,
) -> Result<Assembly> {
    validate_name("assembly", dest)?;
    let mut assemblies = store.load(CollectionKind::Assemblies)?;
    let src = from_collection(&assemblies, source)?;
    if src.uuid.is_none() {
        return Err(AssemblyError::NotFound(source.to_string()).into());
    }
    let mut record = match assemblies.get(dest) {
        Some(el) => Assembly::from_element(el)?,
        None => Assembly::new(dest),
    };
    let dest_xml = domain_xml_path(cfg, dest);
    clone_from(
        cfg,
        fs,
        guest,
        reporter,
        &mut record,
        &domain_xml_path(cfg, source),
        &dest_xml,
    )
    .await?;
    normalize_domain_xml(fs, &dest_xml)?;

    assemblies.upsert(record.to_element());
    store.save(&assemblies)?;
    reporter.success(&format!("assembly {dest} cloned from {source}"));
    Ok(record)
}

/// Copy a domain and its disk under `record`'s name, then reset the guest's
/// network identity to the new MAC.
async fn clone_from(
    cfg: &PcloudConfig,
    fs: &impl LocalFs,
    guest: &impl GuestCustomizer,
    reporter: &impl ProgressReporter,
    record: &mut Assembly,
    source_xml: &Path,
    dest_xml: &Path,
) -> Result<()> {
    let text = fs.read_to_string(source_xml)?;
    let domain = xml::parse(&text).with_context(|| format!("parsing {}", source_xml.display()))?;
    let source_disk = assembly::domain_disk(&domain)
        .map(PathBuf::from)
        .ok_or(DomainXmlError::MissingElement("source"))?;
    let ext = source_disk
        .extension()
        .map_or_else(|| "dsk".to_string(), |e| e.to_string_lossy().into_owned());
    let dest_disk = cfg.images_dir.join(format!("{}.{ext}", record.name));

    reporter.step(&format!(
        "copying {} to {}",
        source_disk.display(),
        dest_disk.display()
    ));
    fs.copy_file(&source_disk, &dest_disk)?;

    let mac = assembly::random_mac();
    let uuid = assembly::new_domain_uuid();
    let cloned = assembly::clone_domain(
        &domain,
        &record.name,
        &dest_disk.to_string_lossy(),
        &uuid,
        &mac,
    )?;
    if let Some(parent) = dest_xml.parent() {
        fs.create_dir_all(parent)?;
    }
    fs.write(dest_xml, xml::to_pretty_string(&cloned)?)?;

    reporter.step("resetting guest network identity...");
    let ifcfg = guest.guest_download(&dest_disk, GUEST_IFCFG).await?;
    guest
        .guest_upload(&dest_disk, GUEST_IFCFG, &assembly::rewrite_hwaddr(&ifcfg, &mac))
        .await?;
    guest
        .guest_remove(&dest_disk, GUEST_PERSISTENT_NET_RULES)
        .await?;

    tracing::debug!(assembly = %record.name, %uuid, %mac, "domain cloned");
    record.uuid = Some(uuid);
    record.image = Some(dest_disk.to_string_lossy().into_owned());
    Ok(())
}

/// Re-serialize a domain definition in canonical indented form.
fn normalize_domain_xml(fs: &impl LocalFs, path: &Path) -> Result<()> {
    let text = fs.read_to_string(path)?;
    let normalized = xml::normalize(&text).with_context(|| format!("normalizing {}", path.display()))?;
    fs.write(path, normalized)
}

/// Stop an assembly (best effort) and forget it.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if there is no such assembly.
pub async fn delete(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    platform: &(impl Hypervisor + CloudProvider),
    reporter: &impl ProgressReporter,
    name: &str,
) -> Result<()> {
    let mut assemblies = store.load(CollectionKind::Assemblies)?;
    let Some(el) = assemblies.get(name) else {
        return Err(StoreError::NotFound {
            singular: CollectionKind::Assemblies.singular(),
            name: name.to_string(),
        }
        .into());
    };
    let record = Assembly::from_element(el)?;
    if let Err(e) = stop(cfg, platform, reporter, &record).await {
        reporter.warn(&format!("could not stop {name}: {e:#}"));
    }
    if record.infrastructure == Infrastructure::Openstack {
        deregister_from_glance(platform, reporter, &record).await;
    }
    assemblies.remove(name)?;
    store.save(&assemblies)?;
    reporter.success(&format!("assembly {name} deleted"));
    Ok(())
}

/// Attach an assembly to a deployable under the deployable's backend.
///
/// For openstack the assembly image is also registered with glance.
pub async fn register(
    store: &impl CollectionStore,
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    name: &str,
    infrastructure: Infrastructure,
    deployment: &str,
    username: &str,
) -> Result<Assembly> {
    let mut record = get(store, name)?;
    record.infrastructure = infrastructure;
    record.deployment = Some(deployment.to_string());
    record.username = Some(username.to_string());
    save(store, &record)?;
    tracing::debug!(assembly = %name, %infrastructure, %deployment, "assembly registered");
    if infrastructure == Infrastructure::Openstack {
        register_with_glance(cloud, reporter, &record).await;
    }
    Ok(record)
}

/// Remove the assembly image from glance. Failures are reported, not raised.
async fn deregister_from_glance(
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    record: &Assembly,
) {
    reporter.step("deregistering assembly image from glance...");
    let result = async {
        let index = cloud.glance_index().await?;
        let Some(id) = openstack::find_glance_image(&index, &record.name) else {
            reporter.warn(&format!("no glance image registered for {}", record.name));
            return Ok(());
        };
        cloud.glance_delete(&id).await?;
        reporter.success(&format!("deleted glance image {} ({id})", record.name));
        anyhow::Ok(())
    }
    .await;
    if let Err(e) = result {
        reporter.warn(&format!("failed to remove image from glance: {e:#}"));
    }
}

/// Register the assembly image with glance unless it is already there.
/// Failures are reported, not raised.
async fn register_with_glance(
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    record: &Assembly,
) {
    reporter.step("registering assembly image with glance...");
    let result = async {
        let index = cloud.glance_index().await?;
        if let Some(id) = openstack::find_glance_image(&index, &record.name) {
            reporter.warn(&format!("image already in glance: {} > {id}", record.name));
            return Ok(());
        }
        let image = record
            .image
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("assembly {} has no disk image", record.name))?;
        let reply = cloud
            .glance_add(GlanceImage {
                name: &record.name,
                location: Path::new(image),
                owner: record.username.as_deref().unwrap_or_default(),
            })
            .await?;
        reporter.success(&format!("added image {}: {}", record.name, reply.trim()));
        anyhow::Ok(())
    }
    .await;
    if let Err(e) = result {
        reporter.warn(&format!("failed to add image to glance: {e:#}"));
    }
}

fn nova_keydir(cfg: &PcloudConfig, record: &Assembly) -> Result<PathBuf> {
    let deployment = record.deployment.as_deref().ok_or_else(|| {
        anyhow::anyhow!(
            "assembly {} is not part of a deployable; add it to one first",
            record.name
        )
    })?;
    Ok(openstack::keydir(&cfg.dbdir, deployment))
}

/// Start the assembly's VM on its backend.
pub async fn start(
    cfg: &PcloudConfig,
    platform: &(impl Hypervisor + CloudProvider),
    record: &Assembly,
) -> Result<()> {
    tracing::info!(assembly = %record.name, infrastructure = %record.infrastructure, "starting");
    match record.infrastructure {
        Infrastructure::Libvirt => {
            platform
                .domain_create(&domain_xml_path(cfg, &record.name))
                .await
        }
        Infrastructure::Openstack => {
            let keydir = nova_keydir(cfg, record)?;
            let session = NovaSession {
                keydir: &keydir,
                user: record.username.as_deref().unwrap_or("root"),
            };
            platform.run_instance(session, &record.name).await
        }
    }
}

/// Stop the assembly's VM. Stopping a VM that is not running succeeds.
pub async fn stop(
    cfg: &PcloudConfig,
    platform: &(impl Hypervisor + CloudProvider),
    reporter: &impl ProgressReporter,
    record: &Assembly,
) -> Result<()> {
    tracing::info!(assembly = %record.name, infrastructure = %record.infrastructure, "stopping");
    match record.infrastructure {
        Infrastructure::Libvirt => platform.domain_destroy(&record.name).await,
        Infrastructure::Openstack => {
            let keydir = nova_keydir(cfg, record)?;
            let session = NovaSession {
                keydir: &keydir,
                user: record.username.as_deref().unwrap_or("root"),
            };
            let images = platform.describe_images(session).await?;
            let Some(ami) = openstack::find_ami(&images, &record.name) else {
                reporter.warn(&format!("no AMI registered for {}", record.name));
                return Ok(());
            };
            let instances = platform.describe_instances(session).await?;
            let Some(instance) = openstack::find_instance(&instances, &ami) else {
                reporter.warn(&format!("no instance of {} ({ami}) is running", record.name));
                return Ok(());
            };
            tracing::info!(assembly = %record.name, %ami, %instance, "terminating");
            platform.terminate_instance(session, &instance).await
        }
    }
}

/// Raw backend state: `Undefined` when libvirt does not know the domain,
/// `Error` when the query itself fails.
pub async fn state(platform: &impl Hypervisor, record: &Assembly) -> AssemblyState {
    match record.infrastructure {
        Infrastructure::Libvirt => match platform.domain_state(&record.name).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(assembly = %record.name, error = %e, "domain state query failed");
                AssemblyState::Error
            }
        },
        Infrastructure::Openstack => AssemblyState::Unknown,
    }
}

/// State of a single assembly; an undefined domain reads as stopped.
pub async fn status(platform: &impl Hypervisor, record: &Assembly) -> AssemblyState {
    match state(platform, record).await {
        AssemblyState::Undefined => AssemblyState::Stopped,
        s => s,
    }
}

/// Update the escalation thresholds given; `None` keeps the current value.
pub fn set_escalation(
    store: &impl CollectionStore,
    name: &str,
    escalation: Escalation,
) -> Result<Assembly> {
    let mut record = get(store, name)?;
    if escalation.failures.is_some() {
        record.escalation.failures = escalation.failures;
    }
    if escalation.period.is_some() {
        record.escalation.period = escalation.period;
    }
    save(store, &record)?;
    Ok(record)
}
