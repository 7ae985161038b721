//! Application service: deployable use-cases.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! All I/O is routed through injected port traits.

use std::path::PathBuf;

use anyhow::Result;
use pcloud_common::Method;

use crate::application::ports::{
    CloudProvider, CollectionStore, Hypervisor, LocalFs, PolicyEngine, ProgressReporter,
};
use crate::application::services::assembly_service;
use crate::domain::error::{AssemblyError, DeployableError, StoreError};
use crate::domain::{
    Assembly, AssemblyState, Collection, CollectionKind, Deployable, Infrastructure, MonitorMode,
    PcloudConfig, openstack, validate_name, xml,
};

fn not_found(name: &str) -> StoreError {
    StoreError::NotFound {
        singular: CollectionKind::Deployables.singular(),
        name: name.to_string(),
    }
}

fn from_collection(deployables: &Collection, name: &str) -> Result<Deployable> {
    let el = deployables.get(name).ok_or_else(|| not_found(name))?;
    Deployable::from_element(el)
}

/// Load one deployable.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if there is no such deployable.
pub fn get(store: &impl CollectionStore, name: &str) -> Result<Deployable> {
    from_collection(&store.load(CollectionKind::Deployables)?, name)
}

/// Every deployable in store order.
pub fn list(store: &impl CollectionStore) -> Result<Vec<Deployable>> {
    let deployables = store.load(CollectionKind::Deployables)?;
    deployables
        .names()
        .iter()
        .map(|n| from_collection(&deployables, n))
        .collect()
}

fn save(store: &impl CollectionStore, deployable: &Deployable) -> Result<()> {
    let mut deployables = store.load(CollectionKind::Deployables)?;
    deployables.upsert(deployable.to_element());
    store.save(&deployables)
}

/// Create a deployable, running the backend set-up first.
///
/// For openstack this creates the nova project and unpacks its credentials
/// under `<dbdir>/<name>`. Nothing is recorded if set-up fails.
///
/// `name` and `username` are checked before anything touches disk.
///
/// # Errors
///
/// Returns an error if the deployable exists or set-up fails.
#[allow(clippy::too_many_arguments)]
pub async fn create(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    name: &str,
    infrastructure: Infrastructure,
    username: &str,
    monitor: MonitorMode,
) -> Result<Deployable> {
    validate_name("deployable", name)?;
    validate_name("user", username)?;
    let mut deployables = store.load(CollectionKind::Deployables)?;
    if deployables.exists(name) {
        return Err(DeployableError::AlreadyExists(name.to_string()).into());
    }
    if infrastructure == Infrastructure::Openstack {
        reporter.step(&format!("creating nova project {name} for {username}..."));
        let project_dir = cfg.dbdir.join(name);
        fs.create_dir_all(&openstack::keydir(&cfg.dbdir, name))?;
        if let Err(e) = cloud.project_create(name, username, &project_dir).await {
            if let Err(cleanup) = fs.remove_dir_all(&project_dir) {
                tracing::warn!(error = %cleanup, "could not remove {}", project_dir.display());
            }
            return Err(e.context(format!("setting up openstack project {name}")));
        }
    }
    let record = Deployable::new(name, infrastructure, username, monitor);
    deployables.push(record.to_element());
    store.save(&deployables)?;
    reporter.success(&format!("deployable {name} created ({infrastructure})"));
    Ok(record)
}

/// Tear down backend state and forget a deployable.
///
/// # Errors
///
/// Returns `StoreError::NotFound` if there is no such deployable.
pub async fn delete(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    name: &str,
) -> Result<()> {
    let mut deployables = store.load(CollectionKind::Deployables)?;
    let record = from_collection(&deployables, name)?;
    if record.infrastructure == Infrastructure::Openstack {
        let project_dir = cfg.dbdir.join(name);
        if fs.exists(&project_dir) {
            fs.remove_dir_all(&project_dir)?;
            reporter.success("deleted nova project key and environment");
        }
        match cloud.project_delete(name).await {
            Ok(()) => reporter.success("deleted nova project"),
            Err(e) => reporter.warn(&format!("could not delete nova project {name}: {e:#}")),
        }
    }
    deployables.remove(name)?;
    store.save(&deployables)?;
    reporter.success(&format!("deployable {name} deleted"));
    Ok(())
}

/// Add an assembly to a deployable and register it under the deployable's
/// backend and user.
///
/// # Errors
///
/// Returns an error if either side is missing or the assembly is already a
/// member.
pub async fn assembly_add(
    store: &impl CollectionStore,
    cloud: &impl CloudProvider,
    reporter: &impl ProgressReporter,
    deployable: &str,
    assembly: &str,
) -> Result<Deployable> {
    validate_name("assembly", assembly)?;
    let mut record = get(store, deployable)?;
    if !store.load(CollectionKind::Assemblies)?.exists(assembly) {
        return Err(AssemblyError::NotFound(assembly.to_string()).into());
    }
    record.add_assembly(assembly)?;
    save(store, &record)?;
    assembly_service::register(
        store,
        cloud,
        reporter,
        assembly,
        record.infrastructure,
        &record.name,
        &record.username,
    )
    .await?;
    reporter.success(&format!("assembly {assembly} added to {deployable}"));
    Ok(record)
}

/// Detach an assembly from a deployable.
///
/// The assembly's `deployment` is cleared before the membership check, so a
/// stale back-reference is repaired even when the deployable never listed it.
///
/// # Errors
///
/// Returns an error if either side is missing or the assembly is not a
/// member.
pub fn assembly_remove(
    store: &impl CollectionStore,
    deployable: &str,
    assembly: &str,
) -> Result<Deployable> {
    let mut record = get(store, deployable)?;
    let mut member = assembly_service::get(store, assembly)?;
    member.deployment = None;
    assembly_service::save(store, &member)?;
    record.remove_assembly(assembly)?;
    save(store, &record)?;
    Ok(record)
}

/// Member assembly names in order.
pub fn assembly_list(store: &impl CollectionStore, deployable: &str) -> Result<Vec<String>> {
    Ok(get(store, deployable)?.assemblies)
}

fn members(store: &impl CollectionStore, record: &Deployable) -> Result<Vec<Assembly>> {
    let assemblies = store.load(CollectionKind::Assemblies)?;
    record
        .assemblies
        .iter()
        .map(|n| assembly_service::from_collection(&assemblies, n))
        .collect()
}

/// Write `<run_dir>/<name>.xml` for the policy engine.
pub fn generate_config(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    deployable: &str,
) -> Result<PathBuf> {
    let record = get(store, deployable)?;
    let doc = record.generate_config(&members(store, &record)?)?;
    let path = cfg.run_dir.join(format!("{}.xml", record.name));
    fs.write(&path, xml::to_pretty_string(&doc)?)?;
    tracing::info!(deployable = %record.name, path = %path.display(), "config generated");
    Ok(path)
}

async fn call(
    engine: &impl PolicyEngine,
    method: Method,
    op: &'static str,
    record: &Deployable,
) -> Result<()> {
    let rc = engine.invoke(method, &record.name, record.uuid()).await?;
    if rc != 0 {
        return Err(DeployableError::CpeFailed {
            op,
            name: record.name.clone(),
            rc,
        }
        .into());
    }
    Ok(())
}

/// Generate the config and ask the policy engine to start the deployable.
pub async fn start(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    engine: &impl PolicyEngine,
    reporter: &impl ProgressReporter,
    deployable: &str,
) -> Result<()> {
    reporter.step(&format!("starting deployable {deployable}..."));
    generate_config(cfg, store, fs, deployable)?;
    let record = get(store, deployable)?;
    call(engine, Method::DeployableStart, "start", &record).await?;
    reporter.success(&format!("deployable {deployable} started"));
    Ok(())
}

/// Ask the policy engine to stop the deployable.
pub async fn stop(
    store: &impl CollectionStore,
    engine: &impl PolicyEngine,
    reporter: &impl ProgressReporter,
    deployable: &str,
) -> Result<()> {
    let record = get(store, deployable)?;
    reporter.step(&format!("stopping deployable {deployable}..."));
    call(engine, Method::DeployableStop, "stop", &record).await?;
    reporter.success(&format!("deployable {deployable} stopped"));
    Ok(())
}

/// Ask the policy engine to reload the deployable's configuration.
pub async fn reload(
    store: &impl CollectionStore,
    engine: &impl PolicyEngine,
    reporter: &impl ProgressReporter,
    deployable: &str,
) -> Result<()> {
    let record = get(store, deployable)?;
    reporter.step(&format!("reloading deployable {deployable}..."));
    call(engine, Method::DeployableReload, "reload", &record).await?;
    reporter.success(&format!("deployable {deployable} reloaded"));
    Ok(())
}

/// State of every member assembly, in member order.
///
/// libvirt members report `Undefined` for unknown domains; openstack members
/// report their backend status.
pub async fn status(
    store: &impl CollectionStore,
    hypervisor: &impl Hypervisor,
    deployable: &str,
) -> Result<Vec<(String, AssemblyState)>> {
    let record = get(store, deployable)?;
    let mut rows = Vec::with_capacity(record.assemblies.len());
    for member in members(store, &record)? {
        let state = match record.infrastructure {
            Infrastructure::Libvirt => assembly_service::state(hypervisor, &member).await,
            Infrastructure::Openstack => assembly_service::status(hypervisor, &member).await,
        };
        rows.push((member.name, state));
    }
    Ok(rows)
}
