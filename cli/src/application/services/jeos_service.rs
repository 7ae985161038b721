//! Application service: JEOS base image use-cases.

use anyhow::{Context, Result};

use crate::application::ports::{CollectionStore, ImageBuilder, LocalFs, ProgressReporter};
use crate::domain::error::JeosError;
use crate::domain::jeos::{self, Jeos, JeosPaths};
use crate::domain::{CollectionKind, PcloudConfig, validate_name, xml};

/// Build a JEOS image from its operator-provided template.
///
/// Steps:
/// 1. Refuse a duplicate `(name, arch)`
/// 2. `oz-install` the template
/// 3. Convert the raw disk to qcow2 and point the domain at it
/// 4. Record the JEOS
///
/// # Errors
///
/// Returns an error if the JEOS exists, the template is missing, or any
/// tool fails.
pub async fn create(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    fs: &impl LocalFs,
    builder: &impl ImageBuilder,
    reporter: &impl ProgressReporter,
    name: &str,
    arch: &str,
) -> Result<Jeos> {
    validate_name("jeos", name)?;
    validate_name("arch", arch)?;
    let mut images = store.load(CollectionKind::Jeos)?;
    if images.find(|e| Jeos::matches(e, name, arch)).is_some() {
        return Err(JeosError::AlreadyExists {
            name: name.to_string(),
            arch: arch.to_string(),
        }
        .into());
    }

    let paths = JeosPaths::new(&cfg.jeos_dir(), &cfg.images_dir, name, arch);
    if !fs.exists(&paths.tdl) {
        return Err(JeosError::MissingTdl { path: paths.tdl }.into());
    }

    reporter.step(&format!("installing {name}-{arch} with oz-install (this takes a while)..."));
    let status = builder.oz_install(&paths.tdl, &paths.xml).await?;
    if !status.success() {
        return Err(JeosError::InstallFailed {
            name: name.to_string(),
            arch: arch.to_string(),
        }
        .into());
    }

    reporter.step("converting disk image to qcow2...");
    let status = builder.convert_to_qcow2(&paths.dsk, &paths.qcow2).await?;
    if !status.success() {
        return Err(JeosError::ConvertFailed {
            name: name.to_string(),
            arch: arch.to_string(),
        }
        .into());
    }

    let text = fs.read_to_string(&paths.xml)?;
    let mut domain =
        xml::parse(&text).with_context(|| format!("parsing {}", paths.xml.display()))?;
    jeos::use_qcow2_image(&mut domain, &paths.qcow2.to_string_lossy())
        .with_context(|| format!("rewriting {}", paths.xml.display()))?;
    fs.write(&paths.xml, xml::to_pretty_string(&domain)?)?;

    let record = Jeos {
        name: name.to_string(),
        arch: arch.to_string(),
        tdl_path: paths.tdl,
        xml_path: paths.xml,
    };
    images.push(record.to_element());
    store.save(&images)?;
    reporter.success(&format!("jeos {} created", record.id()));
    Ok(record)
}

/// Every recorded JEOS in store order.
pub fn list(store: &impl CollectionStore) -> Result<Vec<Jeos>> {
    let images = store.load(CollectionKind::Jeos)?;
    Ok(images.entries().map(Jeos::from_element).collect())
}

/// Forget a JEOS. Its image files are left in place.
///
/// # Errors
///
/// Returns `JeosError::NotFound` if no such JEOS is recorded.
pub fn delete(store: &impl CollectionStore, name: &str, arch: &str) -> Result<Jeos> {
    let mut images = store.load(CollectionKind::Jeos)?;
    let removed = images
        .remove_where(|e| Jeos::matches(e, name, arch))
        .ok_or_else(|| JeosError::NotFound {
            name: name.to_string(),
            arch: arch.to_string(),
        })?;
    store.save(&images)?;
    Ok(Jeos::from_element(&removed))
}

/// Domain definition path of a JEOS identifier (`<name>-<arch>`), preferring
/// the recorded path.
pub fn domain_xml_for(
    cfg: &PcloudConfig,
    store: &impl CollectionStore,
    id: &str,
) -> Result<std::path::PathBuf> {
    let recorded = list(store)?
        .into_iter()
        .find(|j| j.id() == id)
        .map(|j| j.xml_path)
        .filter(|p| !p.as_os_str().is_empty());
    Ok(recorded.unwrap_or_else(|| JeosPaths::xml_for_id(&cfg.jeos_dir(), id)))
}
