//! JEOS base image records and file layout.

use std::path::{Path, PathBuf};

use serde::Serialize;
use xmltree::Element;

use crate::domain::error::DomainXmlError;
use crate::domain::xml;

/// Where a JEOS keeps its files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JeosPaths {
    /// Operator-provided oz template.
    pub tdl: PathBuf,
    /// Domain definition written by oz-install.
    pub xml: PathBuf,
    /// Raw disk produced by oz-install.
    pub dsk: PathBuf,
    /// Converted disk the domain points at.
    pub qcow2: PathBuf,
}

impl JeosPaths {
    #[must_use]
    pub fn new(jeos_dir: &Path, images_dir: &Path, name: &str, arch: &str) -> Self {
        let stem = format!("{name}-{arch}-jeos");
        Self {
            tdl: jeos_dir.join(format!("{stem}.tdl")),
            xml: jeos_dir.join(format!("{stem}.xml")),
            dsk: images_dir.join(format!("{stem}.dsk")),
            qcow2: images_dir.join(format!("{stem}.qcow2")),
        }
    }

    /// Domain definition path for a JEOS identifier (`<name>-<arch>`).
    #[must_use]
    pub fn xml_for_id(jeos_dir: &Path, id: &str) -> PathBuf {
        jeos_dir.join(format!("{id}-jeos.xml"))
    }
}

/// A JEOS entry in `db_jeos.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Jeos {
    pub name: String,
    pub arch: String,
    pub tdl_path: PathBuf,
    pub xml_path: PathBuf,
}

impl Jeos {
    /// Identifier assemblies are created from.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}-{}", self.name, self.arch)
    }

    #[must_use]
    pub fn matches(el: &Element, name: &str, arch: &str) -> bool {
        xml::attr(el, "name") == Some(name) && xml::attr(el, "arch") == Some(arch)
    }

    #[must_use]
    pub fn from_element(el: &Element) -> Self {
        let path = |k| PathBuf::from(xml::attr(el, k).unwrap_or_default());
        Self {
            name: xml::attr(el, "name").unwrap_or_default().to_string(),
            arch: xml::attr(el, "arch").unwrap_or_default().to_string(),
            tdl_path: path("tdl_path"),
            xml_path: path("xml_path"),
        }
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let tdl = self.tdl_path.to_string_lossy();
        let xml_path = self.xml_path.to_string_lossy();
        xml::element_with_attrs(
            "jeos",
            &[
                ("name", self.name.as_str()),
                ("arch", self.arch.as_str()),
                ("tdl_path", tdl.as_ref()),
                ("xml_path", xml_path.as_ref()),
            ],
        )
    }
}

/// Point a domain at its qcow2 image: add `<driver type="qcow2"/>` to the
/// first disk and set `disk/source@file`.
///
/// # Errors
///
/// Returns an error if the domain has no disk or disk source.
pub fn use_qcow2_image(domain: &mut Element, qcow2: &str) -> Result<(), DomainXmlError> {
    let disk = xml::descend_mut(domain, &["devices", "disk"])
        .ok_or(DomainXmlError::MissingElement("disk"))?;
    match disk.get_mut_child("driver") {
        Some(driver) => {
            driver.attributes.insert("type".to_string(), "qcow2".to_string());
        }
        None => xml::push_child(disk, xml::element_with_attrs("driver", &[("type", "qcow2")])),
    }
    let source = disk
        .get_mut_child("source")
        .ok_or(DomainXmlError::MissingElement("source"))?;
    source.attributes.insert("file".to_string(), qcow2.to_string());
    Ok(())
}
