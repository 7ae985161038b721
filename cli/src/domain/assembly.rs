//! Assembly records and the pure parts of cloning a libvirt domain.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use xmltree::Element;

use crate::domain::error::{AssemblyError, DomainXmlError};
use crate::domain::resource::Resource;
use crate::domain::xml;

/// Guest file holding the primary NIC configuration.
pub const GUEST_IFCFG: &str = "/etc/sysconfig/network-scripts/ifcfg-eth0";

/// Guest udev rule pinning NIC names to MAC addresses.
pub const GUEST_PERSISTENT_NET_RULES: &str = "/etc/udev/rules.d/70-persistent-net.rules";

// ── Infrastructure ───────────────────────────────────────────────────────────

/// Backend an assembly runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Infrastructure {
    #[default]
    Libvirt,
    Openstack,
}

impl Infrastructure {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Libvirt => "libvirt",
            Self::Openstack => "openstack",
        }
    }
}

impl fmt::Display for Infrastructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Infrastructure {
    type Err = AssemblyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "libvirt" => Ok(Self::Libvirt),
            "openstack" => Ok(Self::Openstack),
            other => Err(AssemblyError::UnknownInfrastructure(other.to_string())),
        }
    }
}

// ── Escalation ───────────────────────────────────────────────────────────────

/// Recovery escalation thresholds; `None` disables escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Escalation {
    #[serde(rename = "escalation_failures", skip_serializing_if = "Option::is_none")]
    pub failures: Option<u32>,
    #[serde(rename = "escalation_period", skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
}

impl Escalation {
    /// Read `escalation_failures` / `escalation_period`; unparsable values
    /// count as unset.
    #[must_use]
    pub fn read(el: &Element) -> Self {
        let num = |k| xml::attr(el, k).and_then(|v| v.trim().parse().ok());
        Self {
            failures: num("escalation_failures"),
            period: num("escalation_period"),
        }
    }

    pub fn write(&self, el: &mut Element) {
        xml::set_opt_attr(
            el,
            "escalation_failures",
            self.failures.map(|v| v.to_string()).as_deref(),
        );
        xml::set_opt_attr(
            el,
            "escalation_period",
            self.period.map(|v| v.to_string()).as_deref(),
        );
    }
}

// ── Runtime state ────────────────────────────────────────────────────────────

/// Observed state of an assembly's VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AssemblyState {
    Running,
    Stopped,
    Undefined,
    Error,
    Unknown,
}

impl fmt::Display for AssemblyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Running => "Running",
            Self::Stopped => "Stopped",
            Self::Undefined => "Undefined",
            Self::Error => "Error",
            Self::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

// ── Record ───────────────────────────────────────────────────────────────────

/// A managed VM as stored in `db_assemblies.xml`.
#[derive(Debug, Clone, Serialize)]
pub struct Assembly {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    pub infrastructure: Infrastructure,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub escalation: Escalation,
    pub resources: Vec<Resource>,
}

impl Assembly {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: None,
            infrastructure: Infrastructure::Libvirt,
            deployment: None,
            username: None,
            image: None,
            escalation: Escalation::default(),
            resources: Vec::new(),
        }
    }

    /// Load from a collection entry. A missing `infrastructure` loads as
    /// libvirt with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if `infrastructure` names an unsupported backend.
    pub fn from_element(el: &Element) -> Result<Self, AssemblyError> {
        let name = xml::attr(el, "name").unwrap_or_default().to_string();
        let infrastructure = match xml::attr(el, "infrastructure") {
            Some(i) => i.parse()?,
            None => {
                tracing::warn!(assembly = %name, "no infrastructure recorded, loading as libvirt");
                Infrastructure::Libvirt
            }
        };
        let non_empty = |k| {
            xml::attr(el, k)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let resources = xml::descend(el, &["resources"])
            .map(|rs| {
                xml::children_named(rs, "resource")
                    .map(Resource::from_element)
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            uuid: non_empty("uuid"),
            deployment: non_empty("deployment"),
            username: non_empty("username"),
            image: non_empty("image"),
            escalation: Escalation::read(el),
            infrastructure,
            resources,
            name,
        })
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = xml::element_with_attrs(
            "assembly",
            &[
                ("name", self.name.as_str()),
                ("infrastructure", self.infrastructure.as_str()),
            ],
        );
        xml::set_opt_attr(&mut el, "uuid", self.uuid.as_deref());
        xml::set_opt_attr(&mut el, "deployment", self.deployment.as_deref());
        xml::set_opt_attr(&mut el, "username", self.username.as_deref());
        xml::set_opt_attr(&mut el, "image", self.image.as_deref());
        self.escalation.write(&mut el);
        let mut resources = Element::new("resources");
        for r in &self.resources {
            xml::push_child(&mut resources, r.to_element());
        }
        xml::push_child(&mut el, resources);
        el
    }

    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.iter_mut().find(|r| r.name == name)
    }

    /// Remove a resource by name.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::ResourceNotFound` if there is no such resource.
    pub fn remove_resource(&mut self, name: &str) -> Result<Resource, AssemblyError> {
        let idx = self
            .resources
            .iter()
            .position(|r| r.name == name)
            .ok_or_else(|| AssemblyError::ResourceNotFound {
                assembly: self.name.clone(),
                resource: name.to_string(),
            })?;
        Ok(self.resources.remove(idx))
    }
}

// ── Domain cloning ───────────────────────────────────────────────────────────

/// Format a locally administered KVM MAC from its last three octets.
#[must_use]
pub fn format_mac(tail: [u8; 3]) -> String {
    format!("52:54:00:{:02x}:{:02x}:{:02x}", tail[0], tail[1], tail[2])
}

/// A fresh random `52:54:00:xx:xx:xx` MAC.
#[must_use]
pub fn random_mac() -> String {
    format_mac(rand::random::<[u8; 3]>())
}

/// A fresh libvirt UUID in compact hex form.
#[must_use]
pub fn new_domain_uuid() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Disk image path of a domain (`devices/disk/source@file`).
#[must_use]
pub fn domain_disk(domain: &Element) -> Option<&str> {
    xml::descend(domain, &["devices", "disk", "source"]).and_then(|s| xml::attr(s, "file"))
}

/// Copy a domain definition under a new identity.
///
/// Sets the name, uuid, disk source and the first interface's MAC address.
///
/// # Errors
///
/// Returns an error if the source lacks any of those elements.
pub fn clone_domain(
    source: &Element,
    name: &str,
    disk: &str,
    uuid: &str,
    mac: &str,
) -> Result<Element, DomainXmlError> {
    let mut dom = source.clone();
    let name_el = dom
        .get_mut_child("name")
        .ok_or(DomainXmlError::MissingElement("name"))?;
    xml::set_text(name_el, name);
    // Definitions produced by oz always carry a uuid, hand-written ones may not.
    if dom.get_child("uuid").is_none() {
        xml::push_child(&mut dom, Element::new("uuid"));
    }
    if let Some(uuid_el) = dom.get_mut_child("uuid") {
        xml::set_text(uuid_el, uuid);
    }
    let source_el = xml::descend_mut(&mut dom, &["devices", "disk", "source"])
        .ok_or(DomainXmlError::MissingElement("source"))?;
    source_el.attributes.insert("file".to_string(), disk.to_string());
    let mac_el = xml::descend_mut(&mut dom, &["devices", "interface", "mac"])
        .ok_or(DomainXmlError::MissingElement("mac"))?;
    mac_el.attributes.insert("address".to_string(), mac.to_string());
    Ok(dom)
}

/// Rewrite every line mentioning `HWADDR` to `HWADDR="<mac>"`.
#[must_use]
pub fn rewrite_hwaddr(ifcfg: &str, mac: &str) -> String {
    let mut out: String = ifcfg
        .lines()
        .map(|line| {
            if line.contains("HWADDR") {
                format!("HWADDR=\"{mac}\"")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if ifcfg.ends_with('\n') {
        out.push('\n');
    }
    out
}
