//! Deployable records and the policy engine configuration they generate.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use xmltree::Element;

use crate::domain::assembly::{Assembly, Infrastructure};
use crate::domain::error::{AssemblyError, DeployableError};
use crate::domain::xml;

/// Username recorded when a stored deployable has none.
pub const FALLBACK_USERNAME: &str = "nobody";

/// Username used for new deployables unless one is given.
pub const DEFAULT_USERNAME: &str = "root";

/// How the policy engine watches a deployable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    #[default]
    Active,
    Passive,
}

impl MonitorMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Passive => "passive",
        }
    }
}

impl fmt::Display for MonitorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MonitorMode {
    type Err = DeployableError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "passive" => Ok(Self::Passive),
            other => Err(DeployableError::UnknownMonitor(other.to_string())),
        }
    }
}

/// A named group of assemblies, as stored in `db_deployable.xml`.
#[derive(Debug, Clone, Serialize)]
pub struct Deployable {
    pub name: String,
    pub infrastructure: Infrastructure,
    pub username: String,
    pub monitor: MonitorMode,
    pub assemblies: Vec<String>,
}

impl Deployable {
    #[must_use]
    pub fn new(name: &str, infrastructure: Infrastructure, username: &str, monitor: MonitorMode) -> Self {
        Self {
            name: name.to_string(),
            infrastructure,
            username: username.to_string(),
            monitor,
            assemblies: Vec::new(),
        }
    }

    /// Load from a collection entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the infrastructure or monitor attribute holds an
    /// unknown value.
    pub fn from_element(el: &Element) -> anyhow::Result<Self> {
        let infrastructure = xml::attr(el, "infrastructure")
            .map(str::parse::<Infrastructure>)
            .transpose()?
            .unwrap_or_default();
        let monitor = xml::attr(el, "monitor")
            .map(str::parse::<MonitorMode>)
            .transpose()?
            .unwrap_or_default();
        let mut assemblies: Vec<String> = Vec::new();
        for name in xml::children_named(el, "assembly").filter_map(|a| xml::attr(a, "name")) {
            if !assemblies.iter().any(|n| n == name) {
                assemblies.push(name.to_string());
            }
        }
        Ok(Self {
            name: xml::attr(el, "name").unwrap_or_default().to_string(),
            username: xml::attr(el, "username")
                .unwrap_or(FALLBACK_USERNAME)
                .to_string(),
            infrastructure,
            monitor,
            assemblies,
        })
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = xml::element_with_attrs(
            "deployable",
            &[
                ("name", self.name.as_str()),
                ("infrastructure", self.infrastructure.as_str()),
                ("username", self.username.as_str()),
                ("monitor", self.monitor.as_str()),
            ],
        );
        for a in &self.assemblies {
            xml::push_child(&mut el, xml::element_with_attrs("assembly", &[("name", a.as_str())]));
        }
        el
    }

    #[must_use]
    pub fn contains(&self, assembly: &str) -> bool {
        self.assemblies.iter().any(|a| a == assembly)
    }

    /// Append an assembly reference.
    ///
    /// # Errors
    ///
    /// Returns `DeployableError::AssemblyAlreadyMember` on a duplicate.
    pub fn add_assembly(&mut self, assembly: &str) -> Result<(), DeployableError> {
        if self.contains(assembly) {
            return Err(DeployableError::AssemblyAlreadyMember {
                deployable: self.name.clone(),
                assembly: assembly.to_string(),
            });
        }
        self.assemblies.push(assembly.to_string());
        Ok(())
    }

    /// Drop an assembly reference.
    ///
    /// # Errors
    ///
    /// Returns `DeployableError::AssemblyNotMember` if it is not referenced.
    pub fn remove_assembly(&mut self, assembly: &str) -> Result<(), DeployableError> {
        if !self.contains(assembly) {
            return Err(DeployableError::AssemblyNotMember {
                deployable: self.name.clone(),
                assembly: assembly.to_string(),
            });
        }
        self.assemblies.retain(|a| a != assembly);
        Ok(())
    }

    /// Identifier the policy engine knows this deployable by.
    #[must_use]
    pub fn uuid(&self) -> &str {
        &self.name
    }

    /// Build the document the policy engine loads for this deployable.
    ///
    /// `members` must hold the referenced assemblies in reference order.
    ///
    /// # Errors
    ///
    /// Returns `AssemblyError::NotFound` if a referenced assembly is missing
    /// from `members`.
    pub fn generate_config(&self, members: &[Assembly]) -> Result<Element, AssemblyError> {
        let mut root = xml::element_with_attrs(
            "deployable",
            &[
                ("name", self.name.as_str()),
                ("uuid", self.uuid()),
                ("monitor", self.monitor.as_str()),
                ("username", self.username.as_str()),
            ],
        );
        let mut assemblies = Element::new("assemblies");
        for name in &self.assemblies {
            let a = members
                .iter()
                .find(|m| &m.name == name)
                .ok_or_else(|| AssemblyError::NotFound(name.clone()))?;
            xml::push_child(&mut assemblies, assembly_config(a));
        }
        xml::push_child(&mut root, assemblies);
        xml::push_child(&mut root, Element::new("constraints"));
        Ok(root)
    }
}

// The policy engine's schema spells these "paramaters"/"paramater".
fn assembly_config(a: &Assembly) -> Element {
    let mut el = xml::element_with_attrs(
        "assembly",
        &[
            ("name", a.name.as_str()),
            ("uuid", a.uuid.as_deref().unwrap_or_default()),
        ],
    );
    a.escalation.write(&mut el);
    let mut services = Element::new("services");
    for r in &a.resources {
        let mut srv = xml::element_with_attrs(
            "service",
            &[
                ("name", r.name.as_str()),
                ("class", r.class.as_str()),
                ("type", r.kind.as_str()),
                ("monitor_interval", r.monitor_interval.as_str()),
            ],
        );
        xml::set_opt_attr(&mut srv, "provider", r.provider.as_deref());
        r.escalation.write(&mut srv);
        if !r.params.is_empty() {
            let mut ps = Element::new("paramaters");
            for (k, v) in &r.params {
                xml::push_child(
                    &mut ps,
                    xml::element_with_attrs("paramater", &[("name", k.as_str()), ("value", v.as_str())]),
                );
            }
            xml::push_child(&mut srv, ps);
        }
        xml::push_child(&mut services, srv);
    }
    xml::push_child(&mut el, services);
    el
}
