//! Services monitored inside an assembly.

use std::collections::BTreeMap;

use serde::Serialize;
use xmltree::Element;

use crate::domain::assembly::Escalation;
use crate::domain::xml;

pub const DEFAULT_TYPE: &str = "http";
pub const DEFAULT_CLASS: &str = "lsb";
pub const DEFAULT_MONITOR_INTERVAL: &str = "60s";

/// A monitored service.
///
/// `base` is the element the resource was loaded from (or its template), so
/// attributes and children this type does not model survive a save.
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub class: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub monitor_interval: String,
    #[serde(flatten)]
    pub escalation: Escalation,
    pub params: BTreeMap<String, String>,
    #[serde(skip)]
    base: Element,
}

/// Fields supplied by `resource add`; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ResourceSpec {
    pub name: String,
    pub kind: Option<String>,
    pub class: Option<String>,
    pub provider: Option<String>,
    pub monitor_interval: Option<String>,
    pub escalation: Escalation,
    pub params: BTreeMap<String, String>,
}

impl ResourceSpec {
    /// Template type this spec resolves to for a new resource.
    #[must_use]
    pub fn template_type(&self) -> &str {
        self.kind.as_deref().unwrap_or(DEFAULT_TYPE)
    }
}

impl Resource {
    /// A bare resource with default type, class and interval.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self::from_element(&xml::element_with_attrs("resource", &[("name", name)]))
    }

    /// A new resource seeded from a template root element.
    #[must_use]
    pub fn from_template(template: &Element, name: &str) -> Self {
        let mut base = template.clone();
        base.name = "resource".to_string();
        base.attributes.insert("name".to_string(), name.to_string());
        Self::from_element(&base)
    }

    #[must_use]
    pub fn from_element(el: &Element) -> Self {
        let params = xml::descend(el, &["parameters"])
            .map(|ps| {
                xml::children_named(ps, "parameter")
                    .filter_map(|p| {
                        Some((
                            xml::attr(p, "name")?.to_string(),
                            xml::attr(p, "value").unwrap_or_default().to_string(),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self {
            name: xml::attr(el, "name").unwrap_or_default().to_string(),
            kind: xml::attr(el, "type").unwrap_or(DEFAULT_TYPE).to_string(),
            class: xml::attr(el, "class").unwrap_or(DEFAULT_CLASS).to_string(),
            provider: xml::attr(el, "provider").map(str::to_string),
            monitor_interval: xml::attr(el, "monitor_interval")
                .unwrap_or(DEFAULT_MONITOR_INTERVAL)
                .to_string(),
            escalation: Escalation::read(el),
            params,
            base: el.clone(),
        }
    }

    /// Overwrite fields given in `spec`; params are merged.
    pub fn apply(&mut self, spec: &ResourceSpec) {
        if let Some(kind) = &spec.kind {
            self.kind.clone_from(kind);
        }
        if let Some(class) = &spec.class {
            self.class.clone_from(class);
        }
        if spec.provider.is_some() {
            self.provider.clone_from(&spec.provider);
        }
        if let Some(interval) = &spec.monitor_interval {
            self.monitor_interval.clone_from(interval);
        }
        if spec.escalation.failures.is_some() {
            self.escalation.failures = spec.escalation.failures;
        }
        if spec.escalation.period.is_some() {
            self.escalation.period = spec.escalation.period;
        }
        self.params
            .extend(spec.params.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    #[must_use]
    pub fn to_element(&self) -> Element {
        let mut el = self.base.clone();
        el.name = "resource".to_string();
        let attrs = [
            ("name", self.name.as_str()),
            ("type", self.kind.as_str()),
            ("class", self.class.as_str()),
            ("monitor_interval", self.monitor_interval.as_str()),
        ];
        for (k, v) in attrs {
            el.attributes.insert(k.to_string(), v.to_string());
        }
        xml::set_opt_attr(&mut el, "provider", self.provider.as_deref());
        self.escalation.write(&mut el);

        while el.take_child("parameters").is_some() {}
        if !self.params.is_empty() {
            let mut ps = xmltree::Element::new("parameters");
            for (k, v) in &self.params {
                xml::push_child(
                    &mut ps,
                    xml::element_with_attrs(
                        "parameter",
                        &[("name", k.as_str()), ("value", v.as_str())],
                    ),
                );
            }
            xml::push_child(&mut el, ps);
        }
        el
    }
}
