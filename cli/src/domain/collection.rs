//! XML-as-database collections.
//!
//! A collection is one document whose root `<plural>` element holds
//! `<singular name="...">` entries. This module only manipulates the in-memory
//! tree; loading and saving live behind the `CollectionStore` port.

use xmltree::{Element, XMLNode};

use crate::domain::error::StoreError;
use crate::domain::xml;

/// Root attribute carrying the schema version.
pub const VERSION_ATTR: &str = "pcmkc-version";

/// The three persisted entity collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Assemblies,
    Deployables,
    Jeos,
}

impl CollectionKind {
    /// File name under the database directory.
    #[must_use]
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Assemblies => "db_assemblies.xml",
            Self::Deployables => "db_deployable.xml",
            Self::Jeos => "db_jeos.xml",
        }
    }

    /// Root element name.
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Assemblies => "assemblies",
            Self::Deployables => "deployables",
            Self::Jeos => "images",
        }
    }

    /// Entry element name.
    #[must_use]
    pub fn singular(self) -> &'static str {
        match self {
            Self::Assemblies => "assembly",
            Self::Deployables => "deployable",
            Self::Jeos => "jeos",
        }
    }
}

/// An in-memory collection document.
#[derive(Debug, Clone)]
pub struct Collection {
    kind: CollectionKind,
    root: Element,
}

impl Collection {
    /// Fresh, empty collection stamped with `version`.
    #[must_use]
    pub fn new(kind: CollectionKind, version: &str) -> Self {
        let root = xml::element_with_attrs(kind.plural(), &[(VERSION_ATTR, version)]);
        Self { kind, root }
    }

    /// Wrap a parsed root element.
    #[must_use]
    pub fn from_root(kind: CollectionKind, root: Element) -> Self {
        Self { kind, root }
    }

    #[must_use]
    pub fn kind(&self) -> CollectionKind {
        self.kind
    }

    #[must_use]
    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Stored `pcmkc-version`, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        xml::attr(&self.root, VERSION_ATTR)
    }

    /// Every `<singular>` entry in document order.
    pub fn entries(&self) -> impl Iterator<Item = &Element> {
        xml::children_named(&self.root, self.kind.singular())
    }

    /// Entry names in document order; unnamed entries skipped, duplicates
    /// collapsed onto the first occurrence.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in self.entries().filter_map(|e| xml::attr(e, "name")) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    #[must_use]
    pub fn exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// First entry whose `name` attribute matches.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Element> {
        self.entries().find(|e| xml::attr(e, "name") == Some(name))
    }

    /// Mutable access to the first entry whose `name` attribute matches.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Element> {
        let singular = self.kind.singular();
        self.root
            .children
            .iter_mut()
            .filter_map(XMLNode::as_mut_element)
            .find(|e| e.name == singular && xml::attr(e, "name") == Some(name))
    }

    /// Entries matching a predicate, for collections keyed by more than a name.
    pub fn find(&self, pred: impl Fn(&Element) -> bool) -> Option<&Element> {
        self.entries().find(|e| pred(e))
    }

    /// Replace the entry with the same name, or append a new one.
    ///
    /// Later entries sharing the name are dropped, so at most one entry per
    /// name survives.
    pub fn upsert(&mut self, entry: Element) {
        let Some(name) = xml::attr(&entry, "name").map(str::to_string) else {
            self.push(entry);
            return;
        };
        let singular = self.kind.singular();
        let mut slot = Some(entry);
        self.root.children.retain_mut(|node| {
            let Some(el) = node.as_mut_element() else {
                return true;
            };
            if el.name != singular || xml::attr(el, "name") != Some(name.as_str()) {
                return true;
            }
            match slot.take() {
                Some(new) => {
                    *el = new;
                    true
                }
                None => false,
            }
        });
        if let Some(new) = slot {
            self.push(new);
        }
    }

    /// Append an entry unconditionally.
    pub fn push(&mut self, entry: Element) {
        xml::push_child(&mut self.root, entry);
    }

    /// Remove the first entry with `name`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if no entry has that name.
    pub fn remove(&mut self, name: &str) -> Result<Element, StoreError> {
        self.remove_where(|e| xml::attr(e, "name") == Some(name))
            .ok_or_else(|| StoreError::NotFound {
                singular: self.kind.singular(),
                name: name.to_string(),
            })
    }

    /// Remove the first entry matching `pred`.
    pub fn remove_where(&mut self, pred: impl Fn(&Element) -> bool) -> Option<Element> {
        let singular = self.kind.singular();
        let idx = self.root.children.iter().position(|node| {
            node.as_element()
                .is_some_and(|el| el.name == singular && pred(el))
        })?;
        match self.root.children.remove(idx) {
            XMLNode::Element(el) => Some(el),
            _ => None,
        }
    }
}
