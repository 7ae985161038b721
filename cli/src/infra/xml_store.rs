//! Infrastructure implementation of the `CollectionStore` port.
//!
//! `XmlStore` reads and writes whole collection files under the database
//! directory, with atomic write (temp file + rename) so a crash never leaves
//! a half-written collection behind.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::application::ports::CollectionStore;
use crate::domain::collection::{Collection, CollectionKind};
use crate::domain::xml;

/// Collection files stored as XML under a database directory.
pub struct XmlStore {
    dbdir: PathBuf,
    version: String,
}

impl XmlStore {
    #[must_use]
    pub fn new(dbdir: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            dbdir: dbdir.into(),
            version: version.into(),
        }
    }

    fn path(&self, kind: CollectionKind) -> PathBuf {
        self.dbdir.join(kind.file_name())
    }
}

impl CollectionStore for XmlStore {
    fn load(&self, kind: CollectionKind) -> Result<Collection> {
        let path = self.path(kind);
        let Ok(text) = std::fs::read_to_string(&path) else {
            tracing::debug!(path = %path.display(), "no collection file, starting empty");
            return Ok(Collection::new(kind, &self.version));
        };
        let root = match xml::parse(&text) {
            Ok(root) if root.name == kind.plural() => root,
            Ok(root) => {
                tracing::warn!(
                    path = %path.display(),
                    found = %root.name,
                    expected = kind.plural(),
                    "unexpected root element, starting empty"
                );
                return Ok(Collection::new(kind, &self.version));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unparsable collection, starting empty");
                return Ok(Collection::new(kind, &self.version));
            }
        };
        let collection = Collection::from_root(kind, root);
        if let Some(stored) = collection.version()
            && stored != self.version
        {
            tracing::warn!(
                "xml and program version mismatch \"{stored}\" != \"{}\"",
                self.version
            );
        }
        Ok(collection)
    }

    fn save(&self, collection: &Collection) -> Result<()> {
        let path = self.path(collection.kind());
        std::fs::create_dir_all(&self.dbdir)
            .with_context(|| format!("creating directory {}", self.dbdir.display()))?;
        let content = xml::to_pretty_string(collection.root())
            .with_context(|| format!("serializing {}", collection.kind().file_name()))?;

        let temp_path = path.with_extension("xml.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;
        std::fs::rename(&temp_path, &path)
            .with_context(|| format!("finalizing {}", path.display()))?;
        tracing::debug!(path = %path.display(), entries = collection.entries().count(), "collection saved");
        Ok(())
    }
}
