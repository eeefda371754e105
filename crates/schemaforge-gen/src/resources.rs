//! # Schema Resources
//!
//! Read access to published schema documents by schema name, for
//! consumers that load schemas at runtime instead of embedding them.

use std::io;
use std::path::{Path, PathBuf};

use schemaforge_core::SCHEMA_FILE_SUFFIX;

/// A directory of published `*.schema.json` documents.
#[derive(Debug, Clone)]
pub struct SchemaResources {
    root: PathBuf,
}

impl SchemaResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `Possum` and `Possum.schema.json` both name `Possum.schema.json`.
    pub fn file_name(name: &str) -> String {
        if name.ends_with(SCHEMA_FILE_SUFFIX) {
            name.to_string()
        } else {
            format!("{name}{SCHEMA_FILE_SUFFIX}")
        }
    }

    /// Content of the named schema, or `None` if there is no such schema.
    ///
    /// Names that would leave the resource directory are treated as
    /// not found.
    pub fn get(&self, name: &str) -> io::Result<Option<String>> {
        let escapes = name.is_empty()
            || name.contains(['/', '\\'])
            || name == ".."
            || name.starts_with("..");
        if escapes {
            tracing::debug!(name, "rejected schema resource name");
            return Ok(None);
        }
        match std::fs::read_to_string(self.root.join(Self::file_name(name))) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }
}
