//! # Document Emitter
//!
//! Assembles one JSON Schema document per root and publishes it to disk.
//!
//! ## Document Layout
//!
//! ```json
//! {
//!   "$schema": "https://json-schema.org/draft/2020-12/schema",
//!   "$id": "https://example.com/schemas/Possum.schema.json",
//!   "type": "object",
//!   "properties": { ... },
//!   "$defs": {
//!     "Possum.Environment": { "$id": "https://example.com/schemas/Possum.Environment.schema.json", ... }
//!   }
//! }
//! ```
//!
//! The root is inlined. Definitions appear in discovery order and each
//! carries its own `$id`, so absolute `$ref`s resolve inside the document.
//!
//! ## Invariants
//!
//! - Output is byte-identical for identical input: pretty-printed JSON with
//!   a trailing newline, keys in a fixed order.
//! - A file is replaced atomically (temporary file in the target
//!   directory, then rename) and only when its SHA-256 digest changes.
//! - A path is written at most once per emitter.
//! - Documents failing self-validation are never written.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use schemaforge_core::{CanonicalId, Draft, SCHEMA_FILE_SUFFIX};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::GenerationError;
use crate::node::SchemaNode;
use crate::registry::Definition;
use crate::validate::check_document;

/// A complete schema document for one root type.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub schema_name: String,
    pub id: CanonicalId,
    pub draft: Draft,
    pub root: SchemaNode,
    /// Definitions reachable from the root, excluding it, in discovery order.
    pub definitions: Vec<Arc<Definition>>,
}

impl SchemaDocument {
    /// `{SchemaName}.schema.json`.
    pub fn file_name(&self) -> String {
        format!("{}{SCHEMA_FILE_SUFFIX}", self.schema_name)
    }

    pub fn to_value(&self) -> Value {
        let mut document = Map::new();
        document.insert("$schema".into(), Value::from(self.draft.meta_schema_uri()));
        document.insert("$id".into(), Value::from(self.id.as_str()));
        document.extend(self.root.render(self.draft));

        if !self.definitions.is_empty() {
            let mut definitions = Map::new();
            for definition in &self.definitions {
                let mut rendered = Map::new();
                rendered.insert("$id".into(), Value::from(definition.id.as_str()));
                rendered.extend(definition.node.render(self.draft));
                definitions.insert(definition.schema_name.clone(), Value::Object(rendered));
            }
            document.insert(
                self.draft.definitions_keyword().into(),
                Value::Object(definitions),
            );
        }
        Value::Object(document)
    }

    /// Pretty-printed JSON followed by a newline.
    pub fn render(&self) -> Result<String, GenerationError> {
        let mut text = serde_json::to_string_pretty(&self.to_value())?;
        text.push('\n');
        Ok(text)
    }

    /// Self-validate the document.
    pub fn check(&self) -> Result<(), GenerationError> {
        check_document(&self.schema_name, &self.to_value(), self.draft)
    }
}

impl Serialize for SchemaDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

/// What publishing did to the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Existing content already matched; the file was left untouched.
    Unchanged,
}

/// Writes documents into one output directory.
#[derive(Debug)]
pub struct DocumentEmitter {
    directory: PathBuf,
    claimed: Mutex<HashSet<PathBuf>>,
}

impl DocumentEmitter {
    /// Emit into `output_dir/output_location`.
    pub fn new(output_dir: &Path, output_location: &str) -> Self {
        Self {
            directory: output_dir.join(output_location),
            claimed: Mutex::new(HashSet::new()),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, document: &SchemaDocument) -> PathBuf {
        self.directory.join(document.file_name())
    }

    /// Validate, render and publish `document`.
    ///
    /// # Errors
    ///
    /// - `SelfValidation` if the document is not a valid schema (nothing
    ///   is written).
    /// - `ConflictingOutput` if this emitter already wrote the same path.
    /// - `Io` on filesystem failures.
    pub fn emit(&self, document: &SchemaDocument) -> Result<WriteOutcome, GenerationError> {
        document.check()?;
        let content = document.render()?;
        self.publish(&self.path_for(document), &content)
    }

    /// Atomically replace `path` with `content` unless it already holds it.
    pub fn publish(&self, path: &Path, content: &str) -> Result<WriteOutcome, GenerationError> {
        if !self.claimed.lock().insert(path.to_path_buf()) {
            return Err(GenerationError::ConflictingOutput {
                path: path.to_path_buf(),
            });
        }
        if is_current(path, content)? {
            tracing::debug!(path = %path.display(), "schema unchanged, skipping write");
            return Ok(WriteOutcome::Unchanged);
        }

        let parent = path.parent().unwrap_or(&self.directory);
        std::fs::create_dir_all(parent)?;
        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        staged.write_all(content.as_bytes())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| e.error)?;
        tracing::info!(path = %path.display(), "wrote schema");
        Ok(WriteOutcome::Written)
    }
}

/// Whether the file at `path` exists with exactly `content`.
pub fn is_current(path: &Path, content: &str) -> Result<bool, GenerationError> {
    match std::fs::read(path) {
        Ok(existing) => Ok(Sha256::digest(&existing) == Sha256::digest(content.as_bytes())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
