//! # Generation Errors
//!
//! Fatal failures of a generation run. Configuration errors abort the
//! whole compilation unit; every other variant aborts only the root type
//! being generated. No variant ever leaves a partially written document
//! behind: documents are published atomically and only after they are
//! complete and self-validated.

use std::path::PathBuf;

use schemaforge_core::{CanonicalId, ModelError, TypeName};
use thiserror::Error;

/// Error during schema generation.
#[derive(Error, Debug)]
pub enum GenerationError {
    /// A reachable type cannot be represented as JSON Schema.
    #[error("unsupported type in {type_name} at '{path}': {reason}")]
    UnsupportedType {
        /// Type whose declaration contains the offending reference.
        type_name: String,
        /// Property path inside that type (`children.items`).
        path: String,
        /// What could not be represented.
        reason: String,
    },

    /// More than one configuration block in one compilation unit.
    #[error("ambiguous configuration: declared in {}", sources.join(", "))]
    AmbiguousConfiguration {
        /// Origins of every configuration block found.
        sources: Vec<String>,
    },

    /// The configuration is malformed or lacks a usable base URI.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What is wrong.
        reason: String,
    },

    /// Two distinct types would be published under the same identifier.
    #[error("types {first} and {second} both map to schema identifier {id}")]
    IdentifierCollision {
        id: CanonicalId,
        first: TypeName,
        second: TypeName,
    },

    /// A definition was referenced but never registered.
    #[error("definition {0} was referenced but never registered")]
    UnresolvedReference(CanonicalId),

    /// A generated document does not validate against its meta-schema.
    #[error("generated schema '{schema_name}' is not a valid JSON Schema: {reason}")]
    SelfValidation {
        schema_name: String,
        reason: String,
    },

    /// Two documents of one run target the same output file.
    #[error("conflicting output: {} was already written in this run", path.display())]
    ConflictingOutput {
        path: PathBuf,
    },

    /// The declarations themselves are invalid.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Rendering a document to JSON failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error while publishing documents.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerationError {
    /// Whether the error invalidates the whole compilation unit rather
    /// than a single root type.
    pub fn is_unit_fatal(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousConfiguration { .. } | Self::InvalidConfiguration { .. }
        )
    }
}
