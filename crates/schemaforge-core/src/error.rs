//! # Error Types: Declaration Model Errors
//!
//! Errors raised while reading declaration files and turning their raw
//! contents into typed model values. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Model errors carry the offending text so that build output points
//!   at the declaration that needs fixing.
//! - Generation-time failures (unsupported types, configuration problems,
//!   emission errors) live in `schemaforge-gen`, which wraps this type.

use thiserror::Error;

/// Error in a declaration file or one of its values.
#[derive(Error, Debug)]
pub enum ModelError {
    /// A type expression could not be parsed.
    #[error("invalid type expression '{expr}': {reason}")]
    InvalidTypeExpression {
        /// The expression as written in the declaration.
        expr: String,
        /// What the parser expected.
        reason: String,
    },

    /// A constraint entry is malformed (wrong parameters for a known kind).
    #[error("invalid constraint '{kind}': {reason}")]
    InvalidConstraint {
        /// Constraint kind name.
        kind: String,
        /// Why the parameters were rejected.
        reason: String,
    },

    /// The same qualified type name is declared twice in one compilation unit.
    #[error("type '{name}' is declared in both {first} and {second}")]
    DuplicateDeclaration {
        /// Qualified type name.
        name: String,
        /// Origin of the first declaration.
        first: String,
        /// Origin of the second declaration.
        second: String,
    },

    /// A type or schema name contains characters that cannot appear in a URI path segment.
    #[error("invalid schema name '{name}': only ASCII letters, digits, '.', '_' and '-' are allowed")]
    InvalidSchemaName {
        /// The rejected name.
        name: String,
    },

    /// A base URI is not an absolute URI.
    #[error("invalid base URI '{value}': {reason}")]
    InvalidBaseUri {
        /// The configured value.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A declaration file could not be parsed.
    #[error("cannot parse declarations in {origin}: {reason}")]
    Parse {
        /// File path or other origin label.
        origin: String,
        /// Parser error message.
        reason: String,
    },

    /// IO error reading a declaration file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
