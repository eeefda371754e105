//! # Identity Newtypes
//!
//! Newtype wrappers for the names SchemaForge passes around: qualified
//! type names, the configured base URI, and the canonical identifier a
//! nominal type receives in generated documents. Keeping them distinct
//! prevents a schema name from being used where a qualified name or an
//! absolute identifier is expected.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ModelError;

/// File suffix of every emitted schema document.
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// Qualified name of a declared (nominal) type.
///
/// A name is a package (possibly empty) followed by the chain of enclosing
/// types and the type itself, e.g. package `com.example` with nesting
/// `["Possum", "Environment"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeName {
    package: String,
    nesting: Vec<String>,
}

impl TypeName {
    /// Create a top-level type name in `package`.
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            nesting: vec![name.into()],
        }
    }

    /// Name of a type declared inside this one.
    pub fn nested(&self, name: impl Into<String>) -> Self {
        let mut nesting = self.nesting.clone();
        nesting.push(name.into());
        Self {
            package: self.package.clone(),
            nesting,
        }
    }

    /// The package, empty for the default package.
    pub fn package(&self) -> &str {
        &self.package
    }

    /// The unqualified name of the type itself.
    pub fn simple_name(&self) -> &str {
        self.nesting.last().map(String::as_str).unwrap_or("")
    }

    /// Enclosing types and the type itself joined with `.` (`Possum.Environment`).
    pub fn nested_name(&self) -> String {
        self.nesting.join(".")
    }

    /// Fully qualified name (`com.example.Possum.Environment`).
    pub fn qualified(&self) -> String {
        if self.package.is_empty() {
            self.nested_name()
        } else {
            format!("{}.{}", self.package, self.nested_name())
        }
    }

    /// Lookup scopes for names referenced from inside this type, innermost first.
    ///
    /// For `com.example.Possum.Environment` this yields
    /// `com.example.Possum.Environment`, `com.example.Possum`, `com.example`.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes = Vec::with_capacity(self.nesting.len() + 1);
        for depth in (1..=self.nesting.len()).rev() {
            let chain = self.nesting[..depth].join(".");
            if self.package.is_empty() {
                scopes.push(chain);
            } else {
                scopes.push(format!("{}.{chain}", self.package));
            }
        }
        if !self.package.is_empty() {
            scopes.push(self.package.clone());
        }
        scopes
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified())
    }
}

/// Check that a schema name is usable as a URI path segment and file name.
pub fn validate_schema_name(name: &str) -> Result<(), ModelError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ModelError::InvalidSchemaName {
            name: name.to_string(),
        })
    }
}

/// Absolute base URI under which all schema identifiers are minted.
///
/// Stored without a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BaseUri(String);

impl BaseUri {
    /// Parse and normalize a configured base URI.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidBaseUri` if the value is empty, relative,
    /// or cannot carry a path (e.g. `mailto:`).
    pub fn parse(value: &str) -> Result<Self, ModelError> {
        let trimmed = value.trim();
        let url = Url::parse(trimmed).map_err(|e| ModelError::InvalidBaseUri {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ModelError::InvalidBaseUri {
                value: value.to_string(),
                reason: "URI cannot be used as a base for schema paths".to_string(),
            });
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ModelError::InvalidBaseUri {
                value: value.to_string(),
                reason: "base URI must not carry a query or fragment".to_string(),
            });
        }
        Ok(Self(url.as_str().trim_end_matches('/').to_string()))
    }

    /// The normalized URI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Absolute identifier of a nominal type's schema:
/// `{base_uri}/{schema_name}.schema.json`.
///
/// Used both as the `$id` of the type's schema and as the target of every
/// `$ref` that points at it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Mint the identifier for `schema_name` under `base`.
    pub fn new(base: &BaseUri, schema_name: &str) -> Self {
        Self(format!("{base}/{schema_name}{SCHEMA_FILE_SUFFIX}"))
    }

    /// The identifier as a URI string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name_forms() {
        let env = TypeName::new("com.example", "Possum").nested("Environment");
        assert_eq!(env.simple_name(), "Environment");
        assert_eq!(env.nested_name(), "Possum.Environment");
        assert_eq!(env.qualified(), "com.example.Possum.Environment");
        assert_eq!(env.to_string(), "com.example.Possum.Environment");
    }

    #[test]
    fn test_type_name_default_package() {
        let llama = TypeName::new("", "Llama");
        assert_eq!(llama.qualified(), "Llama");
        assert_eq!(llama.scopes(), vec!["Llama".to_string()]);
    }

    #[test]
    fn test_scopes_innermost_first() {
        let env = TypeName::new("com.example", "Possum").nested("Environment");
        assert_eq!(
            env.scopes(),
            vec![
                "com.example.Possum.Environment".to_string(),
                "com.example.Possum".to_string(),
                "com.example".to_string(),
            ]
        );
    }

    #[test]
    fn test_base_uri_trims_trailing_slash() {
        let base = BaseUri::parse("https://example.com/schemas/").unwrap();
        assert_eq!(base.as_str(), "https://example.com/schemas");
    }

    #[test]
    fn test_base_uri_rejects_relative() {
        assert!(matches!(
            BaseUri::parse("/schemas"),
            Err(ModelError::InvalidBaseUri { .. })
        ));
        assert!(BaseUri::parse("schemas/v1").is_err());
        assert!(BaseUri::parse("").is_err());
    }

    #[test]
    fn test_base_uri_rejects_non_hierarchical() {
        assert!(BaseUri::parse("mailto:someone@example.com").is_err());
        assert!(BaseUri::parse("https://example.com/schemas?v=1").is_err());
    }

    #[test]
    fn test_canonical_id_format() {
        let base = BaseUri::parse("https://example.com/schemas").unwrap();
        let id = CanonicalId::new(&base, "Possum.Environment");
        assert_eq!(
            id.as_str(),
            "https://example.com/schemas/Possum.Environment.schema.json"
        );
    }

    #[test]
    fn test_schema_name_validation() {
        assert!(validate_schema_name("Possum.Environment").is_ok());
        assert!(validate_schema_name("red-winged_blackbird").is_ok());
        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name("../etc").is_err());
        assert!(validate_schema_name("a/b").is_err());
        assert!(validate_schema_name("with space").is_err());
    }
}
