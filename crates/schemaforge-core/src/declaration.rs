//! # Declaration Files
//!
//! Serde model of the YAML/JSON files that declare types, their
//! serialization hints, their constraints, and (at most once per
//! compilation unit) the generation configuration.
//!
//! ```yaml
//! package: com.example
//! configuration:
//!   base_uri: https://example.com/schemas
//! types:
//!   - name: Llama
//!     schema: { description: A llama. }
//!     properties:
//!       - name: name
//!         type: string
//!         constraints: [not_blank]
//!       - name: age
//!         type: int
//!         constraints: [positive_or_zero]
//! ```
//!
//! Unknown keys are rejected so that typos surface as parse errors
//! instead of silently missing schema keywords.

use std::path::Path;

use serde::Deserialize;

use crate::config::{DescriptionPolicy, Draft, NullInclusion, TitlePolicy};
use crate::constraint::ConstraintDescriptor;
use crate::descriptor::InclusionPolicy;
use crate::error::ModelError;
use crate::type_expr::TypeExpr;

/// One declaration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeclarationFile {
    /// Package every top-level type in the file belongs to.
    #[serde(default)]
    pub package: Option<String>,
    /// Generation settings; at most one per compilation unit.
    #[serde(default)]
    pub configuration: Option<ConfigurationDeclaration>,
    #[serde(default)]
    pub types: Vec<TypeDeclaration>,
}

impl DeclarationFile {
    /// Parse YAML declarations. JSON is accepted too, being a YAML subset.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::Parse` naming `origin` if the text is not a
    /// valid declaration file.
    pub fn from_yaml_str(text: &str, origin: &str) -> Result<Self, ModelError> {
        serde_yaml::from_str(text).map_err(|e| ModelError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })
    }

    /// Read and parse a declaration file from disk.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text, &path.display().to_string())
    }
}

/// The `configuration` block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationDeclaration {
    /// Absolute base URI for schema identifiers.
    #[serde(default)]
    pub base_uri: Option<String>,
    #[serde(default)]
    pub output_location: Option<String>,
    #[serde(default)]
    pub title: Option<TitlePolicy>,
    #[serde(default)]
    pub description: Option<DescriptionPolicy>,
    #[serde(default)]
    pub null_inclusion: Option<NullInclusion>,
    #[serde(default)]
    pub binary_as_array: Option<bool>,
    #[serde(default)]
    pub draft: Option<Draft>,
    #[serde(default)]
    pub allow_any: Option<bool>,
    #[serde(default)]
    pub strict_mode: Option<bool>,
}

/// Marks a type as a root that gets its own document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaAnnotation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Overrides the schema name used for the file and identifier.
    #[serde(default)]
    pub name: Option<String>,
}

/// Kind of a declared type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclaredKind {
    #[default]
    Object,
    Enum,
    Union,
    /// Open polymorphic type without a closed set of variants.
    Interface,
}

/// A declared type. Nested types inherit the enclosing type as scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDeclaration {
    pub name: String,
    #[serde(default)]
    pub kind: DeclaredKind,
    /// Present on root types.
    #[serde(default)]
    pub schema: Option<SchemaAnnotation>,
    /// Type documentation.
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub properties: Vec<PropertyDeclaration>,
    /// Enum literals.
    #[serde(default)]
    pub values: Vec<String>,
    /// Union discriminator property; `type` when omitted.
    #[serde(default)]
    pub discriminator: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantDeclaration>,
    #[serde(default)]
    pub nested: Vec<TypeDeclaration>,
    /// JSON property names to leave out.
    #[serde(default)]
    pub ignore_properties: Vec<String>,
    /// When present, only these JSON property names are kept.
    #[serde(default)]
    pub include_properties: Option<Vec<String>>,
    /// Schema for properties not listed in `properties`.
    #[serde(default)]
    pub additional_properties: Option<TypeExpr>,
}

/// A declared property.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PropertyDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    /// JSON name when it differs from `name`.
    #[serde(default)]
    pub rename: Option<String>,
    /// Leave the property out of the schema entirely.
    #[serde(default)]
    pub ignore: bool,
    /// Inline the properties of the named object type in place of this one.
    #[serde(default)]
    pub unwrapped: bool,
    #[serde(default)]
    pub include: InclusionPolicy,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub constraints: Vec<ConstraintDescriptor>,
    #[serde(default)]
    pub item_constraints: Vec<ConstraintDescriptor>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// A union variant.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantDeclaration {
    /// The variant's object type, resolved like a property type name.
    #[serde(rename = "type")]
    pub target: String,
    /// Discriminator value; the variant type's simple name when omitted.
    #[serde(default)]
    pub tag: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ScalarType;

    const POSSUM: &str = r#"
package: com.example
configuration:
  base_uri: https://example.com/schemas
  null_inclusion: include
types:
  - name: Possum
    schema: {}
    properties:
      - name: name
        type: string
        include: non_null
        constraints: [not_blank]
      - name: children
        type: list<Possum>?
      - name: environment
        type: Environment?
    nested:
      - name: Environment
        schema: {}
        description: The environment.
        properties:
          - name: name
            type: string?
            constraints:
              - size: { min: 2 }
"#;

    #[test]
    fn test_parse_possum_declarations() {
        let file = DeclarationFile::from_yaml_str(POSSUM, "possum.yaml").unwrap();
        assert_eq!(file.package.as_deref(), Some("com.example"));
        let config = file.configuration.unwrap();
        assert_eq!(config.base_uri.as_deref(), Some("https://example.com/schemas"));
        assert_eq!(config.null_inclusion, Some(NullInclusion::Include));

        let possum = &file.types[0];
        assert!(possum.schema.is_some());
        assert_eq!(possum.properties.len(), 3);
        assert_eq!(possum.properties[0].include, InclusionPolicy::NonNull);
        assert_eq!(
            possum.properties[0].type_expr,
            TypeExpr::Scalar(ScalarType::String)
        );
        assert_eq!(possum.nested[0].name, "Environment");
        assert_eq!(possum.nested[0].description.as_deref(), Some("The environment."));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = DeclarationFile::from_yaml_str(
            "types:\n  - name: A\n    propertise: []\n",
            "typo.yaml",
        )
        .unwrap_err();
        match err {
            ModelError::Parse { origin, reason } => {
                assert_eq!(origin, "typo.yaml");
                assert!(reason.contains("propertise"), "{reason}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bad_type_expression_is_parse_error() {
        let err = DeclarationFile::from_yaml_str(
            "types:\n  - name: A\n    properties:\n      - name: x\n        type: list<\n",
            "bad.yaml",
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::Parse { .. }));
    }

    #[test]
    fn test_json_declarations_accepted() {
        let file = DeclarationFile::from_yaml_str(
            r#"{"types": [{"name": "Color", "kind": "enum", "values": ["RED", "GREEN"]}]}"#,
            "color.json",
        )
        .unwrap();
        assert_eq!(file.types[0].kind, DeclaredKind::Enum);
        assert_eq!(file.types[0].values, vec!["RED", "GREEN"]);
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("possum.yaml");
        std::fs::write(&path, POSSUM).unwrap();
        let file = DeclarationFile::load(&path).unwrap();
        assert_eq!(file.types.len(), 1);
    }
}
