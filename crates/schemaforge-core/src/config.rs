//! # Generation Configuration
//!
//! Settings that apply to every schema generated from one compilation
//! unit. A [`GenerationConfig`] is produced once by the configuration
//! resolver and is read-only afterwards.

use serde::{Deserialize, Serialize};

use crate::identity::BaseUri;

/// Default directory (relative to the output root) that receives documents.
pub const DEFAULT_OUTPUT_LOCATION: &str = "schemas";

/// JSON Schema draft of the emitted documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Draft {
    #[default]
    #[serde(rename = "2020-12")]
    Draft202012,
    #[serde(rename = "draft-07")]
    Draft7,
}

impl Draft {
    /// Value of the `$schema` keyword.
    pub fn meta_schema_uri(&self) -> &'static str {
        match self {
            Self::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
            Self::Draft7 => "http://json-schema.org/draft-07/schema#",
        }
    }

    /// Keyword holding reusable definitions.
    pub fn definitions_keyword(&self) -> &'static str {
        match self {
            Self::Draft202012 => "$defs",
            Self::Draft7 => "definitions",
        }
    }

    /// Whether `$ref` may carry sibling keywords.
    pub fn ref_allows_siblings(&self) -> bool {
        matches!(self, Self::Draft202012)
    }
}

/// Where object titles come from when a type does not declare one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TitlePolicy {
    /// The type's nested name (`Possum.Environment`).
    #[default]
    TypeName,
    /// No title unless declared.
    None,
}

/// Whether type and property documentation becomes `description`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptionPolicy {
    #[default]
    Documentation,
    None,
}

/// How nullable properties are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullInclusion {
    /// Nullable properties accept `null` alongside their type.
    #[default]
    Include,
    /// The serializer drops null values, so schemas describe only the
    /// non-null type. Nullable properties stay out of `required`.
    Omit,
}

/// Resolved, immutable generation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Base of every schema identifier. `None` when no configuration was
    /// declared; identifier minting then fails closed.
    pub base_uri: Option<BaseUri>,
    /// Directory under the output root receiving the documents.
    pub output_location: String,
    pub title: TitlePolicy,
    pub description: DescriptionPolicy,
    pub null_inclusion: NullInclusion,
    /// Encode `bytes` as an array of integers instead of a base64 string.
    pub binary_as_array: bool,
    pub draft: Draft,
    /// Permit open-ended `any` types (rendered as an unconstrained schema).
    pub allow_any: bool,
    /// Require every property whose inclusion policy is `always`, nullable
    /// or not.
    pub strict_mode: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_uri: None,
            output_location: DEFAULT_OUTPUT_LOCATION.to_string(),
            title: TitlePolicy::default(),
            description: DescriptionPolicy::default(),
            null_inclusion: NullInclusion::default(),
            binary_as_array: false,
            draft: Draft::default(),
            allow_any: false,
            strict_mode: false,
        }
    }
}
