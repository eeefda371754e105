//! # Configuration Resolver
//!
//! Turns the `configuration` blocks of a compilation unit into one
//! immutable [`GenerationConfig`].
//!
//! - No block: built-in defaults without a base URI. Generation may start,
//!   but minting any schema identifier fails closed.
//! - One block: validated and merged over the defaults.
//! - More than one block: `AmbiguousConfiguration`, naming every origin.

use std::path::{Component, Path};

use schemaforge_core::config::DEFAULT_OUTPUT_LOCATION;
use schemaforge_core::{BaseUri, CompilationUnit, ConfigurationDeclaration, GenerationConfig};

use crate::error::GenerationError;

/// Resolve the generation settings of `unit`.
///
/// # Errors
///
/// - `AmbiguousConfiguration` if more than one file declares a configuration.
/// - `InvalidConfiguration` if the declared block lacks `base_uri`, the
///   URI is relative or malformed, or `output_location` escapes the
///   output directory.
pub fn resolve_configuration(unit: &CompilationUnit) -> Result<GenerationConfig, GenerationError> {
    match unit.configurations() {
        [] => {
            tracing::debug!("no configuration declared, using defaults");
            Ok(GenerationConfig::default())
        }
        [(origin, declaration)] => {
            tracing::debug!(origin = %origin, "resolving configuration");
            resolve_declaration(declaration)
        }
        several => Err(GenerationError::AmbiguousConfiguration {
            sources: several.iter().map(|(origin, _)| origin.clone()).collect(),
        }),
    }
}

fn resolve_declaration(declaration: &ConfigurationDeclaration) -> Result<GenerationConfig, GenerationError> {
    let defaults = GenerationConfig::default();

    let raw_uri = declaration
        .base_uri
        .as_deref()
        .ok_or_else(|| GenerationError::InvalidConfiguration {
            reason: "base_uri is required when a configuration is declared".to_string(),
        })?;
    let base_uri = BaseUri::parse(raw_uri).map_err(|e| GenerationError::InvalidConfiguration {
        reason: e.to_string(),
    })?;

    let output_location = declaration
        .output_location
        .clone()
        .unwrap_or_else(|| DEFAULT_OUTPUT_LOCATION.to_string());
    validate_output_location(&output_location)?;

    Ok(GenerationConfig {
        base_uri: Some(base_uri),
        output_location,
        title: declaration.title.unwrap_or(defaults.title),
        description: declaration.description.unwrap_or(defaults.description),
        null_inclusion: declaration.null_inclusion.unwrap_or(defaults.null_inclusion),
        binary_as_array: declaration.binary_as_array.unwrap_or(defaults.binary_as_array),
        draft: declaration.draft.unwrap_or(defaults.draft),
        allow_any: declaration.allow_any.unwrap_or(defaults.allow_any),
        strict_mode: declaration.strict_mode.unwrap_or(defaults.strict_mode),
    })
}

/// The output location must stay inside the output directory.
fn validate_output_location(location: &str) -> Result<(), GenerationError> {
    let escapes = Path::new(location)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(GenerationError::InvalidConfiguration {
            reason: format!("output_location '{location}' must be a relative path without '..'"),
        });
    }
    Ok(())
}
