//! # schemaforge-cli: SchemaForge Command-Line Interface
//!
//! The `schemaforge` binary compiles declaration files into JSON Schema
//! documents.
//!
//! ## Subcommands
//!
//! - `generate`: Generate and publish one document per root type
//! - `check`: Report documents that are missing or out of date
//! - `show`: Print the document of a single root type
//!
//! ## Crate Policy
//!
//! - Argument parsing is separated from business logic.
//! - Handlers delegate to `schemaforge-gen`; no generation logic here.
//! - Handlers return the process exit code: `0` on success, `1` when the
//!   run completed but found failures or stale output.

use std::path::PathBuf;

use anyhow::{Context, Result};
use schemaforge_gen::Generator;

pub mod check;
pub mod generate;
pub mod show;

/// Load the compilation unit made of `inputs` and resolve its configuration.
pub fn load_generator(inputs: &[PathBuf]) -> Result<Generator> {
    let generator = Generator::load(inputs).with_context(|| {
        let shown: Vec<String> = inputs.iter().map(|p| p.display().to_string()).collect();
        format!("failed to load declarations from {}", shown.join(", "))
    })?;
    tracing::debug!(
        types = generator.unit().len(),
        roots = generator.roots().len(),
        "loaded declarations"
    );
    Ok(generator)
}
