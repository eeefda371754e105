//! # Show Subcommand
//!
//! Prints the document of one root type to stdout without writing files.
//! The root may be named by qualified name (`com.example.Possum`), nested
//! name (`Possum`), or schema name override.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use schemaforge_gen::DefinitionRegistry;

use crate::load_generator;

/// Arguments for the show subcommand.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Root type to print.
    pub root: String,

    /// Declaration files or directories of declaration files.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

/// Execute the show subcommand.
pub fn run_show(args: &ShowArgs) -> Result<u8> {
    print!("{}", render_root(args)?);
    Ok(0)
}

fn render_root(args: &ShowArgs) -> Result<String> {
    let generator = load_generator(&args.inputs)?;
    let root = generator.find_root(&args.root).with_context(|| {
        let known: Vec<String> = generator.roots().iter().map(|r| r.qualified()).collect();
        format!("no root type '{}' (known: {})", args.root, known.join(", "))
    })?;
    let document = generator
        .generate_document(&root, &DefinitionRegistry::new())
        .with_context(|| format!("failed to generate {root}"))?;
    document.check()?;
    Ok(document.render()?)
}
