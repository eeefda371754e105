//! # Generate Subcommand
//!
//! ```bash
//! # Compile every declaration in `schema/` into `./schemas/`:
//! schemaforge generate schema/
//!
//! # Publish under a different output root:
//! schemaforge generate schema/ --out target/generated
//! ```
//!
//! Documents land in `<out>/<output_location>`, where `output_location`
//! comes from the declared configuration (`schemas` by default).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::load_generator;

/// Arguments for the generate subcommand.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Declaration files or directories of declaration files.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output root directory.
    #[arg(long, short, default_value = ".")]
    pub out: PathBuf,
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs) -> Result<u8> {
    let generator = load_generator(&args.inputs)?;
    let report = generator
        .emit_all(&args.out)
        .context("schema generation aborted")?;

    for path in &report.written {
        println!("  wrote      {}", path.display());
    }
    for path in &report.unchanged {
        println!("  unchanged  {}", path.display());
    }
    for diagnostic in &report.diagnostics {
        println!("  warning    {diagnostic}");
    }
    for (root, error) in &report.failures {
        println!("  FAILED     {root}: {error}");
    }
    println!();
    println!(
        "{} written, {} unchanged, {} failed",
        report.written.len(),
        report.unchanged.len(),
        report.failures.len()
    );

    Ok(if report.is_success() { 0 } else { 1 })
}
