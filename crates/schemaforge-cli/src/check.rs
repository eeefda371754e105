//! # Check Subcommand
//!
//! Regenerates every document in memory and compares it with what is on
//! disk, writing nothing. Exits `1` if any document is missing, stale, or
//! fails to generate, which makes it suitable as a CI gate.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use crate::load_generator;

/// Arguments for the check subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Declaration files or directories of declaration files.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output root directory the documents were generated into.
    #[arg(long, short, default_value = ".")]
    pub out: PathBuf,
}

/// Execute the check subcommand.
pub fn run_check(args: &CheckArgs) -> Result<u8> {
    let generator = load_generator(&args.inputs)?;
    let report = generator.check(&args.out).context("schema check aborted")?;

    for path in &report.stale {
        println!("  stale      {}", path.display());
    }
    for path in &report.missing {
        println!("  missing    {}", path.display());
    }
    for (root, error) in &report.failures {
        println!("  FAILED     {root}: {error}");
    }

    if report.is_up_to_date() {
        println!("{} schema documents up to date", report.current.len());
        Ok(0)
    } else {
        println!();
        println!("run `schemaforge generate` to update the documents");
        Ok(1)
    }
}
