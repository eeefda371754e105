//! # schemaforge CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use schemaforge_cli::check::{run_check, CheckArgs};
use schemaforge_cli::generate::{run_generate, GenerateArgs};
use schemaforge_cli::show::{run_show, ShowArgs};

/// SchemaForge: JSON Schema generation from type declarations.
///
/// Compiles declared types, their serialization hints and validation
/// constraints into self-contained, deterministic JSON Schema documents.
#[derive(Parser, Debug)]
#[command(name = "schemaforge", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate one schema document per root type.
    Generate(GenerateArgs),

    /// Verify that generated documents are present and up to date.
    Check(CheckArgs),

    /// Print the schema document of a single root type.
    Show(ShowArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "schemaforge starting");

    let result = match cli.command {
        Commands::Generate(args) => run_generate(&args),
        Commands::Check(args) => run_check(&args),
        Commands::Show(args) => run_show(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}
