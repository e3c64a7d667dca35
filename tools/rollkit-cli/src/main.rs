//! Rollkit CLI
//!
//! # Commands
//!
//! - `rollkit gff2json` - Convert a GFF file to JSON
//! - `rollkit json2gff` - Convert JSON back to a GFF file
//! - `rollkit ls` - List the resources in a container
//! - `rollkit extract` - Extract resources from a container
//! - `rollkit lint` - Parse and resolve scripts, printing diagnostics
//!
//! # Usage
//!
//! ```bash
//! rollkit gff2json nw_chicken.utc > nw_chicken.utc.json
//! rollkit json2gff nw_chicken.utc.json -o nw_chicken.utc
//! rollkit extract data/base_2da.bif "*.2da" -o 2da
//! rollkit lint -I scripts scripts/nw_c2_default9.nss
//! ```
//!
//! Set `RUST_LOG` to override the log filter.

mod container;
mod gff;
mod lint;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rollkit_shared::{Config, config};

/// Rollkit - resource, GFF and script tools
#[derive(Parser)]
#[command(name = "rollkit")]
#[command(about = "Resource, GFF and script tools")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a GFF file to JSON
    Gff2json(gff::Gff2JsonArgs),

    /// Convert JSON back to a GFF file
    Json2gff(gff::Json2GffArgs),

    /// List the resources in a container
    Ls(container::LsArgs),

    /// Extract resources from a container
    Extract(container::ExtractArgs),

    /// Parse and resolve scripts, printing diagnostics
    Lint(lint::LintArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = match cli.config.or_else(config::default_path) {
        Some(path) => config::load(&path),
        None => Config::default(),
    };

    match cli.command {
        Commands::Gff2json(args) => gff::gff_to_json(args, &config),
        Commands::Json2gff(args) => gff::json_to_gff(args, &config),
        Commands::Ls(args) => container::list(args),
        Commands::Extract(args) => container::extract(args),
        Commands::Lint(args) => lint::execute(args, &config),
    }
}
