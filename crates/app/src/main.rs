//! Command-line front end for the receipt scanner.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{ParseArgs, PreprocessArgs, ScanArgs};

/// Turn receipt photos into structured receipts
#[derive(Parser)]
#[command(name = "tillscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// More logging (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Preprocess, OCR and extract a receipt image
    Scan(ScanArgs),

    /// Extract fields from OCR text already on disk (or `-` for stdin)
    Parse(ParseArgs),

    /// Write the binarized image the OCR engine would see
    Preprocess(PreprocessArgs),

    /// Print the effective configuration as TOML
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan(args) => commands::scan(args, config).await,
        Commands::Parse(args) => commands::parse(args, config),
        Commands::Preprocess(args) => commands::preprocess(args, config),
        Commands::Config => commands::print_config(&config),
    }
}
