//! Skiff CLI
//!
//! Command-line interface for applying cluster snapshots

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "skiff")]
#[command(about = "Skiff - cluster snapshot apply", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot operations
    Snapshot(commands::snapshot::SnapshotArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skiff=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Snapshot(args) => commands::snapshot::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
