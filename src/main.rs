//! CLI entry point for multiscale motion synthesis

use clap::Parser;
use patchmotion::io::cli::{Cli, FileProcessor};
use tracing_subscriber::EnvFilter;

fn main() -> patchmotion::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut processor = FileProcessor::new(cli)?;
    processor.process()
}
