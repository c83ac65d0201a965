//! Tally CLI - Bank statement normalizer
//!
//! Usage:
//!   tally ingest FILES...          Parse statements and print transactions
//!   tally detect FILE              Show detected column roles
//!   tally export FILES... -o OUT   Write the combined export CSV
//!   tally serve --port 3000        Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        // stderr keeps `--json` output on stdout clean
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();

    let config = cli.config.as_deref();

    match cli.command {
        Commands::Ingest {
            files,
            json,
            output,
            day_first,
        } => commands::cmd_ingest(config, &files, json, output.as_deref(), day_first),
        Commands::Detect { file, day_first } => commands::cmd_detect(config, &file, day_first),
        Commands::Export {
            files,
            output,
            day_first,
        } => commands::cmd_export(config, &files, &output, day_first),
        Commands::Serve { port, host } => commands::cmd_serve(config, &host, port).await,
    }
}
