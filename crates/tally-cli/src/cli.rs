//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Normalize bank statement exports
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Turn heterogeneous bank exports into one transaction list", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Ingestion config file (defaults to the data dir override, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse statement files and print the normalized transactions
    Ingest {
        /// CSV or spreadsheet files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print per-file outcomes as JSON
        #[arg(long)]
        json: bool,

        /// Also write all transactions to this export CSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read ambiguous dates like 01/02/2024 as day/month
        #[arg(long)]
        day_first: bool,
    },

    /// Show which column was picked for each role, and why
    Detect {
        /// File to inspect
        file: PathBuf,

        /// Read ambiguous dates like 01/02/2024 as day/month
        #[arg(long)]
        day_first: bool,
    },

    /// Ingest files and write the combined export CSV
    Export {
        /// CSV or spreadsheet files to ingest
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output CSV path
        #[arg(short, long)]
        output: PathBuf,

        /// Read ambiguous dates like 01/02/2024 as day/month
        #[arg(long)]
        day_first: bool,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}
