//! CLI command implementations
//!
//! Commands are organized by purpose:
//! - `ingest` - Parse statements and print the result
//! - `detect` - Column role inspection for a single file
//! - `export` - Write the combined export CSV
//! - `serve` - Web server command

pub mod detect;
pub mod export;
pub mod ingest;
pub mod serve;

// Re-export command functions for main.rs
pub use detect::*;
pub use export::*;
pub use ingest::*;
pub use serve::*;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tally_core::{DateOrder, FileOutcome, IngestConfig, Ingestor, SourceFile, Transaction};

/// Load the ingestion config, applying the `--day-first` override
pub fn load_config(config_path: Option<&Path>, day_first: bool) -> Result<IngestConfig> {
    let config = IngestConfig::load(config_path).context("Failed to load ingestion config")?;
    Ok(if day_first {
        config.with_date_order(DateOrder::DayFirst)
    } else {
        config
    })
}

pub fn build_ingestor(config_path: Option<&Path>, day_first: bool) -> Result<Ingestor> {
    Ok(Ingestor::new(load_config(config_path, day_first)?))
}

/// Read a file from disk into a `SourceFile` named after its file name
pub fn read_source(path: &Path) -> Result<SourceFile> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to open file: {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceFile::new(name, bytes))
}

pub fn read_sources(paths: &[impl AsRef<Path>]) -> Result<Vec<SourceFile>> {
    paths.iter().map(|p| read_source(p.as_ref())).collect()
}

/// All transactions of the successful outcomes, in file order
pub fn collect_transactions(outcomes: &[FileOutcome]) -> Vec<Transaction> {
    outcomes
        .iter()
        .filter_map(|o| o.outcome.ingested())
        .flat_map(|i| i.transactions.iter().cloned())
        .collect()
}

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
