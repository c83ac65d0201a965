//! Export command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::{export::export_to_path, ParseOutcome, TracingDiagnostics};

use super::{build_ingestor, collect_transactions, ensure_any_success, read_sources};

/// Ingest files and write every transaction to one export CSV
pub fn cmd_export(
    config_path: Option<&Path>,
    files: &[PathBuf],
    output: &Path,
    day_first: bool,
) -> Result<()> {
    let ingestor = build_ingestor(config_path, day_first)?;
    let sources = read_sources(files)?;

    println!("📦 Exporting {} files...", sources.len());

    let outcomes = ingestor.ingest_all(&sources, &TracingDiagnostics);
    for outcome in &outcomes {
        match &outcome.outcome {
            ParseOutcome::Success(ingested) => {
                println!("   ✅ {}: {} transactions", outcome.file, ingested.transactions.len())
            }
            ParseOutcome::Failure { message, .. } => {
                println!("   ❌ {}: {}", outcome.file, message)
            }
        }
    }
    ensure_any_success(&outcomes)?;

    let transactions = collect_transactions(&outcomes);
    export_to_path(output, &transactions)
        .with_context(|| format!("Failed to write export: {}", output.display()))?;

    println!("✅ Exported {} transactions to: {}", transactions.len(), output.display());
    Ok(())
}
