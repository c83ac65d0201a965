//! Ingest command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tally_core::{
    export::export_to_path, FileOutcome, Ingested, ParseOutcome, TracingDiagnostics,
};

use super::{build_ingestor, collect_transactions, read_sources, truncate};

pub fn cmd_ingest(
    config_path: Option<&Path>,
    files: &[PathBuf],
    json: bool,
    output: Option<&Path>,
    day_first: bool,
) -> Result<()> {
    let ingestor = build_ingestor(config_path, day_first)?;
    let sources = read_sources(files)?;

    let outcomes = ingestor.ingest_all(&sources, &TracingDiagnostics);

    if json {
        let body =
            serde_json::to_string_pretty(&outcomes).context("Failed to serialize outcomes")?;
        println!("{}", body);
    } else {
        for outcome in &outcomes {
            print_outcome(outcome);
        }
    }

    if let Some(path) = output {
        let transactions = collect_transactions(&outcomes);
        export_to_path(path, &transactions)
            .with_context(|| format!("Failed to write export: {}", path.display()))?;
        if !json {
            println!("💾 Wrote {} transactions to {}", transactions.len(), path.display());
        }
    }

    ensure_any_success(&outcomes)
}

/// Error out only when every file failed
pub fn ensure_any_success(outcomes: &[FileOutcome]) -> Result<()> {
    if !outcomes.is_empty() && outcomes.iter().all(|o| !o.outcome.is_success()) {
        anyhow::bail!("None of the {} files could be ingested", outcomes.len());
    }
    Ok(())
}

fn print_outcome(outcome: &FileOutcome) {
    println!();
    println!("📄 {}", outcome.file);

    match &outcome.outcome {
        ParseOutcome::Success(ingested) => print_ingested(ingested),
        ParseOutcome::Failure { kind, message } => {
            println!("   ❌ {} ({})", message, kind);
        }
    }
}

fn print_ingested(ingested: &Ingested) {
    println!("   ✅ {} transactions", ingested.transactions.len());
    if !ingested.failed_rows.is_empty() {
        println!("   ⚠️  {} rows skipped", ingested.failed_rows.len());
        for failure in &ingested.failed_rows {
            println!("      row {}: {}", failure.row, failure.reason);
        }
    }
    if ingested.fallback_dates > 0 {
        println!(
            "   ⚠️  {} rows had unreadable dates (defaulted to today)",
            ingested.fallback_dates
        );
    }
    if ingested.fallback_amounts > 0 {
        println!(
            "   ⚠️  {} rows had unreadable amounts (defaulted to 0)",
            ingested.fallback_amounts
        );
    }

    if ingested.transactions.is_empty() {
        return;
    }

    println!();
    println!(
        "   {:<10}  {:>12}  {:<40}  {}",
        "Date", "Amount", "Description", "Account"
    );
    println!("   {}", "-".repeat(80));
    for tx in &ingested.transactions {
        println!(
            "   {:<10}  {:>12}  {:<40}  {}",
            tx.date.format("%Y-%m-%d").to_string(),
            tx.amount.to_string(),
            truncate(&tx.description, 40),
            tx.account
        );
    }
}
