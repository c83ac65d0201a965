//! Detect command implementation

use std::path::Path;

use anyhow::Result;
use tally_core::Role;

use super::{build_ingestor, read_source, truncate};

/// Print the column role map and the decisions behind it
pub fn cmd_detect(config_path: Option<&Path>, file: &Path, day_first: bool) -> Result<()> {
    let ingestor = build_ingestor(config_path, day_first)?;
    let source = read_source(file)?;

    let grid = ingestor.decode(&source)?;
    let classification = ingestor.classify(&grid);

    println!("🔎 Column detection for {}", source.name);
    println!("   {} columns, {} data rows", grid.column_count(), grid.rows.len());
    println!();

    for role in Role::ALL {
        let decision = classification.decisions.iter().find(|d| d.role == role);
        match decision {
            Some(d) => {
                let score = d
                    .score
                    .map(|s| format!(", score {}", s))
                    .unwrap_or_default();
                println!(
                    "   {:<12} → column {} \"{}\" ({}{})",
                    role.as_str(),
                    d.column,
                    truncate(&d.header, 30),
                    d.tier.as_str(),
                    score
                );
            }
            None => println!("   {:<12} → not found", role.as_str()),
        }
    }

    if !classification.roles.has_date_or_amount() {
        println!();
        println!("   ⚠️  No date or amount column; this file cannot be ingested");
    }

    Ok(())
}
