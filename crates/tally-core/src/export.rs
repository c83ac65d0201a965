//! Export and re-import of normalized transactions
//!
//! The export is a CSV with a fixed column order:
//! `Date,Amount,Description,Account,SourceFile,Category`.
//! Ids are not exported; re-imported transactions get fresh ones.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::Transaction;

/// Header row of the export format
pub const EXPORT_HEADERS: [&str; 6] = [
    "Date",
    "Amount",
    "Description",
    "Account",
    "SourceFile",
    "Category",
];

/// One line of the export CSV
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ExportRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Amount")]
    amount: String,
    #[serde(rename = "Description")]
    description: String,
    #[serde(rename = "Account")]
    account: String,
    #[serde(rename = "SourceFile")]
    source_file: String,
    #[serde(rename = "Category", default)]
    category: Option<String>,
}

impl From<&Transaction> for ExportRow {
    fn from(tx: &Transaction) -> Self {
        Self {
            date: tx.date.format("%Y-%m-%d").to_string(),
            amount: tx.amount.to_string(),
            description: tx.description.clone(),
            account: tx.account.clone(),
            source_file: tx.source_file.clone(),
            category: tx.category.clone(),
        }
    }
}

impl ExportRow {
    fn into_transaction(self, line: usize) -> Result<Transaction> {
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d").map_err(|e| {
            Error::InvalidData(format!("line {}: bad date '{}': {}", line, self.date, e))
        })?;
        let amount = Decimal::from_str(self.amount.trim()).map_err(|e| {
            Error::InvalidData(format!("line {}: bad amount '{}': {}", line, self.amount, e))
        })?;

        let mut tx = Transaction::new(date, amount, self.description, self.account, self.source_file);
        tx.category = self.category.filter(|c| !c.trim().is_empty());
        Ok(tx)
    }
}

/// Write transactions in the export format
pub fn write_transactions_csv<W: Write>(writer: W, transactions: &[Transaction]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if transactions.is_empty() {
        wtr.write_record(EXPORT_HEADERS)?;
    }
    for tx in transactions {
        wtr.serialize(ExportRow::from(tx))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read transactions back from the export format
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<Transaction>> {
    let mut rdr = csv::Reader::from_reader(reader);

    let headers = rdr.headers()?.clone();
    if headers.iter().ne(EXPORT_HEADERS.iter().copied()) {
        return Err(Error::InvalidData(format!(
            "unexpected export header: {}",
            headers.iter().collect::<Vec<_>>().join(",")
        )));
    }

    rdr.deserialize::<ExportRow>()
        .enumerate()
        .map(|(i, row)| row?.into_transaction(i + 2))
        .collect()
}

/// Write the export CSV to a file
pub fn export_to_path(path: &Path, transactions: &[Transaction]) -> Result<()> {
    let file = File::create(path)?;
    write_transactions_csv(file, transactions)
}

/// Read an export CSV from a file
pub fn import_from_path(path: &Path) -> Result<Vec<Transaction>> {
    let file = File::open(path)?;
    read_transactions_csv(file)
}
