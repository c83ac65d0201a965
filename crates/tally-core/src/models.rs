//! Domain models for Tally

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classify::ColumnRoleMap;
use crate::error::{FailureKind, IngestError};

/// A file handed to the orchestrator
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// File name, used for format routing and as the default account label
    pub name: String,
    /// Declared MIME type, a secondary routing signal
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Lowercased extension of the file name
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    /// File name without its extension (default account label)
    pub fn stem(&self) -> String {
        account_label(&self.name)
    }
}

/// Strip the directory and final extension from a file name
pub fn account_label(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or(file_name)
        .to_string()
}

/// A normalized transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Opaque unique token
    pub id: String,
    pub date: NaiveDate,
    /// Negative = outflow, positive = inflow
    pub amount: Decimal,
    pub description: String,
    pub account: String,
    pub source_file: String,
    /// Never set during ingestion; carried for the export format
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        account: impl Into<String>,
        source_file: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            date,
            amount,
            description: description.into(),
            account: account.into(),
            source_file: source_file.into(),
            category: None,
        }
    }
}

/// A data row that could not be turned into a transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowFailure {
    /// 1-based data row number (the header is not counted)
    pub row: usize,
    /// Cell contents as displayed
    pub raw: Vec<String>,
    pub reason: String,
}

/// Successful ingestion of one file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingested {
    pub transactions: Vec<Transaction>,
    /// Original header row, for display
    pub detected_columns: Vec<String>,
    pub roles: ColumnRoleMap,
    pub failed_rows: Vec<RowFailure>,
    /// Rows whose date could not be read and defaulted to today
    pub fallback_dates: usize,
    /// Rows whose amount could not be read and defaulted to zero
    pub fallback_amounts: usize,
}

/// Per-file result in serializable form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParseOutcome {
    Success(Ingested),
    Failure { kind: FailureKind, message: String },
}

impl ParseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn ingested(&self) -> Option<&Ingested> {
        match self {
            Self::Success(ingested) => Some(ingested),
            Self::Failure { .. } => None,
        }
    }
}

impl From<Result<Ingested, IngestError>> for ParseOutcome {
    fn from(result: Result<Ingested, IngestError>) -> Self {
        match result {
            Ok(ingested) => Self::Success(ingested),
            Err(e) => Self::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

/// One entry of a batch result, in submission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileOutcome {
    pub file: String,
    pub outcome: ParseOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_label() {
        assert_eq!(account_label("checking.csv"), "checking");
        assert_eq!(account_label("statements/2024.jan.xlsx"), "2024.jan");
        assert_eq!(account_label("noext"), "noext");
    }

    #[test]
    fn test_source_file_extension() {
        assert_eq!(SourceFile::new("A.CSV", vec![]).extension().as_deref(), Some("csv"));
        assert_eq!(SourceFile::new("README", vec![]).extension(), None);
    }

    #[test]
    fn test_transaction_ids_are_unique() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let a = Transaction::new(date, Decimal::ONE, "x", "acct", "f.csv");
        let b = Transaction::new(date, Decimal::ONE, "x", "acct", "f.csv");
        assert_ne!(a.id, b.id);
        assert_eq!(a.category, None);
    }

    #[test]
    fn test_failure_outcome_serialization() {
        let outcome = ParseOutcome::from(Err(IngestError::NoDetectableColumns("notes.csv".into())));
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["kind"], "no_detectable_columns");
        assert!(!outcome.is_success());
    }

    #[test]
    fn test_success_outcome_serialization() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let ingested = Ingested {
            transactions: vec![Transaction::new(date, Decimal::new(-7500, 2), "Coffee", "a", "a.csv")],
            detected_columns: vec!["Date".into(), "Amount".into()],
            roles: ColumnRoleMap::default(),
            failed_rows: vec![],
            fallback_dates: 0,
            fallback_amounts: 0,
        };
        let value = serde_json::to_value(ParseOutcome::Success(ingested)).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["detected_columns"], json!(["Date", "Amount"]));
        assert_eq!(value["transactions"][0]["amount"], "-75.00");
        assert_eq!(value["transactions"][0]["date"], "2024-01-15");
    }
}
