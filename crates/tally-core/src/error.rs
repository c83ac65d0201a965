//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failure to turn file bytes into a grid
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("CSV decoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet decoding failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook has no sheets")]
    NoSheets,
}

/// File-fatal ingestion failures
///
/// Each of these stops processing of one file only; sibling files in a batch
/// are unaffected.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Unsupported file format: {name} ({mime})")]
    UnsupportedFormat { name: String, mime: String },

    #[error("Could not read {name}: {source}")]
    Decode {
        name: String,
        #[source]
        source: DecodeError,
    },

    #[error("No header row found in {0}")]
    NoHeaders(String),

    #[error("No date or amount column could be detected in {0}")]
    NoDetectableColumns(String),
}

impl IngestError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            Self::Decode { .. } => FailureKind::DecodeFailed,
            Self::NoHeaders(_) => FailureKind::NoHeaders,
            Self::NoDetectableColumns(_) => FailureKind::NoDetectableColumns,
        }
    }
}

/// Serializable discriminant of [`IngestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnsupportedFormat,
    DecodeFailed,
    NoHeaders,
    NoDetectableColumns,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat => "unsupported_format",
            Self::DecodeFailed => "decode_failed",
            Self::NoHeaders => "no_headers",
            Self::NoDetectableColumns => "no_detectable_columns",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-row extraction failure (never file-fatal)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("Unusable date value: {0}")]
    Date(String),

    #[error("Unusable amount value: {0}")]
    Amount(String),
}
