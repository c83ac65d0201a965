//! Tally Core Library
//!
//! Normalizes bank statement exports with unknown layouts into one
//! transaction shape:
//! - Date and amount parsing across institution-specific encodings
//! - Content-first column role detection (date, amount, description, account)
//! - Row materialization with per-row failure tracking
//! - CSV and spreadsheet decoding
//! - Export/import of the normalized transaction CSV

pub mod amounts;
pub mod classify;
pub mod config;
pub mod dates;
pub mod decode;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod grid;
pub mod ingest;
pub mod materialize;
pub mod models;

pub use amounts::AmountParser;
pub use classify::{
    score_column, Classification, ColumnClassifier, ColumnRoleMap, Role, RoleDecision, Tier,
};
pub use config::{DateConfig, DateOrder, DetectionConfig, IngestConfig, ScoringWeights};
pub use dates::{excel_serial_to_date, DateFormat, DateParser};
pub use decode::{FileKind, GridDecoder, TabularDecoder};
pub use diagnostics::{
    CapturingDiagnostics, DiagnosticEvent, Diagnostics, Level, Tee, TracingDiagnostics,
};
pub use error::{DecodeError, Error, FailureKind, IngestError, Result, RowError};
pub use export::{read_transactions_csv, write_transactions_csv, EXPORT_HEADERS};
pub use grid::{RawCell, RawGrid};
pub use ingest::Ingestor;
pub use materialize::{materialize, CellExtractor, Materialized, ValueParsers};
pub use models::{FileOutcome, Ingested, ParseOutcome, RowFailure, SourceFile, Transaction};
