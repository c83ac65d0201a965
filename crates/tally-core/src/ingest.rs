//! Ingestion orchestrator
//!
//! Routes a file to a decoder, classifies its columns and materializes its
//! rows. File-fatal problems come back as [`IngestError`]; per-row problems
//! are carried inside [`Ingested`] and reported to the diagnostics sink.

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::json;
use tracing::debug;

use crate::classify::{Classification, ColumnClassifier};
use crate::dates::match_signature;
use crate::config::IngestConfig;
use crate::decode::{FileKind, GridDecoder, TabularDecoder};
use crate::diagnostics::{Diagnostics, Level};
use crate::error::IngestError;
use crate::grid::RawGrid;
use crate::materialize::{materialize, CellExtractor, ValueParsers};
use crate::models::{FileOutcome, Ingested, ParseOutcome, SourceFile};

/// Statement file → transactions
#[derive(Clone)]
pub struct Ingestor {
    config: IngestConfig,
    decoder: Arc<dyn TabularDecoder + Send + Sync>,
    classifier: ColumnClassifier,
    parsers: ValueParsers,
}

impl Default for Ingestor {
    fn default() -> Self {
        Self::new(IngestConfig::default())
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Ingestor {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            decoder: Arc::new(GridDecoder),
            classifier: ColumnClassifier::new(&config),
            parsers: ValueParsers::from_config(&config),
        }
    }

    /// Swap the tabular decoder
    pub fn with_decoder(mut self, decoder: impl TabularDecoder + Send + Sync + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    /// Pin the fallback date
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.parsers = self.parsers.with_today(today);
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Extension first, declared MIME type second
    pub fn detect_kind(&self, file: &SourceFile) -> Result<FileKind, IngestError> {
        file.extension()
            .and_then(|ext| FileKind::from_extension(&ext))
            .or_else(|| file.mime.as_deref().and_then(FileKind::from_mime))
            .ok_or_else(|| IngestError::UnsupportedFormat {
                name: file.name.clone(),
                mime: file.mime.clone().unwrap_or_else(|| "unknown".to_string()),
            })
    }

    /// Route and decode a file into a grid
    pub fn decode(&self, file: &SourceFile) -> Result<RawGrid, IngestError> {
        let kind = self.detect_kind(file)?;
        debug!(file = %file.name, kind = %kind, bytes = file.bytes.len(), "Decoding file");

        self.decoder
            .decode(&file.bytes, kind)
            .map_err(|source| IngestError::Decode {
                name: file.name.clone(),
                source,
            })
    }

    /// Column roles of a decoded grid, with the decision trace
    pub fn classify(&self, grid: &RawGrid) -> Classification {
        self.classifier.classify(&grid.headers, &grid.rows)
    }

    /// Ingest one file
    pub fn ingest(
        &self,
        file: &SourceFile,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Ingested, IngestError> {
        let result = self
            .decode(file)
            .and_then(|grid| self.ingest_grid_with(&file.name, &grid, &self.parsers, diagnostics));

        if let Err(e) = &result {
            diagnostics.report(
                Level::Error,
                &e.to_string(),
                json!({ "file": file.name, "kind": e.kind() }),
            );
        }
        result
    }

    /// Ingest an already decoded grid
    pub fn ingest_grid(
        &self,
        file_name: &str,
        grid: &RawGrid,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Ingested, IngestError> {
        self.ingest_grid_with(file_name, grid, &self.parsers, diagnostics)
    }

    /// Ingest a grid with a caller-supplied cell extractor
    pub fn ingest_grid_with(
        &self,
        file_name: &str,
        grid: &RawGrid,
        extractor: &dyn CellExtractor,
        diagnostics: &dyn Diagnostics,
    ) -> Result<Ingested, IngestError> {
        if !grid.has_headers() {
            return Err(IngestError::NoHeaders(file_name.to_string()));
        }

        let classification = self.classify(grid);
        let roles = classification.roles;

        diagnostics.report(
            Level::Info,
            "Detected columns",
            json!({
                "file": file_name,
                "headers": grid.headers,
                "roles": roles,
                "decisions": classification.decisions,
            }),
        );

        if !roles.has_date_or_amount() {
            return Err(IngestError::NoDetectableColumns(file_name.to_string()));
        }
        if roles.date.is_none() {
            diagnostics.report(
                Level::Warning,
                "No date column detected; every date defaults to today",
                json!({ "file": file_name, "date": extractor.fallback_date() }),
            );
        }

        let out = materialize(&roles, &grid.headers, &grid.rows, file_name, extractor);

        for failure in &out.failures {
            diagnostics.report(
                Level::Warning,
                &format!("Row {} skipped: {}", failure.row, failure.reason),
                json!({ "file": file_name, "row": failure.row, "raw": failure.raw }),
            );
        }
        if let Some(column) = roles.date {
            for &row in &out.fallback_dates {
                let value = grid.cell(row - 1, column).display();
                // Some when the text has a date shape but is not a real date
                let shape = match_signature(&value).map(|format| format.name());
                diagnostics.report(
                    Level::Warning,
                    &format!("Row {} has an unreadable date; using today", row),
                    json!({
                        "file": file_name,
                        "row": row,
                        "value": value,
                        "shape": shape,
                        "date": extractor.fallback_date(),
                    }),
                );
            }
        }
        if let Some(column) = roles.amount {
            for &row in &out.fallback_amounts {
                diagnostics.report(
                    Level::Warning,
                    &format!("Row {} has an unreadable amount; using 0", row),
                    json!({
                        "file": file_name,
                        "row": row,
                        "value": grid.cell(row - 1, column).display(),
                    }),
                );
            }
        }

        diagnostics.report(
            Level::Success,
            &format!("Imported {} transactions from {}", out.transactions.len(), file_name),
            json!({
                "file": file_name,
                "transactions": out.transactions.len(),
                "failed_rows": out.failures.len(),
                "fallback_dates": out.fallback_dates.len(),
                "fallback_amounts": out.fallback_amounts.len(),
            }),
        );

        Ok(Ingested {
            transactions: out.transactions,
            detected_columns: grid.headers.clone(),
            roles,
            failed_rows: out.failures,
            fallback_dates: out.fallback_dates.len(),
            fallback_amounts: out.fallback_amounts.len(),
        })
    }

    /// Ingest files one after another, in submission order
    ///
    /// A failing file never stops the files after it.
    pub fn ingest_all(&self, files: &[SourceFile], diagnostics: &dyn Diagnostics) -> Vec<FileOutcome> {
        files
            .iter()
            .map(|file| FileOutcome {
                file: file.name.clone(),
                outcome: ParseOutcome::from(self.ingest(file, diagnostics)),
            })
            .collect()
    }
}
