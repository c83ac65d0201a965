//! Statement upload handler

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::{AppError, AppState, MAX_UPLOAD_SIZE};
use tally_core::{
    CapturingDiagnostics, DateOrder, DiagnosticEvent, Ingestor, ParseOutcome, SourceFile, Tee,
    TracingDiagnostics,
};

/// Outcome of one uploaded file plus what was reported while ingesting it
#[derive(Debug, Serialize)]
pub struct FileResult {
    pub file: String,
    pub outcome: ParseOutcome,
    pub diagnostics: Vec<DiagnosticEvent>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub results: Vec<FileResult>,
}

/// POST /api/ingest - Normalize one or more statement files
///
/// Expects multipart form with:
/// - file: statement file, repeatable (CSV or spreadsheet; total request max 10MB)
/// - date_order: `month_first` or `day_first` for ambiguous dates (optional)
///
/// Results come back in upload order. A file that fails to parse gets a
/// failure outcome; the request itself still succeeds.
pub async fn ingest_files(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>, AppError> {
    let mut files: Vec<SourceFile> = Vec::new();
    let mut date_order: Option<DateOrder> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::payload_too_large(&format!(
                "Upload too large. Maximum size is {} MB",
                MAX_UPLOAD_SIZE / 1024 / 1024
            ))
        } else {
            AppError::bad_request(&format!("Failed to read form field: {}", e))
        }
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" | "files" => {
                let file_name = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("upload-{}", files.len() + 1));
                let mime = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;

                debug!(file = %file_name, mime = ?mime, bytes = bytes.len(), "Received upload");
                let mut file = SourceFile::new(file_name, bytes.to_vec());
                if let Some(mime) = mime {
                    file = file.with_mime(mime);
                }
                files.push(file);
            }
            "date_order" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read date_order"))?;
                if !value.trim().is_empty() {
                    date_order = Some(
                        value
                            .trim()
                            .parse()
                            .map_err(|e: String| AppError::bad_request(&e))?,
                    );
                }
            }
            _ => {}
        }
    }

    if files.is_empty() {
        return Err(AppError::bad_request("Missing file field"));
    }

    let ingestor = match date_order {
        Some(order) => Ingestor::new(state.ingestor.config().with_date_order(order)),
        None => state.ingestor.clone(),
    };

    // Decoding and parsing are CPU-bound
    let results = tokio::task::spawn_blocking(move || ingest_batch(&ingestor, files)).await?;

    let succeeded = results.iter().filter(|r| r.outcome.is_success()).count();
    info!(files = results.len(), succeeded, "Processed upload batch");

    Ok(Json(IngestResponse { results }))
}

/// Ingest files in order, capturing each file's diagnostics separately
pub fn ingest_batch(ingestor: &Ingestor, files: Vec<SourceFile>) -> Vec<FileResult> {
    files
        .into_iter()
        .map(|file| {
            let captured = CapturingDiagnostics::new();
            let outcome = {
                let sink = Tee::new(&captured, &TracingDiagnostics);
                ParseOutcome::from(ingestor.ingest(&file, &sink))
            };
            FileResult {
                file: file.name,
                outcome,
                diagnostics: captured.take(),
            }
        })
        .collect()
}
