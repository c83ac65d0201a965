//! Tally Web Server
//!
//! Axum-based upload API: statement files go in as multipart form data,
//! one outcome per file comes back as JSON.
//!
//! Safety limits:
//! - Restrictive CORS policy (same-origin unless origins are configured)
//! - Upload size cap on the whole request body
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{error, info};

use tally_core::{IngestConfig, Ingestor};

mod handlers;

/// Maximum upload size per request (10 MB)
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Server configuration
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// Parsing and detection settings applied to every upload
    pub ingest: IngestConfig,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub ingestor: Ingestor,
}

/// Create the application router
pub fn create_router(config: ServerConfig) -> Router {
    create_router_with_ingestor(Ingestor::new(config.ingest), &config.allowed_origins)
}

/// Create the router around a prepared ingestor (for testing)
pub fn create_router_with_ingestor(ingestor: Ingestor, allowed_origins: &[String]) -> Router {
    let state = Arc::new(AppState { ingestor });

    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/ingest", post(handlers::ingest_files));

    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        // Axum's own 2 MB multipart default is replaced by our cap
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the server
pub async fn serve(config: ServerConfig, host: &str, port: u16) -> anyhow::Result<()> {
    let date_order = config.ingest.dates.ambiguous_order;
    let app = create_router(config);
    let addr = format!("{}:{}", host, port);

    info!(%date_order, "Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn payload_too_large(msg: &str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Clients get a generic message; the cause is logged
            message: "An internal error occurred".to_string(),
            internal: Some(err.into()),
        }
    }
}
