//! HTTP surface for docsum.
//!
//! This module exposes a compact Axum router:
//!
//! - `POST /api/upload` – Accept one multipart file field named `document` (PDF, JPEG, or PNG,
//!   at most 10 MiB) and return its extracted text. Extraction failures still return `200` with
//!   `extraction: null`.
//! - `POST /api/summarize` – Summarize `{ "text": ..., "length": "short" | "medium" | "long" }`.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Upload and summary counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! Every failure is answered with `{ "success": false, "error": <message> }`.

use crate::extraction::{ExtractionResult, MediaType};
use crate::metrics::MetricsSnapshot;
use crate::service::{DocumentApi, UploadedDocument};
use crate::summarization::{SummarizeError, SummaryLength, SummaryResult};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "document";
const FILE_TOO_LARGE: &str = "Upload error: File too large";
// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Build the HTTP router exposing the extraction and summarization API.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route(
            "/api/upload",
            post(upload_document::<S>)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route("/api/summarize", post(summarize_text::<S>))
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(service)
}

/// Success response for `POST /api/upload`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    message: &'static str,
    original_name: Option<String>,
    mimetype: String,
    size: usize,
    extraction: Option<ExtractionResult>,
}

/// Accept an uploaded document and attempt to extract its text.
///
/// Only the `document` field may carry a file; plain text fields are ignored. Media type and
/// size limits are enforced before the service sees the bytes.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError>
where
    S: DocumentApi,
{
    let mut multipart = multipart.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::bad_request(FILE_TOO_LARGE)
        } else {
            AppError::bad_request(rejection.body_text())
        }
    })?;
    let mut document = None;
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some(UPLOAD_FIELD) {
            if field.file_name().is_some() {
                return Err(AppError::bad_request("Upload error: Unexpected field"));
            }
            continue;
        }
        let media_type = field.content_type().unwrap_or_default().to_string();
        if MediaType::from_mime(&media_type).is_err() {
            return Err(AppError::bad_request(
                "Only .pdf, .jpg and .png files are allowed!",
            ));
        }
        let original_name = field.file_name().map(str::to_string);
        let bytes = field.bytes().await.map_err(upload_error)?;
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::bad_request(FILE_TOO_LARGE));
        }
        document = Some(UploadedDocument::new(bytes, media_type, original_name));
        break;
    }

    let Some(document) = document else {
        return Err(AppError::bad_request("No file uploaded"));
    };

    let outcome = service.process_upload(document).await;
    tracing::info!(
        file = outcome.original_name.as_deref().unwrap_or("<unnamed>"),
        size = outcome.size_bytes,
        extracted = outcome.extraction.is_some(),
        "Upload request completed"
    );
    Ok(Json(UploadResponse {
        success: true,
        message: "File processed successfully",
        original_name: outcome.original_name,
        mimetype: outcome.media_type,
        size: outcome.size_bytes,
        extraction: outcome.extraction,
    }))
}

fn upload_error(error: MultipartError) -> AppError {
    tracing::warn!(%error, "Rejected multipart upload");
    let message = if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FILE_TOO_LARGE.to_string()
    } else {
        format!("Upload error: {}", error.body_text())
    };
    AppError::bad_request(message)
}

/// Request body for `POST /api/summarize`.
#[derive(Deserialize)]
struct SummarizeRequest {
    /// Text to summarize.
    #[serde(default)]
    text: Option<String>,
    /// Optional length token; anything other than `short`/`medium`/`long` means `medium`.
    #[serde(default)]
    length: Option<serde_json::Value>,
}

/// Success response for `POST /api/summarize`.
#[derive(Serialize)]
struct SummarizeResponse {
    success: bool,
    summary: SummaryResult,
}

/// Summarize the supplied text.
async fn summarize_text<S>(
    State(service): State<Arc<S>>,
    request: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError>
where
    S: DocumentApi,
{
    let Json(request) = request.map_err(|rejection| AppError {
        status: rejection.status(),
        message: rejection.body_text(),
    })?;
    let text = request.text.unwrap_or_default();
    let length = SummaryLength::from_token(
        request
            .length
            .as_ref()
            .and_then(serde_json::Value::as_str),
    );
    let summary = service.summarize(&text, length).await?;
    Ok(Json(SummarizeResponse {
        success: true,
        summary,
    }))
}

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    Json(json!({
        "success": true,
        "message": "Server is running",
        "timestamp": timestamp,
    }))
}

/// Return request counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload",
                method: "POST",
                path: "/api/upload",
                description: "Upload one PDF, JPEG, or PNG (max 10 MiB) as multipart field `document`. Response returns { \"success\": true, \"extraction\": { \"text\": string, ... } | null }.",
                request_example: None,
            },
            CommandDescriptor {
                name: "summarize",
                method: "POST",
                path: "/api/summarize",
                description: "Summarize text to roughly 100 (short), 250 (medium), or 500 (long) words.",
                request_example: Some(json!({
                    "text": "Document contents",
                    "length": "short"
                })),
            },
            CommandDescriptor {
                name: "health",
                method: "GET",
                path: "/health",
                description: "Liveness probe.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return upload and summarization counters.",
                request_example: None,
            },
        ],
    })
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "success": false, "error": self.message })),
        )
            .into_response()
    }
}

impl From<SummarizeError> for AppError {
    fn from(inner: SummarizeError) -> Self {
        let status = match inner {
            SummarizeError::EmptyInput => StatusCode::BAD_REQUEST,
            SummarizeError::SummarizationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %inner, "Summarize request failed");
        }
        Self {
            status,
            message: inner.to_string(),
        }
    }
}
