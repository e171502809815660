//! HTTP boundary (feature `server`).
//!
//! `POST /generate` (also mounted at `/api/upload`) takes a multipart upload
//! in the `file` field and answers `{"flashcards": [...]}`. Failures answer
//! `{"detail": "<message>"}`: 400 when no file was sent, 500 when the
//! pipeline fails. Each upload lives in a temp file that is removed when the
//! request finishes, whatever the outcome.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::flashcard::FlashcardResponse;
use crate::pipeline::Pipeline;

/// Shared by all requests. Holds no per-request data.
pub struct AppState {
    pipeline: Arc<Pipeline>,
    scratch_dir: PathBuf,
}

impl AppState {
    pub fn new(pipeline: Pipeline, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body: `{"detail": "..."}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub detail: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorDetail { detail: self.detail })).into_response()
    }
}

/// Build the application router.
pub fn router(state: Arc<AppState>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .route("/api/upload", post(generate))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

struct Upload {
    file_name: Option<String>,
    data: Vec<u8>,
}

async fn generate(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<FlashcardResponse>, ApiError> {
    let upload = read_upload(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request("No file uploaded"))?;

    tracing::info!(
        file = upload.file_name.as_deref().unwrap_or("(unnamed)"),
        bytes = upload.data.len(),
        "received upload"
    );

    let file = persist_upload(&state.scratch_dir, &upload)
        .map_err(|e| ApiError::internal(format!("failed to store upload: {e}")))?;

    let pipeline = Arc::clone(&state.pipeline);
    let outcome = tokio::task::spawn_blocking(move || {
        let report = pipeline.run(file.path());
        // A panic in `run` unwinds through here and drops the file as well.
        drop(file);
        report
    })
    .await;

    match outcome {
        Ok(Ok(report)) => Ok(Json(FlashcardResponse::new(report.flashcards))),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "generation failed");
            Err(ApiError::internal(e.to_string()))
        }
        Err(e) => {
            tracing::error!(error = %e, "generation task aborted");
            Err(ApiError::internal(format!("generation task failed: {e}")))
        }
    }
}

/// The `file` field, or `None` if the form has no non-empty file.
async fn read_upload(multipart: &mut Multipart) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
        if data.is_empty() && file_name.is_none() {
            return Ok(None);
        }
        return Ok(Some(Upload {
            file_name,
            data: data.to_vec(),
        }));
    }
    Ok(None)
}

/// Write the upload to a temp file that keeps the original extension.
fn persist_upload(dir: &Path, upload: &Upload) -> std::io::Result<tempfile::NamedTempFile> {
    let suffix = upload
        .file_name
        .as_deref()
        .and_then(|n| Path::new(n).extension())
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| ".pdf".to_string());

    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(&upload.data)?;
    file.flush()?;
    Ok(file)
}
