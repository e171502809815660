//! HTTP boundary tests, driven in-process through the axum router.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use flashcard_rag::document::FormatLoader;
use flashcard_rag::embed::HashingEmbedder;
use flashcard_rag::error::CollaboratorError;
use flashcard_rag::llm::GenerativeModel;
use flashcard_rag::pipeline::Pipeline;
use flashcard_rag::recovery::RawModelResponse;
use flashcard_rag::server::{AppState, router};

const BOUNDARY: &str = "flashcard-test-boundary";

struct FixedModel(&'static str);

impl GenerativeModel for FixedModel {
    fn generate(&self, _: &str, _: &str) -> Result<RawModelResponse, CollaboratorError> {
        Ok(RawModelResponse::from(self.0))
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

struct FailingModel;

impl GenerativeModel for FailingModel {
    fn generate(&self, _: &str, _: &str) -> Result<RawModelResponse, CollaboratorError> {
        Err(CollaboratorError::Status {
            service: "gemini".into(),
            status: 403,
            body: "API key not valid".into(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

fn app(model: impl GenerativeModel + 'static, scratch: &Path) -> Router {
    let pipeline = Pipeline::new(
        Box::new(FormatLoader),
        Box::new(HashingEmbedder::new(64)),
        Box::new(model),
    );
    router(Arc::new(AppState::new(pipeline, scratch)), 1024 * 1024)
}

fn upload(uri: &str, field: &str, file_name: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn scratch_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}

const NOTES: &[u8] = b"Osmosis is the diffusion of water across a membrane.";

#[tokio::test]
async fn health_reports_version() {
    let dir = tempfile::TempDir::new().unwrap();
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(FixedModel("{}"), dir.path()), request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn upload_returns_flashcards_and_cleans_up() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(
        FixedModel("```json\n{\"What is osmosis?\": \"Diffusion of water\"}\n```"),
        dir.path(),
    );
    let (status, body) = send(app, upload("/generate", "file", "notes.txt", NOTES)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        serde_json::json!({
            "flashcards": [{"id": 0, "question": "What is osmosis?", "answer": "Diffusion of water"}]
        })
    );
    assert!(scratch_is_empty(dir.path()));
}

#[tokio::test]
async fn api_upload_alias_serves_the_same_pipeline() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(FixedModel("{'Q': 'A'}"), dir.path());
    let (status, body) = send(app, upload("/api/upload", "file", "notes.md", NOTES)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["flashcards"][0]["question"], "Q");
}

#[tokio::test]
async fn unparseable_model_output_is_empty_success() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(FixedModel("!!!not json at all!!!"), dir.path());
    let (status, body) = send(app, upload("/generate", "file", "notes.txt", NOTES)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!({ "flashcards": [] }));
}

#[tokio::test]
async fn missing_file_field_is_bad_request() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(FixedModel("{}"), dir.path());
    let (status, body) = send(app, upload("/generate", "document", "notes.txt", NOTES)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No file uploaded");
}

#[tokio::test]
async fn invalid_pdf_is_server_error_and_cleans_up() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(FixedModel("{}"), dir.path());
    let (status, body) = send(
        app,
        upload("/generate", "file", "lecture.pdf", b"not really a pdf"),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(
        body["detail"].as_str().unwrap().contains("not a readable PDF"),
        "detail: {body}"
    );
    assert!(scratch_is_empty(dir.path()));
}

#[tokio::test]
async fn collaborator_failure_message_is_preserved() {
    let dir = tempfile::TempDir::new().unwrap();
    let app = app(FailingModel, dir.path());
    let (status, body) = send(app, upload("/generate", "file", "notes.txt", NOTES)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("403"));
    assert!(detail.contains("API key not valid"));
    assert!(scratch_is_empty(dir.path()));
}
