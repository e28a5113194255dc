//! Learnova HTTP server.
//!
//! One handler per route; each is a single-shot, stateless transformation:
//! validate input, call the upload store / extractor / AI gateway, and map
//! the result to JSON. No handler retries, and no error escapes the
//! response-mapping boundary.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Landing page |
//! | `POST` | `/api/upload` | Upload a study file and return its extracted text |
//! | `POST` | `/api/syllabus/upload` | Ingest a syllabus material into the retrieval store |
//! | `GET`  | `/api/syllabus/list` | List ingested syllabus materials |
//! | `POST` | `/api/generate-content` | Generate educational content about a topic |
//! | `POST` | `/api/chat` | Answer a student question |
//! | `GET`  | `/api/health` | Health check (no external calls) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": "No file uploaded", "code": "validation" }
//! ```
//!
//! Validation failures are 400 with `code: "validation"`; extraction,
//! storage, and gateway failures are 500 with `code: "processing"`. The
//! request body is capped at the configured limit (16 MiB by default) at the
//! transport layer.

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::extract;
use crate::gateway::AiGateway;
use crate::models::{ChatRequest, ContentRequest, SyllabusMetadata};
use crate::upload::{extension, is_allowed, UploadStore};

/// Characters of extracted text returned by `/api/upload`.
const UPLOAD_PREVIEW_CHARS: usize = 1000;
/// Characters of extracted text returned by `/api/syllabus/upload`.
const SYLLABUS_PREVIEW_CHARS: usize = 500;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    gateway: Arc<dyn AiGateway>,
    store: UploadStore,
}

impl AppState {
    pub fn new(config: Arc<Config>, gateway: Arc<dyn AiGateway>) -> Self {
        let store = UploadStore::new(config.storage.upload_dir.clone());
        Self {
            config,
            gateway,
            store,
        }
    }
}

/// Builds the application router. Exposed separately from [`run_server`] so
/// tests can drive the routes in-process.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.storage.max_upload_bytes;

    Router::new()
        .route("/", get(handle_home))
        .route("/api/upload", post(handle_upload))
        .route("/api/syllabus/upload", post(handle_syllabus_upload))
        .route("/api/syllabus/list", get(handle_syllabus_list))
        .route("/api/generate-content", post(handle_generate_content))
        .route("/api/chat", post(handle_chat))
        .route("/api/health", get(handle_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server. Runs until the process is terminated.
pub async fn run_server(config: Arc<Config>, gateway: Arc<dyn AiGateway>) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let app = build_router(AppState::new(config, gateway));

    tracing::info!(addr = %bind_addr, "Learnova AI listening");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error body: the human-readable message plus a machine-readable code.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Typed error consumed by the single response-mapping boundary.
pub struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.message,
            code: self.code,
        };
        (self.status, Json(body)).into_response()
    }
}

/// 400 for missing/empty required fields and disallowed extensions.
fn validation_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "validation",
        message: message.into(),
    }
}

/// 500 for extraction, storage, and gateway failures.
fn processing_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "processing",
        message: message.into(),
    }
}

/// Truncates to the first `limit` characters, appending `"..."` iff the
/// input was longer.
fn truncate_preview(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

// ============ GET / ============

const FALLBACK_INDEX: &str =
    "<!doctype html><html><head><title>Learnova AI</title></head>\
     <body><h1>Learnova AI</h1><p>The API is running. See /api/health.</p></body></html>";

/// Serves the static landing page, falling back to a minimal inline page
/// when no `static/index.html` has been deployed.
async fn handle_home() -> Html<String> {
    match tokio::fs::read_to_string("static/index.html").await {
        Ok(page) => Html(page),
        Err(_) => Html(FALLBACK_INDEX.to_string()),
    }
}

// ============ GET /api/health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

/// Health check. Performs no external calls, so it reports healthy even
/// when the AI backend is down.
async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Learnova AI is running!",
    })
}

// ============ Multipart parsing ============

/// The fields the upload routes accept. Unknown fields are ignored.
#[derive(Default)]
struct UploadForm {
    /// (client filename, bytes) — present iff a `file` part was sent.
    file: Option<(String, Vec<u8>)>,
    education_level: Option<String>,
    subject: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(AppError {
                    status: e.status(),
                    code: "validation",
                    message: e.body_text(),
                })
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(|e| AppError {
                    status: e.status(),
                    code: "validation",
                    message: e.body_text(),
                })?;
                form.file = Some((filename, bytes.to_vec()));
            }
            "education_level" => {
                form.education_level = field.text().await.ok().filter(|s| !s.is_empty());
            }
            "subject" => {
                form.subject = field.text().await.ok().filter(|s| !s.is_empty());
            }
            _ => {}
        }
    }

    Ok(form)
}

/// Applies the documented validation ordering and returns the validated
/// (filename, bytes) pair: file part present, filename non-empty, extension
/// allowed.
fn validate_upload(form: &UploadForm) -> Result<(&str, &[u8]), AppError> {
    let (filename, bytes) = form
        .file
        .as_ref()
        .ok_or_else(|| validation_error("No file uploaded"))?;

    if filename.is_empty() {
        return Err(validation_error("No file selected"));
    }

    if !is_allowed(filename) {
        return Err(validation_error("Invalid file type"));
    }

    Ok((filename.as_str(), bytes.as_slice()))
}

/// Runs extraction on the blocking pool; PDF and DOCX parsing are CPU-bound.
async fn extract_in_blocking(bytes: Vec<u8>, ext: String) -> anyhow::Result<String> {
    let text = tokio::task::spawn_blocking(move || extract::extract_text(&bytes, &ext)).await??;
    Ok(text)
}

// ============ POST /api/upload ============

async fn handle_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let form = read_upload_form(multipart).await?;
    let (filename, bytes) = validate_upload(&form)?;

    let ext = extension(filename).unwrap_or_default();
    let (stored_name, _path) = state
        .store
        .save(filename, bytes)
        .await
        .map_err(|e| processing_error(format!("Error processing file: {}", e)))?;

    let text = extract_in_blocking(bytes.to_vec(), ext)
        .await
        .map_err(|e| processing_error(format!("Error processing file: {}", e)))?;

    tracing::info!(filename = %stored_name, chars = text.chars().count(), "file processed");

    Ok(Json(serde_json::json!({
        "success": true,
        "filename": stored_name,
        "content": truncate_preview(&text, UPLOAD_PREVIEW_CHARS),
        "message": "File processed successfully",
    })))
}

// ============ POST /api/syllabus/upload ============

async fn handle_syllabus_upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let form = read_upload_form(multipart).await?;
    let (filename, bytes) = validate_upload(&form)?;

    let ext = extension(filename).unwrap_or_default();
    let (stored_name, _path) = state
        .store
        .save_with_prefix("syllabus_", filename, bytes)
        .await
        .map_err(|e| processing_error(format!("Error processing syllabus: {}", e)))?;

    let text = extract_in_blocking(bytes.to_vec(), ext)
        .await
        .map_err(|e| processing_error(format!("Error processing syllabus: {}", e)))?;

    let defaults = &state.config.defaults;
    let metadata = SyllabusMetadata::now(
        form.education_level
            .clone()
            .unwrap_or_else(|| defaults.education_level.clone()),
        form.subject
            .clone()
            .unwrap_or_else(|| defaults.subject.clone()),
    );

    let embedded = state
        .gateway
        .add_syllabus_materials(&stored_name, &text, &metadata)
        .await
        .map_err(|e| processing_error(format!("Error processing syllabus: {}", e)))?;

    if !embedded {
        return Err(processing_error("Failed to process syllabus material"));
    }

    tracing::info!(filename = %stored_name, subject = %metadata.subject, "syllabus material embedded");

    Ok(Json(serde_json::json!({
        "success": true,
        "filename": stored_name,
        "message": "Syllabus material embedded successfully",
        "preview": truncate_preview(&text, SYLLABUS_PREVIEW_CHARS),
    })))
}

// ============ GET /api/syllabus/list ============

async fn handle_syllabus_list(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let materials = state
        .gateway
        .list_uploaded_syllabus()
        .await
        .map_err(|e| processing_error(format!("Error listing materials: {}", e)))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "materials": materials,
    })))
}

// ============ POST /api/generate-content ============

async fn handle_generate_content(
    State(state): State<AppState>,
    Json(request): Json<ContentRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.topic.is_empty() {
        return Err(validation_error("Topic is required"));
    }

    let content = state
        .gateway
        .generate_content(&request)
        .await
        .map_err(|e| processing_error(format!("Error generating content: {}", e)))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "content": content,
        "content_type": request.content_type,
    })))
}

// ============ POST /api/chat ============

async fn handle_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.question.is_empty() {
        return Err(validation_error("Question is required"));
    }

    let response = state
        .gateway
        .chat(&request)
        .await
        .map_err(|e| processing_error(format!("Error in chat: {}", e)))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "response": response,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncation_appends_ellipsis_beyond_limit() {
        let long = "a".repeat(1500);
        let preview = truncate_preview(&long, 1000);
        assert_eq!(preview.len(), 1003);
        assert_eq!(&preview[..1000], "a".repeat(1000).as_str());
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn truncation_leaves_short_text_unchanged() {
        let short = "b".repeat(500);
        assert_eq!(truncate_preview(&short, 1000), short);
    }

    #[test]
    fn truncation_boundary_is_exclusive() {
        let exact = "c".repeat(1000);
        assert_eq!(truncate_preview(&exact, 1000), exact);
        let over = "c".repeat(1001);
        assert!(truncate_preview(&over, 1000).ends_with("..."));
    }

    #[test]
    fn truncation_counts_chars_not_bytes() {
        let text = "é".repeat(1001);
        let preview = truncate_preview(&text, 1000);
        assert_eq!(preview.chars().count(), 1003);
        assert!(preview.ends_with("..."));
    }

    #[test]
    fn validate_upload_ordering() {
        let mut form = UploadForm::default();
        assert_eq!(
            validate_upload(&form).unwrap_err().message,
            "No file uploaded"
        );

        form.file = Some((String::new(), b"x".to_vec()));
        assert_eq!(
            validate_upload(&form).unwrap_err().message,
            "No file selected"
        );

        form.file = Some(("virus.exe".to_string(), b"x".to_vec()));
        assert_eq!(
            validate_upload(&form).unwrap_err().message,
            "Invalid file type"
        );

        form.file = Some(("notes.txt".to_string(), b"x".to_vec()));
        assert!(validate_upload(&form).is_ok());
    }
}
