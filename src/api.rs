//! HTTP surface - JSON over HTTP, consumed by the browser client.

use crate::config::Settings;
use crate::dataset::{self, DatasetHandle};
use crate::error::DataRoomError;
use crate::pipeline::ChatPipeline;
use crate::response::ChatResponse;
use crate::session::SessionStore;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
    pub pipeline: Arc<ChatPipeline>,
    pub settings: Arc<Settings>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Leave some headroom over the dataset limit for multipart framing.
    let body_limit = state.settings.max_file_size + 1024 * 1024;

    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/chat", post(chat))
        .route("/api/session/:id", get(session_info))
        .route("/api/reset", post(reset))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Error wrapper mapping the crate taxonomy onto HTTP statuses.
pub struct ApiError(DataRoomError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DataRoomError::Validation(_) | DataRoomError::EmptyDataset => StatusCode::BAD_REQUEST,
            DataRoomError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({
            "success": false,
            "detail": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

impl From<DataRoomError> for ApiError {
    fn from(err: DataRoomError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct FileInfo {
    filename: String,
    row_count: usize,
    columns: Vec<String>,
    file_size: usize,
}

#[derive(Serialize)]
struct UploadResponse {
    success: bool,
    message: String,
    session_id: String,
    file_info: FileInfo,
}

#[derive(Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub question: String,
}

#[derive(Serialize)]
struct SessionInfo {
    session_id: String,
    filename: String,
    row_count: usize,
    columns: Vec<String>,
    message_count: usize,
}

#[derive(Deserialize)]
pub struct ResetRequest {
    pub session_id: String,
}

#[derive(Serialize)]
struct ResetResponse {
    success: bool,
    message: String,
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Data Room API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
        "endpoints": {
            "health": "/api/health",
            "upload": "/api/upload",
            "chat": "/api/chat",
            "session": "/api/session/{session_id}",
            "reset": "/api/reset"
        }
    }))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        DataRoomError::Validation(format!("Failed to read multipart field: {}", e))
    })? {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(String::from)
                .ok_or_else(|| DataRoomError::Validation("No filename provided".to_string()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| {
                    DataRoomError::Validation(format!("Failed to read file data: {}", e))
                })?
                .to_vec();
            file = Some((filename, bytes));
        }
    }

    let (filename, bytes) = file
        .ok_or_else(|| DataRoomError::Validation("No file provided in upload".to_string()))?;

    dataset::validate_upload(&filename, bytes.len(), state.settings.max_file_size)?;

    // Parsing and profiling are CPU-bound; keep them off the async workers.
    let parsed = tokio::task::spawn_blocking(move || -> Result<DatasetHandle, DataRoomError> {
        let handle = DatasetHandle::from_bytes(&filename, &bytes)?;
        handle.profile()?;
        Ok(handle)
    })
    .await
    .map_err(|e| DataRoomError::Validation(format!("Upload processing failed: {}", e)))??;

    let handle = Arc::new(parsed);
    let file_info = FileInfo {
        filename: handle.filename().to_string(),
        row_count: handle.row_count(),
        columns: handle.column_names(),
        file_size: handle.file_size(),
    };
    let session_id = state.store.create(Arc::clone(&handle)).await;

    info!(
        session_id,
        filename = %file_info.filename,
        rows = file_info.row_count,
        "Dataset uploaded"
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "File uploaded successfully".to_string(),
        session_id,
        file_info,
    }))
}

async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let response = state
        .pipeline
        .chat(&request.session_id, &request.question)
        .await?;
    Ok(Json(response))
}

async fn session_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionInfo>, ApiError> {
    let session = state.store.get(&id).await?;
    let message_count = state.store.history_len(&id).await?;

    Ok(Json(SessionInfo {
        session_id: id,
        filename: session.dataset.filename().to_string(),
        row_count: session.dataset.row_count(),
        columns: session.dataset.column_names(),
        message_count,
    }))
}

async fn reset(
    State(state): State<AppState>,
    Json(request): Json<ResetRequest>,
) -> Json<ResetResponse> {
    match state.store.reset(&request.session_id).await {
        Ok(()) => Json(ResetResponse {
            success: true,
            message: "Session reset successfully".to_string(),
        }),
        Err(_) => Json(ResetResponse {
            success: false,
            message: "Session not found".to_string(),
        }),
    }
}
