//! HTTP request handlers

use super::sse::sse_stream;
use super::types::{
    ConversationView, DraftAttachmentRequest, DraftTextRequest, ErrorResponse, SubmitResponse,
    SuccessResponse,
};
use super::AppState;
use crate::state_machine::state::DEFAULT_MEDIA_TYPE;
use crate::state_machine::Attachment;
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Largest request body accepted; base64 images dominate
const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Snapshot
        .route("/api/conversation", get(get_conversation))
        // SSE streaming
        .route("/api/conversation/stream", get(stream_conversation))
        // Draft
        .route("/api/draft", put(update_draft_text))
        .route(
            "/api/draft/attachment",
            put(update_draft_attachment).delete(clear_draft_attachment),
        )
        // Submission
        .route("/api/submit", post(submit))
        // Version
        .route("/version", get(get_version))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

// ============================================================
// Conversation
// ============================================================

async fn get_conversation(State(state): State<AppState>) -> Json<ConversationView> {
    Json(ConversationView::render(&state.session.snapshot()))
}

async fn stream_conversation(State(state): State<AppState>) -> impl IntoResponse {
    sse_stream(state.session.subscribe())
}

// ============================================================
// Draft
// ============================================================

async fn update_draft_text(
    State(state): State<AppState>,
    Json(req): Json<DraftTextRequest>,
) -> Json<SuccessResponse> {
    state.session.update_draft_text(req.text);
    Json(SuccessResponse { success: true })
}

async fn update_draft_attachment(
    State(state): State<AppState>,
    Json(req): Json<DraftAttachmentRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let bytes = STANDARD
        .decode(req.data.trim())
        .map_err(|e| AppError::BadRequest(format!("Invalid base64 image data: {e}")))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Image data is empty".to_string()));
    }

    let media_type = req
        .media_type
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MEDIA_TYPE.to_string());
    if !media_type.starts_with("image/") {
        return Err(AppError::BadRequest(format!(
            "Unsupported media type: {media_type}"
        )));
    }

    tracing::debug!(size = bytes.len(), %media_type, "Draft image attached");
    state
        .session
        .update_draft_attachment(Some(Attachment::new(bytes, media_type)));
    Ok(Json(SuccessResponse { success: true }))
}

async fn clear_draft_attachment(State(state): State<AppState>) -> Json<SuccessResponse> {
    state.session.update_draft_attachment(None);
    Json(SuccessResponse { success: true })
}

// ============================================================
// Submission
// ============================================================

async fn submit(State(state): State<AppState>) -> Json<SubmitResponse> {
    let submission_id = state.session.submit();
    Json(SubmitResponse {
        accepted: submission_id.is_some(),
        submission_id,
    })
}

async fn get_version() -> &'static str {
    concat!("gemini-talks ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
