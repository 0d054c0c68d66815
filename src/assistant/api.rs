//! `POST /chat` endpoint.

use std::time::Duration;

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::Next,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::AssistantState;
use crate::widget::{MAX_IMAGE_BYTES, base64_len};

/// Room for the message text and JSON framing around the image.
const MESSAGE_HEADROOM: usize = 1024 * 1024;

/// Uploaded images arrive inline as base64, so the body must fit the
/// largest upload the site accepts after encoding.
pub const BODY_LIMIT: usize = base64_len(MAX_IMAGE_BYTES) + MESSAGE_HEADROOM;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Request body for the chat endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    /// User message; absent or null is treated as empty.
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Base64 image, optionally with a data URL prefix.
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub session_id: String,
}

/// Build the assistant router.
pub fn router(state: AssistantState) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(axum::middleware::from_fn(
            |req: Request, next: Next| async move {
                match tokio::time::timeout(REQUEST_TIMEOUT, next.run(req)).await {
                    Ok(res) => res,
                    Err(_) => (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response(),
                }
            },
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// POST /chat - Answer one user turn.
async fn chat(
    State(state): State<AssistantState>,
    Json(payload): Json<ChatPayload>,
) -> Result<Json<ChatResponse>, (StatusCode, Json<ErrorResponse>)> {
    let message = payload.message.unwrap_or_default();
    let session = state.sessions.resolve(payload.session_id.as_deref());

    tracing::info!(
        session_id = %session.id(),
        message_length = message.len(),
        has_image = payload.image.is_some(),
        "Received chat request"
    );

    session.add_user_message(message.as_str());
    let history = session.history();

    match state
        .router
        .route(&message, &history, payload.image.as_deref())
        .await
    {
        Ok(reply) => {
            session.add_assistant_message(reply.response.as_str());
            Ok(Json(ChatResponse {
                response: reply.response,
                session_id: session.id().to_string(),
            }))
        }
        Err(e) => {
            tracing::error!(session_id = %session.id(), error = %e, "Failed to process chat message");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: format!("Error processing message: {e}"),
                    session_id: session.id().to_string(),
                }),
            ))
        }
    }
}
