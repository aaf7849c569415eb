use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::error;

use agora_chat::ChatError;
use agora_types::api::InboxMode;

use crate::AppStateInner;
use crate::middleware::Claims;

#[derive(Debug, Deserialize)]
pub struct ChatQuery {
    /// Counterparty user id.
    pub with: String,
}

/// GET /ads/{ad_id}/chat?with={user_id} — resolves the conversation and
/// returns its full view, transcript included.
pub async fn get_chat(
    State(state): State<Arc<AppStateInner>>,
    Path(ad_id): Path<i64>,
    Query(query): Query<ChatQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    // Run blocking DB reads off the async runtime
    let chat = state.chat.clone();
    let view = tokio::task::spawn_blocking(move || chat.get_chat(ad_id, &claims.sub, &query.with))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(chat_error_status)?;

    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
pub struct InboxQuery {
    #[serde(default)]
    pub mode: InboxMode,
}

/// GET /inbox?mode=buying|selling — latest message per (ad, counterparty)
/// pair. Mode defaults to buying.
pub async fn get_inbox(
    State(state): State<Arc<AppStateInner>>,
    Query(query): Query<InboxQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, StatusCode> {
    let chat = state.chat.clone();
    let view = tokio::task::spawn_blocking(move || chat.get_inbox(&claims.sub, query.mode))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .map_err(chat_error_status)?;

    Ok(Json(view))
}

fn chat_error_status(err: ChatError) -> StatusCode {
    match err {
        // Chat resolution treats a bad participant pair the same as a
        // missing ad or user: there is no such conversation.
        ChatError::AdNotFound | ChatError::UserNotFound | ChatError::InvalidParticipants => {
            StatusCode::NOT_FOUND
        }
        ChatError::EmptyMessage | ChatError::ContentTooLong => StatusCode::BAD_REQUEST,
        ChatError::ImageUploadFailed(_) => StatusCode::BAD_GATEWAY,
        ChatError::Storage(e) => {
            error!("storage error: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
