//! Chat handlers

use axum::{
    extract::{Query, State},
    Json,
};
use contractforge_common::{
    chat::ChatReply,
    db::models::ChatMessage,
    errors::Result,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::LimitQuery;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, max = 10000))]
    pub message: String,

    /// Restrict retrieval to these documents; empty means all
    #[serde(default)]
    pub document_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize)]
pub struct ChatHistoryResponse {
    pub messages: Vec<ChatMessage>,
    pub total: usize,
}

/// Ask a question over the uploaded contracts
pub async fn ask(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatReply>> {
    request.validate()?;

    let reply = state
        .chat
        .ask(&request.message, request.document_ids.as_deref())
        .await?;
    Ok(Json(reply))
}

/// Chat log, oldest first
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ChatHistoryResponse>> {
    let messages = state.chat.history(query.limit).await?;
    Ok(Json(ChatHistoryResponse {
        total: messages.len(),
        messages,
    }))
}
