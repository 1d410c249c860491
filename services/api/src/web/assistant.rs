//! services/api/src/web/assistant.rs
//!
//! The conservation chatbot and suggestion generator.

use axum::{extract::State, Json};
use aravalli_core::domain::Suggestion;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::state::AppState;

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Serialize, ToSchema)]
pub struct SuggestionDto {
    pub category: String,
    pub title: String,
    pub description: String,
    pub impact: String,
}

impl From<Suggestion> for SuggestionDto {
    fn from(s: Suggestion) -> Self {
        Self {
            category: s.category,
            title: s.title,
            description: s.description,
            impact: s.impact,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<SuggestionDto>,
}

/// Ask the Aravalli assistant a question. Off-topic questions are politely declined.
#[utoipa::path(
    post,
    path = "/api/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Assistant reply", body = ChatResponse),
        (status = 400, description = "Message required"),
        (status = 502, description = "Model unavailable")
    )
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = req
        .message
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Message required".to_string()))?;
    debug!(chars = message.len(), "Chat message received");

    let reply = state.chat.reply(&message).await?;
    Ok(Json(ChatResponse { reply }))
}

#[utoipa::path(
    post,
    path = "/api/suggestions",
    responses(
        (status = 200, description = "Fresh conservation suggestions", body = SuggestionsResponse),
        (status = 502, description = "Model unavailable or unparseable")
    )
)]
pub async fn suggestions_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuggestionsResponse>, ApiError> {
    let suggestions = state.suggestions.generate_suggestions().await?;
    Ok(Json(SuggestionsResponse {
        suggestions: suggestions.into_iter().map(SuggestionDto::from).collect(),
    }))
}
