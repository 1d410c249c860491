//! services/api/src/web/admin.rs
//!
//! Admin-only endpoints: settings, prompt history, source files, the AI site
//! builder and dashboard stats. Every route here sits behind `require_admin`.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use aravalli_core::domain::{PendingWrite, PromptHistoryItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::web::auth::SuccessResponse;
use crate::web::extract::ApiJson;
use crate::web::state::AppState;

const PROMPT_HISTORY_LIMIT: i64 = 10;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct UpdateSettingsRequest {
    #[schema(value_type = Object)]
    pub config: Option<serde_json::Value>,
}

#[derive(Serialize, ToSchema)]
pub struct UpdateSettingsResponse {
    pub success: bool,
    pub version: i64,
}

#[derive(Deserialize, ToSchema)]
pub struct PromptRequest {
    pub prompt: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct PromptDto {
    pub id: i64,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
}

impl From<PromptHistoryItem> for PromptDto {
    fn from(item: PromptHistoryItem) -> Self {
        Self {
            id: item.id,
            prompt: item.prompt,
            timestamp: item.timestamp,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PromptHistoryResponse {
    pub prompts: Vec<PromptDto>,
}

#[derive(Serialize, ToSchema)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ReadFileRequest {
    pub path: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ReadFileResponse {
    pub content: String,
}

#[derive(Deserialize, ToSchema)]
pub struct WriteFileRequest {
    pub path: Option<String>,
    pub content: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct ChangeDto {
    pub path: String,
    pub original: String,
    pub updated: String,
}

#[derive(Serialize, ToSchema)]
pub struct PreviewResponse {
    pub changes: Vec<ChangeDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApprovedChange {
    pub path: String,
    pub updated: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ApplyRequest {
    pub prompt: Option<String>,
    #[serde(default)]
    pub changes: Vec<ApprovedChange>,
}

#[derive(Serialize, ToSchema)]
pub struct ApplyResponse {
    pub success: bool,
    pub applied: usize,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SiteStats {
    pub total_users: i64,
    pub site_version: String,
    pub ai_requests: i64,
}

#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub stats: SiteStats,
}

fn required(value: Option<String>, message: &str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| ApiError::Validation(message.to_string()))
}

//=========================================================================================
// Settings and Prompt History
//=========================================================================================

/// Replace the site settings document.
#[utoipa::path(
    post,
    path = "/api/admin/settings",
    request_body = UpdateSettingsRequest,
    responses(
        (status = 200, description = "Settings saved", body = UpdateSettingsResponse),
        (status = 400, description = "Config required"),
        (status = 401, description = "Not logged in"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer" = []))
)]
pub async fn update_settings_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<UpdateSettingsRequest>,
) -> Result<Json<UpdateSettingsResponse>, ApiError> {
    let config = req
        .config
        .filter(|c| !c.is_null())
        .ok_or_else(|| ApiError::Validation("Config required".to_string()))?;
    let record = state.settings.set(config).await?;
    Ok(Json(UpdateSettingsResponse {
        success: true,
        version: record.version,
    }))
}

#[utoipa::path(
    post,
    path = "/api/admin/prompt-history",
    request_body = PromptRequest,
    responses(
        (status = 201, description = "Prompt saved", body = SuccessResponse),
        (status = 400, description = "Prompt is required")
    ),
    security(("bearer" = []))
)]
pub async fn save_prompt_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PromptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = required(req.prompt, "Prompt is required")?;
    state.db.append_prompt(&prompt).await?;
    Ok((StatusCode::CREATED, Json(SuccessResponse { success: true })))
}

#[utoipa::path(
    get,
    path = "/api/admin/prompt-history",
    responses((status = 200, description = "Ten most recent prompts", body = PromptHistoryResponse)),
    security(("bearer" = []))
)]
pub async fn list_prompts_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PromptHistoryResponse>, ApiError> {
    let prompts = state.db.recent_prompts(PROMPT_HISTORY_LIMIT).await?;
    Ok(Json(PromptHistoryResponse {
        prompts: prompts.into_iter().map(PromptDto::from).collect(),
    }))
}

//=========================================================================================
// Source Files
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/admin/files",
    responses((status = 200, description = "Editable source files", body = FileListResponse)),
    security(("bearer" = []))
)]
pub async fn list_files_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FileListResponse>, ApiError> {
    let files = state.files.list_files().await?;
    Ok(Json(FileListResponse { files }))
}

#[utoipa::path(
    post,
    path = "/api/admin/read-file",
    request_body = ReadFileRequest,
    responses(
        (status = 200, description = "File content", body = ReadFileResponse),
        (status = 400, description = "Invalid path"),
        (status = 404, description = "File not found")
    ),
    security(("bearer" = []))
)]
pub async fn read_file_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ReadFileRequest>,
) -> Result<Json<ReadFileResponse>, ApiError> {
    let path = required(req.path, "Invalid path")?;
    let content = state.files.read_file(&path).await?;
    Ok(Json(ReadFileResponse { content }))
}

#[utoipa::path(
    post,
    path = "/api/admin/write-file",
    request_body = WriteFileRequest,
    responses(
        (status = 200, description = "File written", body = SuccessResponse),
        (status = 400, description = "Invalid path")
    ),
    security(("bearer" = []))
)]
pub async fn write_file_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<WriteFileRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let path = required(req.path, "Invalid path")?;
    let content = req
        .content
        .ok_or_else(|| ApiError::Validation("Content required".to_string()))?;
    state.files.write_file(&path, &content).await?;
    info!(path = %path, "Source file written by admin");
    Ok(Json(SuccessResponse { success: true }))
}

//=========================================================================================
// AI Site Builder
//=========================================================================================

/// Ask the model for changes. Nothing is written.
#[utoipa::path(
    post,
    path = "/api/admin/builder/preview",
    request_body = PromptRequest,
    responses(
        (status = 200, description = "Proposed changes", body = PreviewResponse),
        (status = 400, description = "Empty prompt"),
        (status = 502, description = "Model failed or proposed nothing")
    ),
    security(("bearer" = []))
)]
pub async fn builder_preview_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<PromptRequest>,
) -> Result<Json<PreviewResponse>, ApiError> {
    let prompt = req.prompt.unwrap_or_default();
    let preview = state.builder.preview(&prompt).await.map_err(|e| {
        error!(stage = ?e.failed_stage(), error = %e, "Site builder preview failed");
        e
    })?;

    Ok(Json(PreviewResponse {
        changes: preview
            .changes
            .into_iter()
            .map(|change| ChangeDto {
                path: change.path,
                original: change.original,
                updated: change.updated,
            })
            .collect(),
    }))
}

/// Write confirmed changes as one unit and record the prompt.
#[utoipa::path(
    post,
    path = "/api/admin/builder/apply",
    request_body = ApplyRequest,
    responses(
        (status = 200, description = "Changes written", body = ApplyResponse),
        (status = 400, description = "Nothing to apply or invalid path"),
        (status = 500, description = "A write failed; earlier writes were rolled back")
    ),
    security(("bearer" = []))
)]
pub async fn builder_apply_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<ApplyRequest>,
) -> Result<Json<ApplyResponse>, ApiError> {
    let writes: Vec<PendingWrite> = req
        .changes
        .into_iter()
        .map(|change| PendingWrite {
            path: change.path,
            content: change.updated,
        })
        .collect();

    let result = state.builder.apply(&writes).await;

    // The prompt is recorded whether or not the writes went through.
    if let Some(prompt) = req.prompt.filter(|p| !p.trim().is_empty()) {
        if let Err(e) = state.db.append_prompt(&prompt).await {
            error!(error = %e, "Failed to save prompt to history");
        }
    }

    let applied = result?;
    Ok(Json(ApplyResponse {
        success: true,
        applied,
    }))
}

//=========================================================================================
// Stats
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses((status = 200, description = "Dashboard counters", body = StatsResponse)),
    security(("bearer" = []))
)]
pub async fn stats_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatsResponse>, ApiError> {
    let total_users = state.db.count_users().await?;
    let ai_requests = state.db.count_prompts().await?;
    Ok(Json(StatsResponse {
        stats: SiteStats {
            total_users,
            site_version: env!("CARGO_PKG_VERSION").to_string(),
            ai_requests,
        },
    }))
}
