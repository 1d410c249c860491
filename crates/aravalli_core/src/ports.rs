//! crates/aravalli_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, the
//! file system or hosted language models.

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::analysis::SimulatedReadings;
use crate::domain::{
    AnalysisRecord, AuthSession, NewAnalysis, NewUser, PromptHistoryItem, Role, SettingsRecord,
    Suggestion, User, UserCredentials, Verification,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("External service error: {0}")]
    ExternalService(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- User Management ---
    /// Inserts a user. A taken username yields `PortError::Conflict`.
    async fn create_user(&self, user: &NewUser) -> PortResult<i64>;

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials>;

    /// Sets the password hash and role of an existing user.
    async fn update_user_credentials(
        &self,
        user_id: i64,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<()>;

    /// Deletes a user and all of their sessions. Returns whether a user existed.
    async fn delete_user(&self, username: &str) -> PortResult<bool>;

    async fn count_users(&self) -> PortResult<i64>;

    // --- Auth Sessions ---
    async fn create_auth_session(&self, token: &str, user_id: i64) -> PortResult<AuthSession>;

    /// Resolves a token to its user, or `PortError::Unauthorized`.
    async fn validate_auth_session(&self, token: &str) -> PortResult<User>;

    async fn delete_auth_session(&self, token: &str) -> PortResult<()>;

    // --- Settings ---
    async fn get_settings(&self) -> PortResult<Option<SettingsRecord>>;

    /// Stores `document` as version 1 if no settings row exists yet.
    async fn ensure_settings(&self, document: &serde_json::Value) -> PortResult<()>;

    /// Overwrites the settings document and bumps its version.
    async fn save_settings(&self, document: &serde_json::Value) -> PortResult<SettingsRecord>;

    // --- Prompt History ---
    async fn append_prompt(&self, prompt: &str) -> PortResult<PromptHistoryItem>;

    async fn recent_prompts(&self, limit: i64) -> PortResult<Vec<PromptHistoryItem>>;

    async fn count_prompts(&self) -> PortResult<i64>;

    // --- Analyses ---
    async fn save_analysis(&self, analysis: &NewAnalysis) -> PortResult<AnalysisRecord>;

    async fn recent_analyses(&self, limit: i64) -> PortResult<Vec<AnalysisRecord>>;

    async fn set_verification(&self, analysis_id: i64, verdict: Verification) -> PortResult<()>;
}

/// Access to the application's own editable source tree.
#[async_trait]
pub trait SourceFileService: Send + Sync {
    /// Sorted relative paths of every editable file.
    async fn list_files(&self) -> PortResult<Vec<String>>;

    async fn read_file(&self, path: &str) -> PortResult<String>;

    async fn write_file(&self, path: &str, content: &str) -> PortResult<()>;

    async fn remove_file(&self, path: &str) -> PortResult<()>;
}

#[async_trait]
pub trait CodeGenerationService: Send + Sync {
    /// Picks the files relevant to `request`. Unparseable model output is an empty selection.
    async fn select_files(&self, request: &str, available: &[String]) -> PortResult<Vec<String>>;

    /// Returns complete replacement contents keyed by path.
    async fn generate_changes(
        &self,
        request: &str,
        files: &BTreeMap<String, String>,
    ) -> PortResult<BTreeMap<String, String>>;
}

#[async_trait]
pub trait ChatService: Send + Sync {
    /// Answers a user's message, staying on the environmental-monitoring topic.
    async fn reply(&self, message: &str) -> PortResult<String>;
}

#[async_trait]
pub trait ImageInsightService: Send + Sync {
    /// Describes a satellite image given as a `data:` URL.
    async fn describe_image(&self, data_url: &str) -> PortResult<String>;
}

#[async_trait]
pub trait SuggestionService: Send + Sync {
    async fn generate_suggestions(&self) -> PortResult<Vec<Suggestion>>;
}

/// Source of raw sensor readings for an analysis.
///
/// Today this is random; a real sensor or model pipeline can replace it
/// without touching callers.
pub trait AnalysisSimulator: Send + Sync {
    fn sample(&self) -> SimulatedReadings;
}
