//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how each
//! variant is rendered as an HTTP response.

use crate::config::ConfigError;
use aravalli_core::builder::BuilderError;
use aravalli_core::ports::PortError;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A site builder run that stopped part-way.
    #[error("Site builder error: {0}")]
    Builder(#[from] BuilderError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents an error while applying embedded migrations.
    #[error("Migration Error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed request fields.
    #[error("{0}")]
    Validation(String),

    /// Missing, unknown or rejected credentials.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed.
    #[error("{0}")]
    Forbidden(String),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            ApiError::Port(port) => match port {
                PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
                PortError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
                PortError::InvalidPath(_) => (StatusCode::BAD_REQUEST, "Invalid path".to_string()),
                PortError::ExternalService(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
                PortError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
                PortError::Unexpected(_) => internal(),
            },
            ApiError::Builder(err) => match err {
                BuilderError::EmptyRequest | BuilderError::NothingToApply => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                BuilderError::ReadFailed { source: PortError::InvalidPath(_), .. }
                | BuilderError::SnapshotFailed { source: PortError::InvalidPath(_), .. }
                | BuilderError::WriteFailed { source: PortError::InvalidPath(_), .. } => {
                    (StatusCode::BAD_REQUEST, err.to_string())
                }
                BuilderError::NoFilesSelected
                | BuilderError::NoChanges
                | BuilderError::Service { .. } => (StatusCode::BAD_GATEWAY, err.to_string()),
                BuilderError::ReadFailed { .. }
                | BuilderError::SnapshotFailed { .. }
                | BuilderError::WriteFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
                }
            },
            ApiError::Config(_)
            | ApiError::Database(_)
            | ApiError::Migration(_)
            | ApiError::Io(_)
            | ApiError::Internal(_) => internal(),
        }
    }
}

fn internal() -> (StatusCode, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
