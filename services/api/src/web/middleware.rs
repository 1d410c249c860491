//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use aravalli_core::domain::{Role, User};
use aravalli_core::ports::PortError;
use std::sync::Arc;
use tracing::warn;

use crate::error::ApiError;
use crate::web::state::AppState;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_whitespace().nth(1))
        .filter(|token| !token.is_empty())
}

/// Resolves the bearer token in `headers` to its user.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, ApiError> {
    let token =
        bearer_token(headers).ok_or_else(|| ApiError::Unauthorized("No token".to_string()))?;

    state
        .db
        .validate_auth_session(token)
        .await
        .map_err(|e| match e {
            PortError::Unauthorized => ApiError::Unauthorized("Invalid token".to_string()),
            other => ApiError::Port(other),
        })
}

/// Middleware that validates the bearer token.
///
/// If valid, inserts the `User` into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Like `require_auth`, but the user must also hold the admin role (403 otherwise).
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(&state, req.headers()).await?;
    if user.role != Role::Admin {
        warn!(user = %user.username, path = %req.uri().path(), "Non-admin hit an admin route");
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
