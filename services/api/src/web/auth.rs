//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for registration, login, logout and the current
//! user, plus the account seeding run at startup.

use axum::{extract::State, Extension, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use aravalli_core::domain::{NewUser, Role, User};
use aravalli_core::ports::{DatabaseService, PortError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::AdminSeed;
use crate::error::ApiError;
use crate::web::extract::ApiJson;
use crate::web::state::AppState;

/// Username and password of the demo account created on first start.
const TEST_ACCOUNT: &str = "user";
const LEGACY_ADMIN: &str = "admin";

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub success: bool,
    pub user_id: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub username: String,
    pub role: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LogoutRequest {
    pub token: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Serialize, ToSchema)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub role: String,
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user: CurrentUser,
}

//=========================================================================================
// Password Helpers
//=========================================================================================

fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            ApiError::Internal("Failed to hash password".to_string())
        })
}

fn password_matches(password: &str, hashed: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(hashed).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        ApiError::Internal("Authentication error".to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "User created", body = RegisterResponse),
        (status = 400, description = "Username and password required"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let (Some(username), Some(password)) = (non_empty(req.username), non_empty(req.password))
    else {
        return Err(ApiError::Validation(
            "Username and password required".to_string(),
        ));
    };

    let user = NewUser {
        username,
        hashed_password: hash_password(&password)?,
        name: non_empty(req.name),
        dob: non_empty(req.dob),
        contact: non_empty(req.contact),
        email: non_empty(req.email),
        role: Role::User,
    };
    let user_id = state.db.create_user(&user).await.map_err(|e| match e {
        PortError::Conflict(_) => PortError::Conflict("Username already exists".to_string()),
        other => other,
    })?;

    info!(user_id, username = %user.username, "User registered");
    Ok(Json(RegisterResponse {
        success: true,
        user_id: user_id.to_string(),
    }))
}

/// POST /api/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());
    let (Some(username), Some(password)) = (req.username, req.password) else {
        return Err(invalid());
    };

    // 1. Look the user up
    let creds = match state.db.get_user_credentials(&username).await {
        Ok(creds) => creds,
        Err(PortError::NotFound(_)) => return Err(invalid()),
        Err(e) => return Err(e.into()),
    };

    // 2. Verify password
    if !password_matches(&password, &creds.hashed_password)? {
        return Err(invalid());
    }

    // 3. Issue a session token
    let token = Uuid::new_v4().to_string();
    state.db.create_auth_session(&token, creds.user_id).await?;

    info!(user_id = creds.user_id, "User logged in");
    Ok(Json(LoginResponse {
        success: true,
        token,
        username: creds.username,
        role: creds.role.as_str().to_string(),
    }))
}

/// POST /api/logout - Invalidate a token. Unknown or missing tokens are fine.
#[utoipa::path(
    post,
    path = "/api/logout",
    request_body = LogoutRequest,
    responses((status = 200, description = "Logged out", body = SuccessResponse))
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<LogoutRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    if let Some(token) = non_empty(req.token) {
        state.db.delete_auth_session(&token).await?;
    }
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/me - The user behind the bearer token
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Current user", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = []))
)]
pub async fn me_handler(Extension(user): Extension<User>) -> Json<MeResponse> {
    Json(MeResponse {
        user: CurrentUser {
            id: user.id,
            username: user.username,
            role: user.role.as_str().to_string(),
        },
    })
}

//=========================================================================================
// Startup Seeding
//=========================================================================================

/// Creates the demo account and the configured admin.
///
/// When an admin other than `admin` is configured, the old `admin` account
/// and its sessions are deleted.
pub async fn seed_accounts(
    db: &Arc<dyn DatabaseService>,
    admin: Option<&AdminSeed>,
) -> Result<(), ApiError> {
    match db.get_user_credentials(TEST_ACCOUNT).await {
        Ok(_) => {}
        Err(PortError::NotFound(_)) => {
            db.create_user(&NewUser {
                username: TEST_ACCOUNT.to_string(),
                hashed_password: hash_password(TEST_ACCOUNT)?,
                name: Some("Test User".to_string()),
                dob: None,
                contact: None,
                email: None,
                role: Role::User,
            })
            .await?;
            info!("Seeded the test account");
        }
        Err(e) => return Err(e.into()),
    }

    let Some(seed) = admin else {
        warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; no admin account seeded");
        return Ok(());
    };

    let hashed = hash_password(&seed.password)?;
    match db.get_user_credentials(&seed.username).await {
        Ok(existing) => {
            db.update_user_credentials(existing.user_id, &hashed, Role::Admin)
                .await?;
            info!(username = %seed.username, "Admin account updated");
        }
        Err(PortError::NotFound(_)) => {
            db.create_user(&NewUser {
                username: seed.username.clone(),
                hashed_password: hashed,
                name: Some("Administrator".to_string()),
                dob: None,
                contact: None,
                email: None,
                role: Role::Admin,
            })
            .await?;
            info!(username = %seed.username, "Admin account created");
        }
        Err(e) => return Err(e.into()),
    }

    if seed.username != LEGACY_ADMIN && db.delete_user(LEGACY_ADMIN).await? {
        info!("Removed the legacy admin account and its sessions");
    }
    Ok(())
}
