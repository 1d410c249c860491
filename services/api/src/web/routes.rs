//! services/api/src/web/routes.rs
//!
//! Assembles the full axum application: public API, admin API, docs and the
//! static SPA bundle.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ConfigError;
use crate::error::ApiError;
use crate::web::middleware::{require_admin, require_auth};
use crate::web::{admin, assistant, auth, rest, state::AppState};

const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Creates the settings row and seed accounts if they are missing.
pub async fn initialize(state: &AppState) -> Result<(), ApiError> {
    state.settings.bootstrap().await?;
    auth::seed_accounts(&state.db, state.config.admin_seed.as_ref()).await?;
    info!("Store initialized");
    Ok(())
}

pub fn build_router(state: Arc<AppState>) -> Result<Router, ApiError> {
    let origin = state
        .config
        .allowed_origin
        .parse::<HeaderValue>()
        .map_err(|e| ConfigError::InvalidValue("ALLOWED_ORIGIN".to_string(), e.to_string()))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/api/health", get(rest::health_handler))
        .route("/api/settings", get(rest::get_settings_handler))
        .route("/api/register", post(auth::register_handler))
        .route("/api/login", post(auth::login_handler))
        .route("/api/logout", post(auth::logout_handler))
        .route("/api/analyze", post(rest::analyze_handler))
        .route("/api/verify/{id}", post(rest::verify_handler))
        .route("/api/history", get(rest::history_handler))
        .route("/api/location/{id}", get(rest::location_handler))
        .route("/api/trend", get(rest::trend_handler))
        .route("/api/chat", post(assistant::chat_handler))
        .route("/api/suggestions", post(assistant::suggestions_handler));

    // Routes for any logged-in user
    let user_routes = Router::new()
        .route("/api/me", get(auth::me_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    // Admin routes (admin bearer token required)
    let admin_routes = Router::new()
        .route("/api/admin/settings", post(admin::update_settings_handler))
        .route(
            "/api/admin/prompt-history",
            get(admin::list_prompts_handler).post(admin::save_prompt_handler),
        )
        .route("/api/admin/files", get(admin::list_files_handler))
        .route("/api/admin/read-file", post(admin::read_file_handler))
        .route("/api/admin/write-file", post(admin::write_file_handler))
        .route("/api/admin/builder/preview", post(admin::builder_preview_handler))
        .route("/api/admin/builder/apply", post(admin::builder_apply_handler))
        .route("/api/admin/stats", get(admin::stats_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    let static_dir = &state.config.static_dir;
    let spa = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    let api_router = Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .with_state(state.clone());

    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", rest::ApiDoc::openapi()))
        .fallback_service(spa)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(app)
}
