//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the public monitoring endpoints and the
//! master definition for the OpenAPI specification.

use crate::error::ApiError;
use crate::web::extract::{ApiJson, ApiPath};
use crate::web::state::AppState;
use crate::web::auth::SuccessResponse;
use crate::web::{admin, assistant, auth};
use axum::{
    extract::State,
    response::Json,
};
use aravalli_core::analysis::{assess, Assessment};
use aravalli_core::domain::{AnalysisRecord, NewAnalysis, Verification};
use aravalli_core::{hotspots, trend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};

const HISTORY_LIMIT: i64 = 50;
const UNKNOWN_LOCATION: &str = "Unknown Location";
pub const VISION_FALLBACK: &str =
    "Visual analysis service unavailable. Using statistical simulation.";

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        health_handler,
        get_settings_handler,
        analyze_handler,
        verify_handler,
        history_handler,
        location_handler,
        trend_handler,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::me_handler,
        admin::update_settings_handler,
        admin::save_prompt_handler,
        admin::list_prompts_handler,
        admin::list_files_handler,
        admin::read_file_handler,
        admin::write_file_handler,
        admin::builder_preview_handler,
        admin::builder_apply_handler,
        admin::stats_handler,
        assistant::chat_handler,
        assistant::suggestions_handler,
    ),
    components(
        schemas(
            HealthResponse, AnalyzeRequest, AnalyzeResponse, DetectedObjectDto, IndicesDto,
            VerifyRequest, AnalysisDto, LocationDetails, YearStatusDto, TrendResponse,
            NdviPoint, NightlightPoint
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Aravalli Watch API", description = "Environmental monitoring and admin site builder.")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub location: Option<String>,
    /// Image reference; a `data:image/...` URL also gets a visual explanation.
    pub image: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct DetectedObjectDto {
    pub label: String,
    pub count: u32,
}

#[derive(Serialize, ToSchema)]
pub struct IndicesDto {
    pub evi: f64,
    pub savi: f64,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub id: String,
    pub ndvi: f64,
    pub status: String,
    pub nightlight: f64,
    pub is_construction: bool,
    pub is_legal: bool,
    pub ml_confidence: f64,
    pub detected_objects: Vec<DetectedObjectDto>,
    pub indices: IndicesDto,
    pub prediction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl AnalyzeResponse {
    fn new(id: i64, assessment: Assessment, explanation: Option<String>) -> Self {
        Self {
            id: id.to_string(),
            ndvi: assessment.ndvi,
            status: assessment.status.as_str().to_string(),
            nightlight: assessment.nightlight,
            is_construction: assessment.construction_detected,
            is_legal: assessment.is_legal_construction,
            ml_confidence: assessment.ml_confidence,
            detected_objects: assessment
                .detected_objects
                .into_iter()
                .map(|object| DetectedObjectDto {
                    label: object.label.to_string(),
                    count: object.count,
                })
                .collect(),
            indices: IndicesDto {
                evi: assessment.indices.evi,
                savi: assessment.indices.savi,
            },
            prediction: assessment.prediction.to_string(),
            explanation,
        }
    }
}

#[derive(Deserialize, ToSchema)]
pub struct VerifyRequest {
    pub correct: bool,
}

/// One stored analysis, in the column naming the dashboard reads.
#[derive(Serialize, ToSchema)]
pub struct AnalysisDto {
    pub id: i64,
    pub location_name: String,
    pub timestamp: DateTime<Utc>,
    pub ndvi_score: f64,
    pub degradation_status: String,
    pub construction_detected: bool,
    pub nightlight_intensity: f64,
    pub is_legal_construction: bool,
    /// `null` while pending, then true (confirmed) or false (rejected).
    pub user_verified: Option<bool>,
    pub image_url: String,
}

impl From<AnalysisRecord> for AnalysisDto {
    fn from(record: AnalysisRecord) -> Self {
        Self {
            id: record.id,
            location_name: record.location_name,
            timestamp: record.timestamp,
            ndvi_score: record.ndvi_score,
            degradation_status: record.degradation_status.as_str().to_string(),
            construction_detected: record.construction_detected,
            nightlight_intensity: record.nightlight_intensity,
            is_legal_construction: record.is_legal_construction,
            user_verified: record.user_verified.as_flag(),
            image_url: record.image_url,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct YearStatusDto {
    pub year: i32,
    pub status: String,
}

#[derive(Serialize, ToSchema)]
pub struct LocationDetails {
    pub id: String,
    pub last_analyzed: DateTime<Utc>,
    pub historical_changes: Vec<YearStatusDto>,
    pub soil_moisture: u32,
    pub canopy_cover: u32,
    pub alerts: Vec<String>,
}

#[derive(Serialize, ToSchema)]
pub struct NdviPoint {
    pub year: i32,
    pub ndvi: f64,
}

#[derive(Serialize, ToSchema)]
pub struct NightlightPoint {
    pub month: String,
    pub intensity: f64,
}

#[derive(Serialize, ToSchema)]
pub struct TrendResponse {
    pub ndvi: Vec<NdviPoint>,
    pub nightlight: Vec<NightlightPoint>,
    pub slope: f64,
    pub label: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

#[utoipa::path(
    get,
    path = "/api/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// The current site settings document (defaults if none were saved).
#[utoipa::path(
    get,
    path = "/api/settings",
    responses((status = 200, description = "Settings document"))
)]
pub async fn get_settings_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    Ok(Json(state.settings.get().await?))
}

/// Run a simulated analysis of an uploaded image and store the result.
#[utoipa::path(
    post,
    path = "/api/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis result", body = AnalyzeResponse),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let location = req
        .location
        .filter(|l| !l.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_LOCATION.to_string());
    let image = req.image.unwrap_or_default();

    // 1. Optional visual read of the image
    let explanation = if image.starts_with("data:image/") {
        match state.vision.describe_image(&image).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(error = %e, "Visual analysis failed");
                Some(VISION_FALLBACK.to_string())
            }
        }
    } else {
        None
    };

    // 2. Simulated sensor readings
    let assessment = assess(&state.simulator.sample());

    // 3. Persist
    let record = state
        .db
        .save_analysis(&NewAnalysis {
            location_name: location,
            ndvi_score: assessment.ndvi,
            degradation_status: assessment.status,
            construction_detected: assessment.construction_detected,
            nightlight_intensity: assessment.nightlight,
            is_legal_construction: assessment.is_legal_construction,
            image_url: image,
        })
        .await?;

    info!(
        id = record.id,
        status = %assessment.status,
        ndvi = assessment.ndvi,
        "Analysis recorded"
    );
    Ok(Json(AnalyzeResponse::new(record.id, assessment, explanation)))
}

/// Record a user's verdict on an analysis.
#[utoipa::path(
    post,
    path = "/api/verify/{id}",
    request_body = VerifyRequest,
    params(("id" = i64, Path, description = "Analysis id")),
    responses(
        (status = 200, description = "Verdict stored"),
        (status = 404, description = "No such analysis")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<VerifyRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let verdict = if req.correct {
        Verification::Confirmed
    } else {
        Verification::Rejected
    };
    state.db.set_verification(id, verdict).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// The most recent analyses, newest first.
#[utoipa::path(
    get,
    path = "/api/history",
    responses((status = 200, description = "Recent analyses", body = [AnalysisDto]))
)]
pub async fn history_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<AnalysisDto>>, ApiError> {
    let records = state.db.recent_analyses(HISTORY_LIMIT).await?;
    Ok(Json(records.into_iter().map(AnalysisDto::from).collect()))
}

/// Details for a map hotspot. Responds after a short artificial delay.
#[utoipa::path(
    get,
    path = "/api/location/{id}",
    params(("id" = String, Path, description = "Hotspot id, e.g. loc_1")),
    responses((status = 200, description = "Hotspot details", body = LocationDetails))
)]
pub async fn location_handler(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> Json<LocationDetails> {
    let profile = hotspots::profile_for(&id);
    tokio::time::sleep(state.config.location_delay).await;

    Json(LocationDetails {
        id,
        last_analyzed: Utc::now(),
        historical_changes: profile
            .history
            .into_iter()
            .map(|h| YearStatusDto {
                year: h.year,
                status: h.status.to_string(),
            })
            .collect(),
        soil_moisture: profile.soil_moisture,
        canopy_cover: profile.canopy_cover,
        alerts: profile.alerts.into_iter().map(str::to_string).collect(),
    })
}

/// The NDVI and nightlight series shown on the dashboard, with the NDVI trend label.
#[utoipa::path(
    get,
    path = "/api/trend",
    responses((status = 200, description = "Trend series", body = TrendResponse))
)]
pub async fn trend_handler() -> Json<TrendResponse> {
    let (slope, label) = trend::ndvi_trend();
    Json(TrendResponse {
        ndvi: trend::NDVI_BY_YEAR
            .iter()
            .map(|(year, ndvi)| NdviPoint {
                year: *year,
                ndvi: *ndvi,
            })
            .collect(),
        nightlight: trend::NIGHTLIGHT_BY_MONTH
            .iter()
            .map(|(month, intensity)| NightlightPoint {
                month: month.to_string(),
                intensity: *intensity,
            })
            .collect(),
        slope,
        label: label.as_str().to_string(),
    })
}
