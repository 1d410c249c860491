//! End-to-end tests that drive the full router against an in-memory database,
//! a temporary source tree and scripted model ports.

use api_lib::adapters::{DbAdapter, LocalSourceFiles};
use api_lib::config::Config;
use api_lib::web::{build_router, initialize, state::AppState};
use aravalli_core::analysis::SimulatedReadings;
use aravalli_core::domain::Suggestion;
use aravalli_core::ports::{
    AnalysisSimulator, ChatService, CodeGenerationService, DatabaseService, ImageInsightService,
    PortError, PortResult, SourceFileService, SuggestionService,
};
use aravalli_core::{SettingsService, SiteBuilder};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

//=========================================================================================
// Fakes
//=========================================================================================

/// Selects `App.tsx` and rewrites it; the chat echoes; vision is down.
struct ScriptedModel;

#[async_trait]
impl CodeGenerationService for ScriptedModel {
    async fn select_files(&self, _request: &str, available: &[String]) -> PortResult<Vec<String>> {
        Ok(available
            .iter()
            .filter(|p| p.ends_with("App.tsx"))
            .cloned()
            .chain(std::iter::once("src/NotListed.tsx".to_string()))
            .collect())
    }

    async fn generate_changes(
        &self,
        request: &str,
        files: &BTreeMap<String, String>,
    ) -> PortResult<BTreeMap<String, String>> {
        let mut out: BTreeMap<String, String> = files
            .keys()
            .map(|path| (path.clone(), format!("// {}\nexport default App;", request)))
            .collect();
        out.insert("src/Sneaky.tsx".to_string(), "not requested".to_string());
        Ok(out)
    }
}

#[async_trait]
impl ChatService for ScriptedModel {
    async fn reply(&self, message: &str) -> PortResult<String> {
        Ok(format!("About the Aravallis: {}", message))
    }
}

#[async_trait]
impl ImageInsightService for ScriptedModel {
    async fn describe_image(&self, _data_url: &str) -> PortResult<String> {
        Err(PortError::ExternalService("vision offline".to_string()))
    }
}

#[async_trait]
impl SuggestionService for ScriptedModel {
    async fn generate_suggestions(&self) -> PortResult<Vec<Suggestion>> {
        Ok(vec![Suggestion {
            category: "Community".to_string(),
            title: "Village forest guards".to_string(),
            description: "Pay local patrols to report illegal mining.".to_string(),
            impact: "High".to_string(),
        }])
    }
}

/// Sparse vegetation under bright nights: permanent degradation with construction.
struct FixedSimulator;

impl AnalysisSimulator for FixedSimulator {
    fn sample(&self) -> SimulatedReadings {
        SimulatedReadings {
            ndvi: 0.1,
            nightlight: 75.0,
            legality_draw: 0.9,
            ml_confidence: 0.9,
            tree_count: 12,
            structure_count: 4,
            water_body_count: 1,
        }
    }
}

//=========================================================================================
// Harness
//=========================================================================================

struct TestApp {
    router: Router,
    root: TempDir,
    _static: TempDir,
}

async fn spawn_app() -> TestApp {
    let root = TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("src/components")).unwrap();
    std::fs::write(root.path().join("src/App.tsx"), "export default App;").unwrap();
    std::fs::write(root.path().join("src/components/Sidebar.tsx"), "sidebar").unwrap();
    std::fs::write(root.path().join("secret.env"), "KEY=1").unwrap();

    let static_dir = TempDir::new().unwrap();
    std::fs::write(static_dir.path().join("index.html"), "<html>spa</html>").unwrap();

    let root_path = root.path().to_string_lossy().to_string();
    let static_path = static_dir.path().to_string_lossy().to_string();
    let config = Config::from_lookup(|key| match key {
        "SOURCE_ROOT" => Some(root_path.clone()),
        "STATIC_DIR" => Some(static_path.clone()),
        "ADMIN_USERNAME" => Some("warden".to_string()),
        "ADMIN_PASSWORD" => Some("forest".to_string()),
        "LOCATION_DELAY_MS" => Some("0".to_string()),
        _ => None,
    })
    .unwrap();

    let db = DbAdapter::in_memory().await.unwrap();
    db.run_migrations().await.unwrap();
    let db: Arc<dyn DatabaseService> = Arc::new(db);
    let files: Arc<dyn SourceFileService> = Arc::new(LocalSourceFiles::new(root.path()));
    let model = Arc::new(ScriptedModel);

    let state = Arc::new(AppState {
        db: db.clone(),
        config: Arc::new(config),
        settings: SettingsService::new(db),
        files: files.clone(),
        builder: SiteBuilder::new(model.clone(), files),
        chat: model.clone(),
        vision: model.clone(),
        suggestions: model,
        simulator: Arc::new(FixedSimulator),
    });
    initialize(&state).await.unwrap();

    TestApp {
        router: build_router(state).unwrap(),
        root,
        _static: static_dir,
    }
}

impl TestApp {
    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn post_raw(&self, uri: &str, raw: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(raw.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.call(Method::GET, uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .post("/api/login", None, json!({"username": username, "password": password}))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body["token"].as_str().unwrap().to_string()
    }
}

//=========================================================================================
// Tests
//=========================================================================================

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok"}));
}

#[tokio::test]
async fn register_login_me_logout() {
    let app = spawn_app().await;

    let (status, body) = app
        .post(
            "/api/register",
            None,
            json!({"username": "ranger", "password": "pw", "email": "r@example.org"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(body["userId"].as_str().unwrap().parse::<i64>().is_ok());

    let (status, body) = app
        .post("/api/register", None, json!({"username": "ranger", "password": "x"}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Username already exists");

    let (status, _) = app.post("/api/register", None, json!({"username": "solo"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/api/login", None, json!({"username": "ranger", "password": "wrong"}))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let token = app.login("ranger", "pw").await;
    let (status, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user"]["username"], "ranger");
    assert_eq!(body["user"]["role"], "user");

    let (status, _) = app.post("/api/logout", None, json!({"token": token})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.post("/api/logout", None, json!({"token": token})).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
    let (status, _) = app.get("/api/me", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn seeded_accounts_can_log_in() {
    let app = spawn_app().await;
    let token = app.login("user", "user").await;
    let (_, body) = app.get("/api/me", Some(&token)).await;
    assert_eq!(body["user"]["role"], "user");

    let admin = app.login("warden", "forest").await;
    let (_, body) = app.get("/api/me", Some(&admin)).await;
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
async fn admin_routes_require_an_admin_token() {
    let app = spawn_app().await;
    let (status, _) = app.get("/api/admin/stats", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/admin/stats", Some("made-up")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let user = app.login("user", "user").await;
    let (status, body) = app.get("/api/admin/files", Some(&user)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn settings_default_then_versioned_updates() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"]["appName"], "Aravalli Watch");
    assert_eq!(body["theme"]["primary"], "#10b981");

    let admin = app.login("warden", "forest").await;
    let (status, _) = app
        .post("/api/admin/settings", Some(&admin), json!({"config": null}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let next = json!({"theme": {"primary": "#f97316"}, "features": {"showMap": false}});
    let (status, body) = app
        .post("/api/admin/settings", Some(&admin), json!({"config": next}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["version"], 2);

    let (_, body) = app.get("/api/settings", None).await;
    assert_eq!(body, next);
}

#[tokio::test]
async fn analyze_history_and_verify() {
    let app = spawn_app().await;

    let (status, body) = app
        .post("/api/analyze", None, json!({"location": "Gurugram Ridge", "image": "blob:1"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Permanent Degradation");
    assert_eq!(body["isConstruction"], true);
    assert_eq!(body["isLegal"], true);
    assert_eq!(body["detectedObjects"][1]["label"], "Structures");
    assert_eq!(body["detectedObjects"][1]["count"], 4);
    assert_eq!(
        body["prediction"],
        "High risk of desertification in 6 months if unchecked."
    );
    assert!(body.get("explanation").is_none());
    let first_id: i64 = body["id"].as_str().unwrap().parse().unwrap();

    let (_, body) = app.post("/api/analyze", None, json!({})).await;
    let second_id: i64 = body["id"].as_str().unwrap().parse().unwrap();

    let (status, history) = app.get("/api/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = history.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["id"], second_id);
    assert_eq!(rows[0]["location_name"], "Unknown Location");
    assert_eq!(rows[0]["image_url"], "");
    assert_eq!(rows[1]["location_name"], "Gurugram Ridge");
    assert!(rows[1]["user_verified"].is_null());

    let (status, _) = app
        .post(&format!("/api/verify/{}", first_id), None, json!({"correct": false}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (_, history) = app.get("/api/history", None).await;
    assert_eq!(history[1]["user_verified"], false);

    let (status, _) = app
        .post("/api/verify/9999", None, json!({"correct": true}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_requests_get_a_json_400() {
    let app = spawn_app().await;
    let (_, body) = app.post("/api/analyze", None, json!({})).await;
    let id = body["id"].as_str().unwrap().to_string();
    let verify = format!("/api/verify/{}", id);

    let cases = [
        (verify.as_str(), "{}"),
        (verify.as_str(), r#"{"correct": "yes"}"#),
        ("/api/verify/abc", r#"{"correct": true}"#),
        ("/api/login", r#"{"username": 5, "password": "pw"}"#),
        ("/api/chat", "{not json"),
        ("/api/register", "[]"),
    ];
    for (uri, raw) in cases {
        let (status, body) = app.post_raw(uri, raw).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", uri, raw);
        assert!(body["error"].is_string(), "{} {} -> {}", uri, raw, body);
    }

    // The record is untouched by the rejected verdicts.
    let (_, history) = app.get("/api/history", None).await;
    assert!(history[0]["user_verified"].is_null());
}

#[tokio::test]
async fn image_uploads_fall_back_when_vision_fails() {
    let app = spawn_app().await;
    let (status, body) = app
        .post(
            "/api/analyze",
            None,
            json!({"location": "Sariska", "image": "data:image/png;base64,AAAA"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["explanation"],
        "Visual analysis service unavailable. Using statistical simulation."
    );
}

#[tokio::test]
async fn location_and_trend_are_fixed_data() {
    let app = spawn_app().await;
    let (status, body) = app.get("/api/location/loc_2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "loc_2");
    assert_eq!(body["soil_moisture"], 45);
    assert_eq!(body["canopy_cover"], 15);
    assert_eq!(body["alerts"][0], "Unauthorized structure detected");
    assert_eq!(body["historical_changes"][2]["status"], "Construction");

    let (_, body) = app.get("/api/location/anywhere", None).await;
    assert_eq!(body["canopy_cover"], 90);

    let (status, body) = app.get("/api/trend", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["label"], "Degradation");
    assert_eq!(body["ndvi"].as_array().unwrap().len(), 6);
    assert_eq!(body["nightlight"][3]["month"], "Apr");
}

#[tokio::test]
async fn admin_file_access_is_confined_to_src() {
    let app = spawn_app().await;
    let admin = app.login("warden", "forest").await;

    let (status, body) = app.get("/api/admin/files", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["files"], json!(["src/App.tsx", "src/components/Sidebar.tsx"]));

    let (status, body) = app
        .post("/api/admin/read-file", Some(&admin), json!({"path": "src/App.tsx"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "export default App;");

    for path in ["secret.env", "src/../secret.env", "src/%2e%2e/secret.env"] {
        let (status, _) = app
            .post("/api/admin/read-file", Some(&admin), json!({"path": path}))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "path {}", path);
    }

    let (status, _) = app
        .post("/api/admin/read-file", Some(&admin), json!({"path": "src/Gone.tsx"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(
            "/api/admin/write-file",
            Some(&admin),
            json!({"path": "src/components/Sidebar.tsx", "content": "new sidebar"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        std::fs::read_to_string(app.root.path().join("src/components/Sidebar.tsx")).unwrap(),
        "new sidebar"
    );

    let (status, _) = app
        .post(
            "/api/admin/write-file",
            Some(&admin),
            json!({"path": "src/../secret.env", "content": "KEY=2"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        std::fs::read_to_string(app.root.path().join("secret.env")).unwrap(),
        "KEY=1"
    );
}

#[tokio::test]
async fn builder_previews_then_applies_and_records_prompt() {
    let app = spawn_app().await;
    let admin = app.login("warden", "forest").await;

    let (status, _) = app
        .post("/api/admin/builder/preview", Some(&admin), json!({"prompt": "  "}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post(
            "/api/admin/builder/preview",
            Some(&admin),
            json!({"prompt": "make the header orange"}),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let changes = body["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["path"], "src/App.tsx");
    assert_eq!(changes[0]["original"], "export default App;");

    // Preview writes nothing.
    assert_eq!(
        std::fs::read_to_string(app.root.path().join("src/App.tsx")).unwrap(),
        "export default App;"
    );

    let updated = changes[0]["updated"].clone();
    let (status, body) = app
        .post(
            "/api/admin/builder/apply",
            Some(&admin),
            json!({
                "prompt": "make the header orange",
                "changes": [{"path": "src/App.tsx", "updated": updated}]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "applied": 1}));
    assert_eq!(
        std::fs::read_to_string(app.root.path().join("src/App.tsx")).unwrap(),
        updated.as_str().unwrap()
    );

    let (_, body) = app.get("/api/admin/prompt-history", Some(&admin)).await;
    assert_eq!(body["prompts"][0]["prompt"], "make the header orange");

    let (_, body) = app.get("/api/admin/stats", Some(&admin)).await;
    assert_eq!(body["stats"]["aiRequests"], 1);
    assert_eq!(body["stats"]["totalUsers"], 2);
    assert_eq!(body["stats"]["siteVersion"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn rejected_apply_writes_nothing_but_keeps_the_prompt() {
    let app = spawn_app().await;
    let admin = app.login("warden", "forest").await;

    let (status, _) = app
        .post(
            "/api/admin/builder/apply",
            Some(&admin),
            json!({
                "prompt": "escape the sandbox",
                "changes": [
                    {"path": "src/App.tsx", "updated": "changed"},
                    {"path": "src/../secret.env", "updated": "KEY=2"}
                ]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        std::fs::read_to_string(app.root.path().join("src/App.tsx")).unwrap(),
        "export default App;"
    );

    let (_, body) = app.get("/api/admin/prompt-history", Some(&admin)).await;
    assert_eq!(body["prompts"][0]["prompt"], "escape the sandbox");

    let (status, _) = app
        .post("/api/admin/builder/apply", Some(&admin), json!({"changes": []}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn prompt_history_keeps_the_latest_ten() {
    let app = spawn_app().await;
    let admin = app.login("warden", "forest").await;

    let (status, _) = app
        .post("/api/admin/prompt-history", Some(&admin), json!({"prompt": ""}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for i in 0..12 {
        let (status, _) = app
            .post(
                "/api/admin/prompt-history",
                Some(&admin),
                json!({"prompt": format!("prompt {}", i)}),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (_, body) = app.get("/api/admin/prompt-history", Some(&admin)).await;
    let prompts = body["prompts"].as_array().unwrap();
    assert_eq!(prompts.len(), 10);
    assert_eq!(prompts[0]["prompt"], "prompt 11");
}

#[tokio::test]
async fn chat_and_suggestions() {
    let app = spawn_app().await;
    let (status, _) = app.post("/api/chat", None, json!({"message": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .post("/api/chat", None, json!({"message": "Why is NDVI falling?"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "About the Aravallis: Why is NDVI falling?");

    let (status, body) = app.post("/api/suggestions", None, json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["suggestions"][0]["impact"], "High");
}

#[tokio::test]
async fn unknown_paths_serve_the_spa_and_docs_are_published() {
    let app = spawn_app().await;
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<html>spa</html>");

    let (status, body) = app.get("/api-docs/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/admin/builder/preview"].is_object());
}
