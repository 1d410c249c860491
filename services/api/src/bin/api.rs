//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        llm::build_client, DbAdapter, DisabledLlm, LocalSourceFiles, OpenAiChatAdapter,
        OpenAiCodegenAdapter, OpenAiSuggestionsAdapter, OpenAiVisionAdapter, RandomSimulator,
    },
    config::Config,
    error::ApiError,
    web::{build_router, initialize, state::AppState},
};
use aravalli_core::ports::{
    ChatService, CodeGenerationService, DatabaseService, ImageInsightService, SourceFileService,
    SuggestionService,
};
use aravalli_core::{SettingsService, SiteBuilder};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!(url = %config.database_url, "Connecting to database...");
    let db_adapter = DbAdapter::connect(&config.database_url).await?;
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");
    let db: Arc<dyn DatabaseService> = Arc::new(db_adapter);

    // --- 3. Initialize Service Adapters ---
    let files: Arc<dyn SourceFileService> =
        Arc::new(LocalSourceFiles::new(config.source_root.clone()));

    let codegen: Arc<dyn CodeGenerationService>;
    let chat: Arc<dyn ChatService>;
    let vision: Arc<dyn ImageInsightService>;
    let suggestions: Arc<dyn SuggestionService>;
    match config.llm_api_key.as_deref() {
        Some(key) => {
            let client = build_client(key, config.llm_api_base.as_deref());
            codegen = Arc::new(OpenAiCodegenAdapter::new(
                client.clone(),
                config.codegen_model.clone(),
            ));
            chat = Arc::new(OpenAiChatAdapter::new(
                client.clone(),
                config.chat_model.clone(),
            ));
            vision = Arc::new(OpenAiVisionAdapter::new(
                client.clone(),
                config.vision_model.clone(),
            ));
            suggestions = Arc::new(OpenAiSuggestionsAdapter::new(
                client,
                config.chat_model.clone(),
            ));
        }
        None => {
            warn!("No LLM API key configured; AI features will return errors");
            codegen = Arc::new(DisabledLlm);
            chat = Arc::new(DisabledLlm);
            vision = Arc::new(DisabledLlm);
            suggestions = Arc::new(DisabledLlm);
        }
    }

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db.clone(),
        config: config.clone(),
        settings: SettingsService::new(db),
        files: files.clone(),
        builder: SiteBuilder::new(codegen, files),
        chat,
        vision,
        suggestions,
        simulator: Arc::new(RandomSimulator),
    });
    initialize(&app_state).await?;

    // --- 5. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
