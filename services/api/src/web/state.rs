//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use aravalli_core::ports::{
    AnalysisSimulator, ChatService, DatabaseService, ImageInsightService, SourceFileService,
    SuggestionService,
};
use aravalli_core::{SettingsService, SiteBuilder};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub config: Arc<Config>,
    pub settings: SettingsService,
    pub files: Arc<dyn SourceFileService>,
    pub builder: SiteBuilder,
    pub chat: Arc<dyn ChatService>,
    pub vision: Arc<dyn ImageInsightService>,
    pub suggestions: Arc<dyn SuggestionService>,
    pub simulator: Arc<dyn AnalysisSimulator>,
}
