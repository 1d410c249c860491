//! crates/aravalli_core/src/settings.rs
//!
//! The settings service: one JSON document under a fixed key, versioned on
//! every write. Nothing is cached in-process; every read goes to the store.

use std::sync::Arc;

use tracing::info;

use crate::domain::{GlobalConfig, SettingsRecord};
use crate::ports::{DatabaseService, PortResult};

#[derive(Clone)]
pub struct SettingsService {
    db: Arc<dyn DatabaseService>,
}

impl SettingsService {
    pub fn new(db: Arc<dyn DatabaseService>) -> Self {
        Self { db }
    }

    /// Creates the settings row with the default document if it is missing.
    pub async fn bootstrap(&self) -> PortResult<()> {
        self.db.ensure_settings(&GlobalConfig::default_document()).await
    }

    /// The stored document, or the default when nothing has been stored.
    pub async fn get(&self) -> PortResult<serde_json::Value> {
        Ok(self
            .db
            .get_settings()
            .await?
            .map(|record| record.document)
            .unwrap_or_else(GlobalConfig::default_document))
    }

    /// Replaces the document wholesale. Last write wins.
    pub async fn set(&self, document: serde_json::Value) -> PortResult<SettingsRecord> {
        let record = self.db.save_settings(&document).await?;
        info!(version = record.version, "Settings updated");
        Ok(record)
    }
}
