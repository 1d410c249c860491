//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for the admin account seeded at startup.
#[derive(Clone, Debug)]
pub struct AdminSeed {
    pub username: String,
    pub password: String,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Directory containing the editable `src/` tree.
    pub source_root: PathBuf,
    /// Built SPA bundle served for every non-API path.
    pub static_dir: PathBuf,
    pub allowed_origin: String,
    pub llm_api_key: Option<String>,
    pub llm_api_base: Option<String>,
    pub chat_model: String,
    pub codegen_model: String,
    pub vision_model: String,
    pub admin_seed: Option<AdminSeed>,
    pub location_delay: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Load Server and Database Settings ---
        let bind_address_str = var_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = var_or("DATABASE_URL", "sqlite://aravalli.db");

        let log_level_str = var_or("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let source_root = PathBuf::from(var_or("SOURCE_ROOT", "."));
        let static_dir = PathBuf::from(var_or("STATIC_DIR", "./dist"));
        let allowed_origin = var_or("ALLOWED_ORIGIN", "http://localhost:3000");

        // --- Load LLM Settings (key is optional) ---
        let llm_api_key = lookup("OPENAI_API_KEY").or_else(|| lookup("GEMINI_API_KEY"));
        let llm_api_base = lookup("LLM_API_BASE");
        let chat_model = var_or("CHAT_MODEL", "gpt-4o-mini");
        let codegen_model = var_or("CODEGEN_MODEL", "gpt-4o");
        let vision_model = var_or("VISION_MODEL", "gpt-4o-mini");

        // --- Admin Seed ---
        // An empty value counts as unset.
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let admin_seed = match (non_empty("ADMIN_USERNAME"), non_empty("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) => Some(AdminSeed { username, password }),
            (Some(_), None) => return Err(ConfigError::MissingVar("ADMIN_PASSWORD".to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar("ADMIN_USERNAME".to_string())),
            (None, None) => None,
        };

        let delay_str = var_or("LOCATION_DELAY_MS", "500");
        let location_delay = delay_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("LOCATION_DELAY_MS".to_string(), e.to_string()))?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            source_root,
            static_dir,
            allowed_origin,
            llm_api_key,
            llm_api_base,
            chat_model,
            codegen_model,
            vision_model,
            admin_seed,
            location_delay,
        })
    }
}
