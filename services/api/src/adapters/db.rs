//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the embedded SQLite database using `sqlx`.

use async_trait::async_trait;
use aravalli_core::domain::{
    AnalysisRecord, AuthSession, NewAnalysis, NewUser, PromptHistoryItem, Role, SettingsRecord,
    User, UserCredentials, Verification,
};
use aravalli_core::ports::{DatabaseService, PortError, PortResult};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{FromRow, SqlitePool};
use std::str::FromStr;

/// The single key the settings document lives under.
const SETTINGS_KEY: &str = "global_config";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: SqlitePool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if missing) the database file named by `url`.
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A private in-memory database, used by tests.
    ///
    /// Every connection to `:memory:` is a separate database, so the pool is
    /// pinned to one connection that never expires.
    pub async fn in_memory() -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Self::new(pool))
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_role(raw: &str) -> PortResult<Role> {
    Role::from_str(raw).map_err(PortError::Unexpected)
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct UserRecord {
    id: i64,
    username: String,
    role: String,
}
impl UserRecord {
    fn to_domain(self) -> PortResult<User> {
        Ok(User {
            id: self.id,
            username: self.username,
            role: parse_role(&self.role)?,
        })
    }
}

#[derive(FromRow)]
struct CredentialsRecord {
    id: i64,
    username: String,
    password: String,
    role: String,
}
impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            user_id: self.id,
            username: self.username,
            hashed_password: self.password,
            role: parse_role(&self.role)?,
        })
    }
}

#[derive(FromRow)]
struct AnalysisRow {
    id: i64,
    location_name: String,
    timestamp: DateTime<Utc>,
    ndvi_score: f64,
    degradation_status: String,
    construction_detected: bool,
    nightlight_intensity: f64,
    is_legal_construction: bool,
    user_verified: Option<bool>,
    image_url: String,
}
impl AnalysisRow {
    fn to_domain(self) -> PortResult<AnalysisRecord> {
        Ok(AnalysisRecord {
            id: self.id,
            location_name: self.location_name,
            timestamp: self.timestamp,
            ndvi_score: self.ndvi_score,
            degradation_status: self
                .degradation_status
                .parse()
                .map_err(PortError::Unexpected)?,
            construction_detected: self.construction_detected,
            nightlight_intensity: self.nightlight_intensity,
            is_legal_construction: self.is_legal_construction,
            user_verified: Verification::from_flag(self.user_verified),
            image_url: self.image_url,
        })
    }
}

#[derive(FromRow)]
struct PromptRecord {
    id: i64,
    prompt: String,
    timestamp: DateTime<Utc>,
}
impl PromptRecord {
    fn to_domain(self) -> PromptHistoryItem {
        PromptHistoryItem {
            id: self.id,
            prompt: self.prompt,
            timestamp: self.timestamp,
        }
    }
}

#[derive(FromRow)]
struct SettingsRow {
    value: String,
    version: i64,
    updated_at: DateTime<Utc>,
}
impl SettingsRow {
    fn to_domain(self) -> PortResult<SettingsRecord> {
        let document = serde_json::from_str(&self.value)
            .map_err(|e| PortError::Unexpected(format!("Stored settings are not JSON: {}", e)))?;
        Ok(SettingsRecord {
            version: self.version,
            document,
            updated_at: self.updated_at,
        })
    }
}

const ANALYSIS_COLUMNS: &str = "id, location_name, timestamp, ndvi_score, degradation_status, \
     construction_detected, nightlight_intensity, is_legal_construction, user_verified, image_url";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn create_user(&self, user: &NewUser) -> PortResult<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, password, name, dob, contact, email, role) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&user.username)
        .bind(&user.hashed_password)
        .bind(&user.name)
        .bind(&user.dob)
        .bind(&user.contact)
        .bind(&user.email)
        .bind(user.role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(format!("Username {} already exists", user.username))
            }
            _ => unexpected(e),
        })?;
        Ok(result.last_insert_rowid())
    }

    async fn get_user_credentials(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::NotFound(format!("User {} not found", username)),
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn update_user_credentials(
        &self,
        user_id: i64,
        hashed_password: &str,
        role: Role,
    ) -> PortResult<()> {
        sqlx::query("UPDATE users SET password = ?, role = ? WHERE id = ?")
            .bind(hashed_password)
            .bind(role.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_user(&self, username: &str) -> PortResult<bool> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await
            .map_err(unexpected)?;
        let Some(id) = id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(unexpected)?;

        tx.commit().await.map_err(unexpected)?;
        Ok(true)
    }

    async fn count_users(&self) -> PortResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn create_auth_session(&self, token: &str, user_id: i64) -> PortResult<AuthSession> {
        let created_at = Utc::now();
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id)
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(AuthSession {
            token: token.to_string(),
            user_id,
            created_at,
        })
    }

    async fn validate_auth_session(&self, token: &str) -> PortResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT users.id, users.username, users.role \
             FROM sessions JOIN users ON sessions.user_id = users.id \
             WHERE sessions.token = ?",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => PortError::Unauthorized,
            _ => unexpected(e),
        })?;
        record.to_domain()
    }

    async fn delete_auth_session(&self, token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn get_settings(&self) -> PortResult<Option<SettingsRecord>> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "SELECT value, version, updated_at FROM settings WHERE key = ?",
        )
        .bind(SETTINGS_KEY)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;
        row.map(SettingsRow::to_domain).transpose()
    }

    async fn ensure_settings(&self, document: &serde_json::Value) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value, version, updated_at) VALUES (?, ?, 1, ?) \
             ON CONFLICT(key) DO NOTHING",
        )
        .bind(SETTINGS_KEY)
        .bind(document.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn save_settings(&self, document: &serde_json::Value) -> PortResult<SettingsRecord> {
        let row = sqlx::query_as::<_, SettingsRow>(
            "INSERT INTO settings (key, value, version, updated_at) VALUES (?, ?, 1, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             version = settings.version + 1, updated_at = excluded.updated_at \
             RETURNING value, version, updated_at",
        )
        .bind(SETTINGS_KEY)
        .bind(document.to_string())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        row.to_domain()
    }

    async fn append_prompt(&self, prompt: &str) -> PortResult<PromptHistoryItem> {
        let record = sqlx::query_as::<_, PromptRecord>(
            "INSERT INTO prompt_history (prompt, timestamp) VALUES (?, ?) \
             RETURNING id, prompt, timestamp",
        )
        .bind(prompt)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn recent_prompts(&self, limit: i64) -> PortResult<Vec<PromptHistoryItem>> {
        let records = sqlx::query_as::<_, PromptRecord>(
            "SELECT id, prompt, timestamp FROM prompt_history \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn count_prompts(&self) -> PortResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM prompt_history")
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn save_analysis(&self, analysis: &NewAnalysis) -> PortResult<AnalysisRecord> {
        let sql = format!(
            "INSERT INTO analyses (location_name, timestamp, ndvi_score, degradation_status, \
             construction_detected, nightlight_intensity, is_legal_construction, image_url) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING {}",
            ANALYSIS_COLUMNS
        );
        let row = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(&analysis.location_name)
            .bind(Utc::now())
            .bind(analysis.ndvi_score)
            .bind(analysis.degradation_status.as_str())
            .bind(analysis.construction_detected)
            .bind(analysis.nightlight_intensity)
            .bind(analysis.is_legal_construction)
            .bind(&analysis.image_url)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        row.to_domain()
    }

    async fn recent_analyses(&self, limit: i64) -> PortResult<Vec<AnalysisRecord>> {
        let sql = format!(
            "SELECT {} FROM analyses ORDER BY timestamp DESC, id DESC LIMIT ?",
            ANALYSIS_COLUMNS
        );
        let rows = sqlx::query_as::<_, AnalysisRow>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        rows.into_iter().map(AnalysisRow::to_domain).collect()
    }

    async fn set_verification(&self, analysis_id: i64, verdict: Verification) -> PortResult<()> {
        let result = sqlx::query("UPDATE analyses SET user_verified = ? WHERE id = ?")
            .bind(verdict.as_flag())
            .bind(analysis_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Analysis {} not found",
                analysis_id
            )));
        }
        Ok(())
    }
}
