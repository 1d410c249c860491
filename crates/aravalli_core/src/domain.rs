//! crates/aravalli_core/src/domain.rs
//!
//! Defines the core data structures for the application.
//! These structs are independent of any database or HTTP layer. The settings
//! document and generated suggestions are JSON by nature, so those two carry
//! serde derives.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

//=========================================================================================
// Users and Sessions
//=========================================================================================

/// The two roles a user account can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

// Represents a user - used throughout app
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user_id: i64,
    pub username: String,
    pub hashed_password: String,
    pub role: Role,
}

/// Everything needed to insert a new account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub hashed_password: String,
    pub name: Option<String>,
    pub dob: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub role: Role,
}

// Represents a bearer-token login session. Valid until deleted.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

//=========================================================================================
// Analyses
//=========================================================================================

/// Three-way classification of a site's condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegradationStatus {
    Natural,
    Seasonal,
    PermanentDegradation,
}

impl DegradationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationStatus::Natural => "Natural",
            DegradationStatus::Seasonal => "Seasonal",
            DegradationStatus::PermanentDegradation => "Permanent Degradation",
        }
    }
}

impl fmt::Display for DegradationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegradationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Natural" => Ok(DegradationStatus::Natural),
            "Seasonal" => Ok(DegradationStatus::Seasonal),
            "Permanent Degradation" => Ok(DegradationStatus::PermanentDegradation),
            other => Err(format!("unknown degradation status '{}'", other)),
        }
    }
}

/// A user's verdict on an analysis. Stored as a nullable boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    Pending,
    Confirmed,
    Rejected,
}

impl Verification {
    pub fn from_flag(flag: Option<bool>) -> Self {
        match flag {
            None => Verification::Pending,
            Some(true) => Verification::Confirmed,
            Some(false) => Verification::Rejected,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Verification::Pending => None,
            Verification::Confirmed => Some(true),
            Verification::Rejected => Some(false),
        }
    }
}

/// A persisted analysis row.
#[derive(Debug, Clone)]
pub struct AnalysisRecord {
    pub id: i64,
    pub location_name: String,
    pub timestamp: DateTime<Utc>,
    pub ndvi_score: f64,
    pub degradation_status: DegradationStatus,
    pub construction_detected: bool,
    pub nightlight_intensity: f64,
    pub is_legal_construction: bool,
    pub user_verified: Verification,
    pub image_url: String,
}

/// The fields of an analysis before it has been given an id and timestamp.
#[derive(Debug, Clone)]
pub struct NewAnalysis {
    pub location_name: String,
    pub ndvi_score: f64,
    pub degradation_status: DegradationStatus,
    pub construction_detected: bool,
    pub nightlight_intensity: f64,
    pub is_legal_construction: bool,
    pub image_url: String,
}

//=========================================================================================
// Admin Tooling
//=========================================================================================

/// A single prompt submitted to the site builder.
#[derive(Debug, Clone)]
pub struct PromptHistoryItem {
    pub id: i64,
    pub prompt: String,
    pub timestamp: DateTime<Utc>,
}

/// The stored settings document together with its revision counter.
#[derive(Debug, Clone)]
pub struct SettingsRecord {
    pub version: i64,
    pub document: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}

/// A proposed rewrite of one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub original: String,
    pub updated: String,
}

/// A confirmed write, as submitted for application.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub path: String,
    pub content: String,
}

/// A generated conservation suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Suggestion {
    pub category: String,
    pub title: String,
    pub description: String,
    pub impact: String,
}

//=========================================================================================
// Global Configuration Document
//=========================================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeSettings {
    pub primary: String,
    pub background: String,
    pub text: String,
    pub radius: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureSettings {
    pub show_chatbot: bool,
    pub show_suggestions: bool,
    pub show_history: bool,
    pub show_map: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentSettings {
    pub app_name: String,
    pub welcome_message: String,
}

/// The shape of the settings document served to clients when nothing is stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
    pub theme: ThemeSettings,
    pub features: FeatureSettings,
    pub content: ContentSettings,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            theme: ThemeSettings {
                primary: "#10b981".to_string(),
                background: "#fafafa".to_string(),
                text: "#18181b".to_string(),
                radius: "0.75rem".to_string(),
            },
            features: FeatureSettings {
                show_chatbot: true,
                show_suggestions: true,
                show_history: true,
                show_map: true,
            },
            content: ContentSettings {
                app_name: "Aravalli Watch".to_string(),
                welcome_message: "Eco-Monitoring System".to_string(),
            },
        }
    }
}

impl GlobalConfig {
    /// The default document as a JSON value.
    pub fn default_document() -> serde_json::Value {
        serde_json::json!({
            "theme": {
                "primary": "#10b981",
                "background": "#fafafa",
                "text": "#18181b",
                "radius": "0.75rem"
            },
            "features": {
                "showChatbot": true,
                "showSuggestions": true,
                "showHistory": true,
                "showMap": true
            },
            "content": {
                "appName": "Aravalli Watch",
                "welcomeMessage": "Eco-Monitoring System"
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_matches_typed_default() {
        let typed: GlobalConfig =
            serde_json::from_value(GlobalConfig::default_document()).unwrap();
        assert_eq!(typed, GlobalConfig::default());
    }

    #[test]
    fn degradation_status_round_trips_through_label() {
        for status in [
            DegradationStatus::Natural,
            DegradationStatus::Seasonal,
            DegradationStatus::PermanentDegradation,
        ] {
            assert_eq!(status.as_str().parse::<DegradationStatus>(), Ok(status));
        }
        assert!("Degraded".parse::<DegradationStatus>().is_err());
    }

    #[test]
    fn verification_maps_nullable_flag() {
        assert_eq!(Verification::from_flag(None), Verification::Pending);
        assert_eq!(Verification::from_flag(Some(true)), Verification::Confirmed);
        assert_eq!(Verification::from_flag(Some(false)), Verification::Rejected);
        assert_eq!(Verification::Rejected.as_flag(), Some(false));
    }

    #[test]
    fn role_parses_known_values_only() {
        assert_eq!("admin".parse::<Role>(), Ok(Role::Admin));
        assert_eq!(Role::User.as_str(), "user");
        assert!("root".parse::<Role>().is_err());
    }
}
