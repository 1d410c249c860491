//! services/api/src/adapters/suggestions_llm.rs
//!
//! Generates conservation suggestions. Implements the `SuggestionService` port.

use crate::adapters::llm::complete;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use aravalli_core::domain::Suggestion;
use aravalli_core::ports::{PortError, PortResult, SuggestionService};
use regex::Regex;

const SYSTEM_INSTRUCTIONS: &str =
    "You are a conservation strategist advising on the Aravalli mountain range.";

const SUGGESTION_PROMPT: &str = "Generate 3 innovative, actionable, and specific suggestions for \
conserving the Aravalli mountain range. Focus on technology, policy, and community action. \
Return ONLY a JSON array with keys: category, title, description, impact (High/Medium/Low).";

#[derive(Clone)]
pub struct OpenAiSuggestionsAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSuggestionsAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Parses the first JSON array found anywhere in `text`.
pub fn extract_suggestions(text: &str) -> PortResult<Vec<Suggestion>> {
    let array_regex =
        Regex::new(r"(?s)\[.*\]").map_err(|e| PortError::Unexpected(e.to_string()))?;
    let matched = array_regex
        .find(text)
        .ok_or_else(|| PortError::ExternalService("Model returned no suggestions".to_string()))?;
    serde_json::from_str(matched.as_str()).map_err(|e| {
        PortError::ExternalService(format!("Model returned malformed suggestions: {}", e))
    })
}

#[async_trait]
impl SuggestionService for OpenAiSuggestionsAdapter {
    async fn generate_suggestions(&self) -> PortResult<Vec<Suggestion>> {
        let raw = complete(&self.client, &self.model, SYSTEM_INSTRUCTIONS, SUGGESTION_PROMPT).await?;
        extract_suggestions(&raw)
    }
}
