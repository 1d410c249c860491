//! services/api/src/adapters/llm.rs
//!
//! Pieces shared by every language-model adapter: client construction, a
//! single-turn chat completion and cleanup of fenced model output.

use aravalli_core::domain::Suggestion;
use aravalli_core::ports::{
    ChatService, CodeGenerationService, ImageInsightService, PortError, PortResult,
    SuggestionService,
};
use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Builds a client for an OpenAI-compatible endpoint.
pub fn build_client(api_key: &str, api_base: Option<&str>) -> Client<OpenAIConfig> {
    let mut config = OpenAIConfig::new().with_api_key(api_key);
    if let Some(base) = api_base {
        config = config.with_api_base(base);
    }
    Client::with_config(config)
}

/// Sends one system + user exchange and returns the first choice's text.
pub(crate) async fn complete(
    client: &Client<OpenAIConfig>,
    model: &str,
    system: &str,
    user: &str,
) -> PortResult<String> {
    let messages = vec![
        ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        ),
        ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?,
        ),
    ];

    let request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .messages(messages)
        .build()
        .map_err(|e| PortError::Unexpected(e.to_string()))?;

    let response = client
        .chat()
        .create(request)
        .await
        .map_err(|e: OpenAIError| PortError::ExternalService(e.to_string()))?;

    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default())
}

/// Strips a surrounding Markdown code fence (with optional language tag).
pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

//=========================================================================================
// Stand-in used when no API key is configured
//=========================================================================================

const NOT_CONFIGURED: &str = "AI service is not configured";

/// Answers every model-backed port with an `ExternalService` error.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledLlm;

#[async_trait]
impl CodeGenerationService for DisabledLlm {
    async fn select_files(&self, _request: &str, _available: &[String]) -> PortResult<Vec<String>> {
        Err(PortError::ExternalService(NOT_CONFIGURED.to_string()))
    }

    async fn generate_changes(
        &self,
        _request: &str,
        _files: &BTreeMap<String, String>,
    ) -> PortResult<BTreeMap<String, String>> {
        Err(PortError::ExternalService(NOT_CONFIGURED.to_string()))
    }
}

#[async_trait]
impl ChatService for DisabledLlm {
    async fn reply(&self, _message: &str) -> PortResult<String> {
        Err(PortError::ExternalService(NOT_CONFIGURED.to_string()))
    }
}

#[async_trait]
impl ImageInsightService for DisabledLlm {
    async fn describe_image(&self, _data_url: &str) -> PortResult<String> {
        Err(PortError::ExternalService(NOT_CONFIGURED.to_string()))
    }
}

#[async_trait]
impl SuggestionService for DisabledLlm {
    async fn generate_suggestions(&self) -> PortResult<Vec<Suggestion>> {
        Err(PortError::ExternalService(NOT_CONFIGURED.to_string()))
    }
}
