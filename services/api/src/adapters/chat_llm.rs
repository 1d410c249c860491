//! services/api/src/adapters/chat_llm.rs
//!
//! The moderated assistant behind `POST /api/chat`.

use crate::adapters::llm::complete;
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use aravalli_core::ports::{ChatService, PortResult};

const SYSTEM_INSTRUCTIONS: &str = r#"You are "Aravalli AI", an intelligent assistant for the "Aravalli Range Monitor" application.
Your goal is to provide information about the Aravalli mountain range, environmental conservation, ecology, and sustainability.

CRITICAL MODERATION RULES:
1. You must ONLY answer questions related to:
   - The Aravalli Range and its geography/history.
   - Environmental conservation, ecology, and biodiversity.
   - Climate change, pollution, and sustainability.
   - The data shown in this dashboard (NDVI, Nightlight, etc.).
2. If a user asks about anything else (e.g., politics, entertainment, coding, general knowledge unrelated to nature), you must politely decline.
   - Example refusal: "I specialize in environmental monitoring for the Aravalli range. I cannot assist with that topic."
3. Be concise, helpful, and data-driven where possible.
4. If asked for suggestions, provide actionable conservation tips."#;

pub const EMPTY_REPLY: &str = "I couldn't generate a response. Please try again.";

#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChatAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl ChatService for OpenAiChatAdapter {
    async fn reply(&self, message: &str) -> PortResult<String> {
        let answer = complete(&self.client, &self.model, SYSTEM_INSTRUCTIONS, message).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(EMPTY_REPLY.to_string());
        }
        Ok(answer.to_string())
    }
}
