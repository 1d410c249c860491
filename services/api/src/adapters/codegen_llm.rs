//! services/api/src/adapters/codegen_llm.rs
//!
//! This module contains the adapter for the code-editing LLM behind the admin
//! site builder. It implements the `CodeGenerationService` port from the `core` crate.

use crate::adapters::llm::{complete, strip_code_fence};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use aravalli_core::ports::{CodeGenerationService, PortError, PortResult};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

const SELECTION_SYSTEM: &str = "You are a senior React developer analyzing a project codebase. \
The user wants to make a change. Your task is to identify which files need to be edited. \
Return ONLY a JSON object with a single key \"files\" that is an array of the file paths. \
Example: { \"files\": [\"src/components/Sidebar.tsx\", \"src/App.tsx\"] }";

const SELECTION_TEMPLATE: &str = r#"User Prompt: "{request}"

Available Files:
{files}

Analyze the user's prompt and the file list, and decide which files are necessary to modify."#;

const GENERATION_SYSTEM: &str = "You are an expert React developer. Your task is to modify the \
given code files based on the user's request. Return a JSON object where keys are the file \
paths and values are the COMPLETE updated source code for that file. Ensure the code is \
complete and functional. Only include files that you have modified. Return ONLY the JSON.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `CodeGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiCodegenAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCodegenAdapter {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

#[derive(Deserialize)]
struct FileSelection {
    #[serde(default)]
    files: Vec<String>,
}

/// Reads `{"files": [...]}`. Anything unparseable is an empty selection.
pub fn parse_file_selection(raw: &str) -> Vec<String> {
    match serde_json::from_str::<FileSelection>(strip_code_fence(raw)) {
        Ok(selection) => selection.files,
        Err(e) => {
            warn!(error = %e, "File selection was not valid JSON; treating as empty");
            Vec::new()
        }
    }
}

/// Reads a JSON object mapping paths to complete file contents.
pub fn parse_generated_files(raw: &str) -> PortResult<BTreeMap<String, String>> {
    serde_json::from_str::<BTreeMap<String, String>>(strip_code_fence(raw)).map_err(|e| {
        PortError::ExternalService(format!("Model returned malformed code changes: {}", e))
    })
}

fn render_files(files: &BTreeMap<String, String>) -> String {
    files
        .iter()
        .map(|(path, code)| format!("FILE: {}\n```\n{}\n```\n", path, code))
        .collect::<Vec<_>>()
        .join("\n")
}

//=========================================================================================
// `CodeGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl CodeGenerationService for OpenAiCodegenAdapter {
    async fn select_files(&self, request: &str, available: &[String]) -> PortResult<Vec<String>> {
        let listing = serde_json::to_string_pretty(available)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        let user = SELECTION_TEMPLATE
            .replace("{request}", request)
            .replace("{files}", &listing);

        let raw = complete(&self.client, &self.model, SELECTION_SYSTEM, &user).await?;
        let selected = parse_file_selection(&raw);
        info!(count = selected.len(), "Model selected files");
        Ok(selected)
    }

    async fn generate_changes(
        &self,
        request: &str,
        files: &BTreeMap<String, String>,
    ) -> PortResult<BTreeMap<String, String>> {
        let user = format!(
            "User Request: \"{}\"\n\nCurrent Code:\n{}",
            request,
            render_files(files)
        );
        let raw = complete(&self.client, &self.model, GENERATION_SYSTEM, &user).await?;
        parse_generated_files(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_accepts_fenced_json() {
        let raw = "```json\n{ \"files\": [\"src/App.tsx\"] }\n```";
        assert_eq!(parse_file_selection(raw), vec!["src/App.tsx".to_string()]);
    }

    #[test]
    fn malformed_selection_is_empty() {
        assert!(parse_file_selection("I think you should edit App.tsx").is_empty());
        assert!(parse_file_selection("{}").is_empty());
    }

    #[test]
    fn generated_files_must_be_a_string_map() {
        let parsed = parse_generated_files(r#"{"src/App.tsx": "export default 1;"}"#).unwrap();
        assert_eq!(parsed["src/App.tsx"], "export default 1;");

        assert!(matches!(
            parse_generated_files("not json"),
            Err(PortError::ExternalService(_))
        ));
        assert!(parse_generated_files(r#"{"src/App.tsx": 3}"#).is_err());
    }
}
