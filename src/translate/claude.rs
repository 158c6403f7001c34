use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::interface::{translation_prompt, Translator, TRANSLATION_INSTRUCTION};
use crate::error::ProviderError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Claude translator speaking the Anthropic Messages API
pub struct ClaudeTranslator {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

impl ClaudeTranslator {
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        info!("Initialized ClaudeTranslator: model={}, base_url={}", model, base_url);
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl Translator for ClaudeTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: TRANSLATION_INSTRUCTION,
            messages: vec![Message {
                role: "user",
                content: translation_prompt(text, target_language),
            }],
        };

        debug!("Claude translate: {} chars -> {}", text.len(), target_language);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let result: MessagesResponse = response.json().await?;
        let translated: String = result
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect();

        if translated.is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "claude"
    }
}
