use std::sync::Arc;
use tracing::info;
use anyhow::Result;

use super::claude::ClaudeTranslator;
use super::interface::Translator;
use super::openai_compatible::OpenAICompatibleTranslator;
use crate::config::TranslatorConfig;

/// Factory for creating translation providers
pub struct TranslatorFactory;

impl TranslatorFactory {
    /// Create the translator named by `config.provider`.
    pub fn create_translator(config: &TranslatorConfig) -> Result<Arc<dyn Translator>> {
        info!("Initializing translator: {}", config.provider);

        match config.provider.as_str() {
            "claude" | "anthropic" | "claude_llm" => {
                if config.api_key.trim().is_empty() {
                    anyhow::bail!("ANTHROPIC_API_KEY is not set");
                }
                Ok(Arc::new(ClaudeTranslator::new(
                    config.base_url.clone(),
                    config.api_key.clone(),
                    config.model.clone(),
                    config.max_tokens,
                )))
            }
            "openai_compatible" | "openai" | "ollama" => Ok(Arc::new(OpenAICompatibleTranslator::new(
                config.base_url.clone(),
                config.api_key.clone(),
                config.model.clone(),
                config.max_tokens,
                config.temperature,
            ))),
            _ => Err(anyhow::anyhow!("Unsupported translation provider: {}", config.provider)),
        }
    }
}
