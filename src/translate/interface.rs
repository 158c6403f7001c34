/// Translate interface - one blocking provider call per fragment

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// System instruction sent with every request.
pub const TRANSLATION_INSTRUCTION: &str =
    "You are a document translator. Reply with the translated text only: no explanations, notes, quotes or alternatives.";

/// User turn carrying the text to translate.
pub fn translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {}. Return ONLY the translation, no explanations:\n\n{}",
        target_language, text
    )
}

/// A text-translation capability backed by an external provider.
///
/// No retries and no caching: each call is one provider round trip.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError>;

    /// Provider name used in logs.
    fn name(&self) -> &str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Language {
    pub code: String,
    pub name: String,
}

/// Target languages offered to clients.
pub fn supported_languages() -> Vec<Language> {
    [
        ("es", "Spanish"),
        ("fr", "French"),
        ("de", "German"),
        ("nl", "Dutch"),
        ("it", "Italian"),
    ]
    .into_iter()
    .map(|(code, name)| Language {
        code: code.to_string(),
        name: name.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_names_language_and_text() {
        let prompt = translation_prompt("Hello", "es");
        assert!(prompt.starts_with("Translate the following text to es."));
        assert!(prompt.ends_with("\n\nHello"));
    }

    #[test]
    fn test_supported_languages() {
        let codes: Vec<String> = supported_languages().into_iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["es", "fr", "de", "nl", "it"]);
    }
}
