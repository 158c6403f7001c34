use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::Result;
use regex::Regex;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub system_config: SystemConfig,
    #[serde(default)]
    pub translator_config: TranslatorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Scratch directory for uploads and translated outputs.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
    /// Allowed browser origins. Empty means any origin.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_target_language")]
    pub default_target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("document_translator")
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
        "http://localhost:5175".to_string(),
    ]
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_provider() -> String {
    "claude".to_string()
}

fn default_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_api_key() -> String {
    std::env::var("ANTHROPIC_API_KEY").unwrap_or_default()
}

fn default_max_tokens() -> u32 {
    1024
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            temp_dir: default_temp_dir(),
            cors_origins: default_cors_origins(),
            max_upload_bytes: default_max_upload_bytes(),
            default_target_language: default_target_language(),
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            api_key: default_api_key(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

impl Config {
    /// Load a YAML or JSON config file, expanding `${VAR}` from the environment.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Configuration file not found: {}", path.display());
        }

        let content = load_text_file_with_guess_encoding(path)?;
        let content = substitute_env_vars(&content);

        let path_lower = path.to_string_lossy().to_lowercase();
        let config: Config = if path_lower.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        Ok(config)
    }
}

/// Replace `${VAR_NAME}` with the variable's value; unknown variables stay as written.
pub fn substitute_env_vars(content: &str) -> String {
    let pattern = Regex::new(r"\$\{(\w+)\}").expect("static regex");
    pattern
        .replace_all(content, |caps: &regex::Captures| {
            std::env::var(&caps[1]).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

/// Read a text file as UTF-8 (BOM stripped), falling back to GBK.
pub fn load_text_file_with_guess_encoding(path: &Path) -> Result<String> {
    let mut bytes = fs::read(path)?;
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        bytes.drain(0..3);
    }

    match String::from_utf8(bytes) {
        Ok(content) => Ok(content),
        Err(e) => {
            let (cow, _, _) = encoding_rs::GBK.decode(e.as_bytes());
            Ok(cow.into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml_with_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.yaml");
        fs::write(
            &path,
            "system_config:\n  port: 9100\n  temp_dir: /tmp/doc-translator-test\ntranslator_config:\n  api_key: abc\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.system_config.port, 9100);
        assert_eq!(config.system_config.temp_dir, PathBuf::from("/tmp/doc-translator-test"));
        assert_eq!(config.system_config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.translator_config.api_key, "abc");
        assert_eq!(config.translator_config.provider, "claude");
        assert_eq!(config.translator_config.max_tokens, 1024);
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("conf.json");
        fs::write(
            &path,
            r#"{"system_config": {"cors_origins": []}, "translator_config": {"provider": "openai_compatible", "temperature": 0.3}}"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.system_config.cors_origins.is_empty());
        assert_eq!(config.translator_config.provider, "openai_compatible");
        assert_eq!(config.translator_config.temperature, Some(0.3));
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("DOC_TRANSLATOR_TEST_KEY", "from-env");
        let out = substitute_env_vars("key: ${DOC_TRANSLATOR_TEST_KEY}\nother: ${DOC_TRANSLATOR_UNSET_VAR}");
        assert_eq!(out, "key: from-env\nother: ${DOC_TRANSLATOR_UNSET_VAR}");
    }

    #[test]
    fn test_bom_is_stripped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bom.yaml");
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"system_config:\n  port: 8123\n");
        fs::write(&path, bytes).unwrap();

        assert_eq!(Config::load(&path).unwrap().system_config.port, 8123);
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(Config::load("/nonexistent/conf.yaml").is_err());
    }
}
