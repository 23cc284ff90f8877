//! Application configuration
//!
//! All sections default sensibly so a config file only needs to name what it
//! changes. The OpenRouter API key itself never lives in the file; the file
//! names the environment variable that holds it.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// OpenRouter endpoint and model selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenRouterConfig {
    pub api_base: String,
    pub model: String,
    pub api_key_env: String,
    pub timeout_ms: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "openai/gpt-4o-mini".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Knobs for the heuristic/LLM parsing pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub max_attempts: u32,
    pub initial_max_tokens: u32,
    pub max_tokens_cap: u32,
    pub temperature: f32,
    /// Heuristic parses below this confidence are sent to the LLM.
    pub confidence_threshold: f32,
    /// Send compound commands with any ambiguous clause to the LLM.
    pub llm_for_compound: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_max_tokens: 2048,
            max_tokens_cap: 8192,
            temperature: 0.1,
            confidence_threshold: 0.7,
            llm_for_compound: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub default_flashcard_count: u32,
    pub default_note_count: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_flashcard_count: 5,
            default_note_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_entries: usize,
    /// Seed topic inheritance with the last topic of the previous turn.
    pub inherit_topics_across_turns: bool,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            inherit_topics_across_turns: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file to persist items in; in-memory storage when unset.
    pub path: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: String,
    pub openrouter: OpenRouterConfig,
    pub parser: ParserConfig,
    pub executor: ExecutorConfig,
    pub conversation: ConversationConfig,
    pub storage: StorageConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            openrouter: OpenRouterConfig::default(),
            parser: ParserConfig::default(),
            executor: ExecutorConfig::default(),
            conversation: ConversationConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let parser = &self.parser;
        if parser.max_attempts == 0 {
            return Err(Error::invalid_config("parser.max_attempts must be at least 1."));
        }
        if parser.initial_max_tokens == 0 || parser.max_tokens_cap == 0 {
            return Err(Error::invalid_config("parser token budgets must be positive."));
        }
        if parser.initial_max_tokens > parser.max_tokens_cap {
            return Err(Error::invalid_config(
                "parser.initial_max_tokens must not exceed parser.max_tokens_cap.",
            ));
        }
        if !(0.0..=2.0).contains(&parser.temperature) {
            return Err(Error::invalid_config("parser.temperature must be within [0, 2]."));
        }
        if !(0.0..=1.0).contains(&parser.confidence_threshold) {
            return Err(Error::invalid_config(
                "parser.confidence_threshold must be within [0, 1].",
            ));
        }
        if self.openrouter.api_base.trim().is_empty() {
            return Err(Error::invalid_config("openrouter.api_base must not be empty."));
        }
        if self.conversation.max_entries == 0 {
            return Err(Error::invalid_config("conversation.max_entries must be at least 1."));
        }
        Ok(())
    }

    /// Get configuration summary for display
    pub fn summary(&self) -> Vec<String> {
        vec![
            "Configuration".to_string(),
            format!("  Log Level: {}", self.log_level),
            "OpenRouter".to_string(),
            format!("  API Base: {}", self.openrouter.api_base),
            format!("  Model: {}", self.openrouter.model),
            format!("  API Key Variable: {}", self.openrouter.api_key_env),
            "Parser".to_string(),
            format!("  Max Attempts: {}", self.parser.max_attempts),
            format!(
                "  Token Budget: {} -> {}",
                self.parser.initial_max_tokens, self.parser.max_tokens_cap
            ),
            format!("  Temperature: {}", self.parser.temperature),
            "Storage".to_string(),
            match &self.storage.path {
                Some(path) => format!("  File: {}", path.display()),
                None => "  In-memory".to_string(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.openrouter.model, "openai/gpt-4o-mini");
        assert_eq!(config.parser.max_attempts, 3);
        assert_eq!(config.parser.initial_max_tokens, 2048);
        assert_eq!(config.parser.max_tokens_cap, 8192);
        assert!(!config.conversation.inherit_topics_across_turns);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            log_level = "debug"

            [parser]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.parser.max_attempts, 5);
        assert_eq!(config.parser.initial_max_tokens, 2048);
        assert_eq!(config.openrouter.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn test_rejects_inverted_budgets() {
        let result = AppConfig::from_toml(
            r#"
            [parser]
            initial_max_tokens = 9000
            max_tokens_cap = 4096
            "#,
        );
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let result = AppConfig::from_toml("[parser]\nmax_attempts = 0\n");
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[storage]\npath = \"items.json\"").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.storage.path, Some(PathBuf::from("items.json")));
    }

    #[test]
    fn test_summary_mentions_model() {
        let config = AppConfig::default();
        let summary = config.summary();
        assert!(summary.iter().any(|line| line.contains("openai/gpt-4o-mini")));
        assert!(summary.iter().any(|line| line.contains("In-memory")));
    }
}
