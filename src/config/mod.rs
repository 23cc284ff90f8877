//! Configuration Module
//!
//! TOML-backed application settings for the LLM provider, the parsing
//! pipeline, action execution, conversation memory and storage.

pub mod settings;

// Re-export main types
pub use settings::{
    AppConfig, ConversationConfig, ExecutorConfig, OpenRouterConfig, ParserConfig, StorageConfig,
};
