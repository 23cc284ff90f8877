//! LLM Integration Module
//!
//! The understanding layer only ever needs one capability from a language
//! model: turn a list of chat messages into text. `LlmClient` is that seam;
//! `OpenRouterClient` is the production implementation.

pub mod openrouter;

#[cfg(test)]
pub(crate) mod mock;

use crate::error::Result;
use async_trait::async_trait;

// Re-export main types
pub use openrouter::{ChatRequest, ChatResponse, Message, OpenRouterClient};

/// Output format requested from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// Per-call generation settings
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub response_format: ResponseFormat,
    /// Overrides the client's configured model for this call.
    pub model: Option<String>,
}

impl CompletionOptions {
    pub fn json(max_tokens: u32, temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens,
            response_format: ResponseFormat::JsonObject,
            model: None,
        }
    }

    pub fn text(max_tokens: u32, temperature: f32) -> Self {
        Self {
            temperature,
            max_tokens,
            response_format: ResponseFormat::Text,
            model: None,
        }
    }
}

/// A chat-completion capability.
///
/// Implementations return `Error::LlmTruncated` when the provider stopped on
/// the token limit so callers can retry with a larger budget.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String>;
}
