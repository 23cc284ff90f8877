use crate::config::OpenRouterConfig;
use crate::error::{Error, Result};
use crate::llm::{CompletionOptions, LlmClient, ResponseFormat};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// OpenRouter API client for chat completions
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

/// Request structure for OpenRouter API
#[derive(Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
}

/// Message structure for chat requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

/// Response structure from OpenRouter API
#[derive(Deserialize)]
pub struct ChatResponse {
    pub choices: Vec<Choice>,
}

#[derive(Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Assistant message as returned; `content` may be null on some providers.
#[derive(Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenRouterClient {
    /// Create a new OpenRouter API client with default endpoint and model
    pub fn new(api_key: String) -> Self {
        let config = OpenRouterConfig::default();
        Self {
            client: Client::new(),
            api_key,
            base_url: config.api_base,
            model: config.model,
        }
    }

    /// Create a client from configuration
    pub fn from_config(api_key: String, config: &OpenRouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self {
            client,
            api_key,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    /// Read the API key from the configured environment variable
    pub fn from_env(config: &OpenRouterConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::invalid_config(format!(
                "OpenRouter API key not found in environment variable {}",
                config.api_key_env
            ))
        })?;

        if api_key.trim().is_empty() {
            return Err(Error::invalid_config("OpenRouter API key is empty"));
        }

        if api_key.len() < 10 {
            return Err(Error::invalid_config(
                "OpenRouter API key appears to be invalid (too short)",
            ));
        }

        Self::from_config(api_key, config)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, messages: &[Message], options: &CompletionOptions) -> ChatRequest {
        let response_format = match options.response_format {
            ResponseFormat::JsonObject => Some(serde_json::json!({ "type": "json_object" })),
            ResponseFormat::Text => None,
        };

        ChatRequest {
            model: options.model.clone().unwrap_or_else(|| self.model.clone()),
            messages: messages.to_vec(),
            max_tokens: Some(options.max_tokens),
            temperature: Some(options.temperature),
            response_format,
        }
    }

    /// Send a conversation to OpenRouter API
    pub async fn send_conversation(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<ChatResponse> {
        let request = self.build_request(messages, options);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::LlmUnavailable {
                message: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::LlmUnavailable {
                message: format!("API request failed: {}", response.status()),
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response)
    }

    /// Create a system message for conversation context
    pub fn create_system_message(content: &str) -> Message {
        Message {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    /// Create a user message
    pub fn create_user_message(content: &str) -> Message {
        Message {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<String> {
        let response = self.send_conversation(messages, options).await?;
        utils::completion_text(response, options.max_tokens)
    }
}

/// Utility functions for response handling
pub mod utils {
    use super::ChatResponse;
    use crate::error::{Error, Result};

    /// Extract the completion text, mapping a length stop to `LlmTruncated`
    pub fn completion_text(response: ChatResponse, max_tokens: u32) -> Result<String> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::MalformedLlmOutput {
                message: "No choices in LLM response".to_string(),
            })?;

        let content = choice.message.content.unwrap_or_default();

        if choice.finish_reason.as_deref() == Some("length") {
            return Err(Error::LlmTruncated {
                max_tokens,
                partial: content,
            });
        }

        if content.trim().is_empty() {
            return Err(Error::MalformedLlmOutput {
                message: "Empty completion".to_string(),
            });
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(json: serde_json::Value) -> ChatResponse {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_completion_text_returns_content() {
        let resp = response(serde_json::json!({
            "id": "gen-1",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "[]" }, "finish_reason": "stop" }]
        }));
        assert_eq!(utils::completion_text(resp, 2048).unwrap(), "[]");
    }

    #[test]
    fn test_length_finish_reason_is_truncation() {
        let resp = response(serde_json::json!({
            "choices": [{ "message": { "content": "[{\"action\": \"cre" }, "finish_reason": "length" }]
        }));
        match utils::completion_text(resp, 4096) {
            Err(Error::LlmTruncated { max_tokens, partial }) => {
                assert_eq!(max_tokens, 4096);
                assert!(partial.starts_with("[{"));
            }
            _ => panic!("expected truncation"),
        }
    }

    #[test]
    fn test_empty_choices_is_malformed() {
        let resp = response(serde_json::json!({ "choices": [] }));
        assert!(matches!(
            utils::completion_text(resp, 2048),
            Err(Error::MalformedLlmOutput { .. })
        ));
    }

    #[test]
    fn test_request_includes_json_response_format() {
        let client = OpenRouterClient::new("sk-or-test-key".to_string());
        let options = CompletionOptions::json(2048, 0.1);
        let request = client.build_request(
            &[OpenRouterClient::create_user_message("make notes")],
            &options,
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["max_tokens"], 2048);
        assert_eq!(value["model"], "openai/gpt-4o-mini");
    }

    #[test]
    fn test_text_request_omits_response_format() {
        let client = OpenRouterClient::new("sk-or-test-key".to_string());
        let request = client.build_request(&[], &CompletionOptions::text(512, 0.7));
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("response_format").is_none());
    }
}
