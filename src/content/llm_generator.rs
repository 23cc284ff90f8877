use crate::content::{ContentGenerator, TemplateGenerator};
use crate::error::Result;
use crate::llm::{CompletionOptions, LlmClient, OpenRouterClient};
use crate::prompts::PromptManager;
use crate::storage::{ItemKind, NewItem};
use crate::understanding::json_extract::extract_json;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const CONTENT_MAX_TOKENS: u32 = 4096;
const CONTENT_TEMPERATURE: f32 = 0.7;

/// Asks the LLM for study material and fills any gap from templates
pub struct LlmContentGenerator {
    client: Arc<dyn LlmClient>,
    fallback: TemplateGenerator,
}

impl LlmContentGenerator {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            fallback: TemplateGenerator::new(),
        }
    }

    async fn request(&self, kind: ItemKind, topic: &str, count: usize) -> Result<Vec<NewItem>> {
        let messages = vec![
            OpenRouterClient::create_system_message(&PromptManager::get_content_system_prompt()),
            OpenRouterClient::create_user_message(&PromptManager::create_content_user_message(
                kind, topic, count,
            )),
        ];
        let options = CompletionOptions::json(CONTENT_MAX_TOKENS, CONTENT_TEMPERATURE);
        let text = self.client.complete(&messages, &options).await?;

        Ok(extract_json(&text)
            .unwrap_or_default()
            .iter()
            .filter_map(|value| item_from_value(kind, topic, value))
            .take(count)
            .collect())
    }
}

#[async_trait]
impl ContentGenerator for LlmContentGenerator {
    async fn generate(&self, kind: ItemKind, topic: &str, count: usize) -> Result<Vec<NewItem>> {
        if kind == ItemKind::Schedule || count == 0 {
            return Ok(Vec::new());
        }

        let mut items = match self.request(kind, topic, count).await {
            Ok(items) => items,
            Err(e) => {
                warn!("Content generation for '{}' failed, using templates: {}", topic, e);
                Vec::new()
            }
        };

        if items.len() < count {
            debug!(
                "LLM produced {}/{} {}; padding from templates",
                items.len(),
                count,
                kind
            );
            let missing = self.fallback.generate(kind, topic, count).await?;
            items.extend(missing.into_iter().skip(items.len()));
        }
        Ok(items)
    }
}

fn item_from_value(kind: ItemKind, topic: &str, value: &Value) -> Option<NewItem> {
    match kind {
        ItemKind::Flashcards => Some(NewItem::Flashcard {
            question: text_field(value, &["question", "front", "q"])?,
            answer: text_field(value, &["answer", "back", "a"])?,
            category: topic.to_string(),
        }),
        ItemKind::Notes => {
            let tags = value
                .get("tags")
                .and_then(Value::as_array)
                .map(|tags| {
                    tags.iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_else(|| vec![topic.to_lowercase()]);
            Some(NewItem::Note {
                title: text_field(value, &["title"]).unwrap_or_else(|| format!("{} notes", topic)),
                content: text_field(value, &["content", "body", "text"])?,
                category: topic.to_string(),
                tags,
            })
        }
        ItemKind::Schedule => None,
    }
}

/// First non-blank string under any of `keys`
fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::llm::mock::ScriptedLlm;

    #[tokio::test]
    async fn test_uses_llm_cards() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"[{"question":"What is ATP?","answer":"Energy currency"},{"front":"Krebs?","back":"Citric acid cycle"}]"#,
        ));
        let cards = LlmContentGenerator::new(llm)
            .generate(ItemKind::Flashcards, "cells", 2)
            .await
            .unwrap();

        assert_eq!(cards.len(), 2);
        assert!(matches!(&cards[1], NewItem::Flashcard { answer, .. } if answer == "Citric acid cycle"));
    }

    #[tokio::test]
    async fn test_pads_short_response_from_templates() {
        let llm = Arc::new(ScriptedLlm::replying(
            r#"[{"question":"What is ATP?","answer":"Energy currency"}]"#,
        ));
        let cards = LlmContentGenerator::new(llm)
            .generate(ItemKind::Flashcards, "cells", 3)
            .await
            .unwrap();
        assert_eq!(cards.len(), 3);
    }

    #[tokio::test]
    async fn test_falls_back_when_llm_fails() {
        let llm = Arc::new(ScriptedLlm::new(vec![Err(Error::LlmUnavailable {
            message: "timeout".to_string(),
        })]));
        let notes = LlmContentGenerator::new(llm)
            .generate(ItemKind::Notes, "rome", 1)
            .await
            .unwrap();
        assert!(matches!(&notes[0], NewItem::Note { title, .. } if title == "Rome Notes"));
    }

    #[test]
    fn test_note_without_content_is_rejected() {
        let value = serde_json::json!({"title": "Rome"});
        assert!(item_from_value(ItemKind::Notes, "rome", &value).is_none());
    }
}
