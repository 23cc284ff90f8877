use crate::storage::ItemKind;
use crate::understanding::schemas::create_json_prompt;

/// Centralized prompt management to ensure consistency across all LLM interactions
pub struct PromptManager;

impl PromptManager {
    /// System prompt for turning a chat message into structured study actions
    pub fn get_task_parse_system_prompt() -> String {
        let instruction = "You are the command parser of a study assistant. \
        Turn the user's message into the list of actions it asks for, one per request, in the order given. \
        Actions are create, delete, update and read; targets are notes, flashcards and schedule. \
        Silently correct spelling mistakes (\"flashcaed\" means flashcards, \"fpor\" means for). \
        When a request says \"it\", \"that\" or only describes the material (\"detailed notes\"), \
        reuse the most recent concrete topic; never use an adjective or a pronoun as a topic. \
        Use \"all\" as the topic only when the user asks for every item of a kind. \
        Copy day and time phrases verbatim into timeString.";

        create_json_prompt(instruction)
    }

    /// User message carrying both the raw and the typo-corrected text
    pub fn create_task_parse_user_message(
        original: &str,
        corrected: &str,
        recent_conversation: Option<&str>,
    ) -> String {
        let mut parts = Vec::new();

        if let Some(history) = recent_conversation {
            parts.push(format!(
                "## Recent Conversation\n{}\n\nUse this only to resolve references like \"it\".",
                history
            ));
        }

        parts.push(format!("## User Message\n{}", original));
        if corrected != original {
            parts.push(format!("## Spell-Corrected\n{}", corrected));
        }
        parts.push("Respond with the JSON array only.".to_string());

        parts.join("\n\n")
    }

    /// System prompt for generating study material
    pub fn get_content_system_prompt() -> String {
        "You write concise, accurate study material for students. \
        You always respond with valid JSON when JSON format is requested."
            .to_string()
    }

    /// Request for `count` items of `kind` about `topic`
    pub fn create_content_user_message(kind: ItemKind, topic: &str, count: usize) -> String {
        let shape = match kind {
            ItemKind::Flashcards => r#"{"question": "...", "answer": "..."}"#,
            ItemKind::Notes => r#"{"title": "...", "content": "markdown body", "tags": ["..."]}"#,
            ItemKind::Schedule => r#"{"title": "..."}"#,
        };

        format!(
            "Write {} {} about \"{}\".\n\nRespond with a JSON array of {} objects shaped like {}. \
            Do not include any text before or after the JSON.",
            count,
            kind.noun(count),
            Self::truncate_text(topic, 200),
            count,
            shape
        )
    }

    /// Truncate text to specified length with ellipsis
    pub fn truncate_text(text: &str, max_len: usize) -> String {
        if text.chars().count() <= max_len {
            text.to_string()
        } else {
            let kept: String = text.chars().take(max_len.saturating_sub(3)).collect();
            format!("{}...", kept)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_carries_contract() {
        let prompt = PromptManager::get_task_parse_system_prompt();
        assert!(prompt.contains("timeString"));
        assert!(prompt.contains("never use an adjective"));
        assert!(prompt.contains("JSON"));
    }

    #[test]
    fn test_user_message_includes_correction_only_when_changed() {
        let same = PromptManager::create_task_parse_user_message("make notes", "make notes", None);
        assert!(!same.contains("Spell-Corrected"));

        let fixed = PromptManager::create_task_parse_user_message(
            "crete notes",
            "create notes",
            Some("User: notes on rome"),
        );
        assert!(fixed.contains("## Spell-Corrected\ncreate notes"));
        assert!(fixed.contains("Recent Conversation"));
    }

    #[test]
    fn test_content_message() {
        let message = PromptManager::create_content_user_message(ItemKind::Flashcards, "cells", 3);
        assert!(message.contains("3 flashcards about \"cells\""));
        assert!(message.contains("question"));
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(PromptManager::truncate_text("short", 10), "short");
        assert_eq!(PromptManager::truncate_text("ééééééééé", 6), "ééé...");
    }
}
