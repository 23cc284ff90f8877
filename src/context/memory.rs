use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One exchange with the user plus the topics it touched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryEntry {
    pub timestamp: DateTime<Utc>,
    pub user_input: String,
    pub ai_response: String,
    pub topics: Vec<String>,
}

impl MemoryEntry {
    pub fn new(user_input: String, ai_response: String, topics: Vec<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            user_input,
            ai_response,
            topics,
        }
    }
}

/// Bounded history of recent turns.
///
/// Only a read-side hint: the parser may consult it to resolve vague topics
/// but a single message parses correctly without it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory {
    entries: VecDeque<MemoryEntry>,
    max_entries: usize,
}

impl Default for ConversationMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::with_capacity(50)
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Record a finished turn, evicting the oldest entry when full
    pub fn record(&mut self, user_input: &str, ai_response: &str, topics: Vec<String>) {
        self.entries.push_back(MemoryEntry::new(
            user_input.to_string(),
            ai_response.to_string(),
            topics,
        ));

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Most recent `n` entries, oldest first
    pub fn recent(&self, n: usize) -> Vec<&MemoryEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).collect()
    }

    /// The last topic mentioned in any remembered turn
    pub fn last_topic(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find_map(|entry| entry.topics.last())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Compact rendering of the last `n` turns for an LLM prompt
    pub fn format_for_prompt(&self, n: usize) -> Option<String> {
        let recent = self.recent(n);
        if recent.is_empty() {
            return None;
        }

        let lines: Vec<String> = recent
            .iter()
            .map(|entry| {
                let topics = if entry.topics.is_empty() {
                    "none".to_string()
                } else {
                    entry.topics.join(", ")
                };
                format!(
                    "- User: {} | Topics: {}",
                    truncate_text(&entry.user_input, 120),
                    topics
                )
            })
            .collect();
        Some(lines.join("\n"))
    }
}

fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_enforced() {
        let mut memory = ConversationMemory::with_capacity(2);
        memory.record("one", "ok", vec!["a".to_string()]);
        memory.record("two", "ok", vec!["b".to_string()]);
        memory.record("three", "ok", vec!["c".to_string()]);

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.recent(5)[0].user_input, "two");
    }

    #[test]
    fn test_last_topic_skips_topicless_turns() {
        let mut memory = ConversationMemory::new();
        memory.record("make notes on cells", "done", vec!["cells".to_string()]);
        memory.record("thanks", "you're welcome", vec![]);
        assert_eq!(memory.last_topic(), Some("cells"));
    }

    #[test]
    fn test_format_for_prompt() {
        let mut memory = ConversationMemory::new();
        assert!(memory.format_for_prompt(3).is_none());

        memory.record("make notes on cells", "done", vec!["cells".to_string()]);
        let formatted = memory.format_for_prompt(3).unwrap();
        assert!(formatted.contains("make notes on cells"));
        assert!(formatted.contains("Topics: cells"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(200);
        let truncated = truncate_text(&text, 10);
        assert_eq!(truncated.chars().count(), 10);
        assert!(truncated.ends_with("..."));
    }
}
