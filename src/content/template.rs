use crate::content::ContentGenerator;
use crate::error::Result;
use crate::storage::{ItemKind, NewItem};
use async_trait::async_trait;

const QUESTION_TEMPLATES: &[(&str, &str)] = &[
    (
        "What is {topic}?",
        "Define {topic} in one or two sentences, then check it against your notes.",
    ),
    (
        "Why does {topic} matter?",
        "Name the problem {topic} solves or the question it answers.",
    ),
    (
        "What are the key ideas behind {topic}?",
        "List the two or three ideas everything else about {topic} builds on.",
    ),
    (
        "Give an example of {topic}.",
        "A concrete case of {topic}, ideally one from your course material.",
    ),
    (
        "What is a common misconception about {topic}?",
        "State the mistake, then the correction for {topic}.",
    ),
    (
        "How would you explain {topic} to a classmate?",
        "A short plain-language explanation of {topic} without jargon.",
    ),
];

/// Deterministic offline generator
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn notes(&self, topic: &str, count: usize) -> Vec<NewItem> {
        let title = title_case(topic);
        (1..=count)
            .map(|part| NewItem::Note {
                title: if count == 1 {
                    format!("{} Notes", title)
                } else {
                    format!("{} Notes (Part {})", title, part)
                },
                content: format!(
                    "# {}\n\n## Overview\n- What {} is and where it comes up\n\n## Key Points\n- \n- \n- \n\n## Questions to Review\n- ",
                    title, topic
                ),
                category: topic.to_string(),
                tags: vec![topic.to_lowercase()],
            })
            .collect()
    }

    pub fn flashcards(&self, topic: &str, count: usize) -> Vec<NewItem> {
        QUESTION_TEMPLATES
            .iter()
            .cycle()
            .take(count)
            .enumerate()
            .map(|(i, (question, answer))| {
                let round = i / QUESTION_TEMPLATES.len();
                let question = question.replace("{topic}", topic);
                NewItem::Flashcard {
                    question: if round == 0 {
                        question
                    } else {
                        format!("{} ({})", question, round + 1)
                    },
                    answer: answer.replace("{topic}", topic),
                    category: topic.to_string(),
                }
            })
            .collect()
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(&self, kind: ItemKind, topic: &str, count: usize) -> Result<Vec<NewItem>> {
        Ok(match kind {
            ItemKind::Notes => self.notes(topic, count),
            ItemKind::Flashcards => self.flashcards(topic, count),
            ItemKind::Schedule => Vec::new(),
        })
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_generates_requested_flashcard_count() {
        let cards = TemplateGenerator::new()
            .generate(ItemKind::Flashcards, "ninja", 8)
            .await
            .unwrap();
        assert_eq!(cards.len(), 8);
        match &cards[7] {
            NewItem::Flashcard {
                question, category, ..
            } => {
                assert!(question.contains("ninja"));
                assert!(question.ends_with("(2)"));
                assert_eq!(category, "ninja");
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_single_note_title() {
        let notes = TemplateGenerator::new()
            .generate(ItemKind::Notes, "french revolution", 1)
            .await
            .unwrap();
        match &notes[0] {
            NewItem::Note { title, tags, .. } => {
                assert_eq!(title, "French Revolution Notes");
                assert_eq!(tags, &vec!["french revolution".to_string()]);
            }
            other => panic!("unexpected item {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_schedule_is_not_generated() {
        let items = TemplateGenerator::new()
            .generate(ItemKind::Schedule, "physics", 3)
            .await
            .unwrap();
        assert!(items.is_empty());
    }
}
