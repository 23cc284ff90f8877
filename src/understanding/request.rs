use crate::understanding::action::{Action, ALL_TOPIC, DEFAULT_TOPIC};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parse result for one user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub actions: Vec<Action>,
    /// Plain-language restatement; parsing it again yields the same actions
    pub message: String,
    pub confidence: f32,
}

impl TaskRequest {
    pub fn new(actions: Vec<Action>, confidence: f32) -> Self {
        let message = if actions.is_empty() {
            "no actions recognised".to_string()
        } else {
            actions
                .iter()
                .map(Action::restate)
                .collect::<Vec<_>>()
                .join(", then ")
        };
        let confidence = if actions.is_empty() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };

        Self {
            actions,
            message,
            confidence,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Distinct concrete topics in order of first appearance
    pub fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = Vec::new();
        for action in &self.actions {
            let topic = &action.data.topic;
            if topic != ALL_TOPIC && topic != DEFAULT_TOPIC && !topics.contains(topic) {
                topics.push(topic.clone());
            }
        }
        topics
    }
}

impl fmt::Display for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "\x1b[1m📋 {}\x1b[0m (confidence {:.0}%)",
            self.message,
            self.confidence * 100.0
        )?;
        for action in &self.actions {
            writeln!(f, "   {}. {}", action.priority + 1, action)?;
        }
        Ok(())
    }
}
