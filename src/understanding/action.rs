use crate::storage::ItemKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The collection an action operates on
pub type Target = ItemKind;

/// Topic used when nothing concrete could be resolved
pub const DEFAULT_TOPIC: &str = "general";

/// Topic marker for actions that address every item of a kind
pub const ALL_TOPIC: &str = "all";

/// CRUD verb of an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Create,
    Delete,
    Update,
    Read,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Create => "create",
            ActionType::Delete => "delete",
            ActionType::Update => "update",
            ActionType::Read => "read",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    /// Lenient: accepts the synonyms an LLM tends to emit
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" | "make" | "generate" | "add" | "write" | "new" | "schedule" => {
                Ok(ActionType::Create)
            }
            "delete" | "remove" | "clear" | "erase" | "drop" => Ok(ActionType::Delete),
            "update" | "reschedule" | "move" | "edit" | "change" | "modify" => {
                Ok(ActionType::Update)
            }
            "read" | "show" | "list" | "find" | "search" | "view" | "get" | "query" => {
                Ok(ActionType::Read)
            }
            other => Err(format!("Unknown action type: {}", other)),
        }
    }
}

/// Lenient target parsing for LLM output ("flashcard", "cards", "event", ...)
pub fn parse_target(s: &str) -> Option<Target> {
    match s.trim().to_lowercase().as_str() {
        "note" | "notes" | "summary" | "summaries" => Some(ItemKind::Notes),
        "flashcard" | "flashcards" | "card" | "cards" | "flash card" | "flash cards" => {
            Some(ItemKind::Flashcards)
        }
        "schedule" | "schedules" | "event" | "events" | "class" | "classes" | "exam" | "exams"
        | "calendar" | "plan" | "session" | "sessions" | "reminder" => Some(ItemKind::Schedule),
        _ => None,
    }
}

/// Payload of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionData {
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,
    /// Addresses every item of the target kind rather than a topic
    #[serde(default)]
    pub all: bool,
}

/// One structured unit of work derived from user text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub target: Target,
    pub data: ActionData,
    /// Ordering hint; the position in the batch unless set otherwise
    pub priority: usize,
}

impl Action {
    pub fn is_mass_delete(&self) -> bool {
        self.action_type == ActionType::Delete && self.data.all
    }

    pub fn is_confirmed(&self) -> bool {
        self.data.confirm == Some(true)
    }

    /// Plain-language restatement that parses back to an equivalent action
    pub fn restate(&self) -> String {
        let noun = |count: Option<u32>| match (self.target, count) {
            (ItemKind::Notes, Some(1)) => "note",
            (ItemKind::Notes, _) => "notes",
            (ItemKind::Flashcards, Some(1)) => "flashcard",
            (ItemKind::Flashcards, _) => "flashcards",
            (ItemKind::Schedule, _) => "schedule",
        };
        let time = self
            .data
            .time_expression
            .as_deref()
            .map(|t| format!(" {}", t))
            .unwrap_or_default();

        match (self.action_type, self.target) {
            (ActionType::Create, ItemKind::Schedule) => {
                format!("schedule {}{}", self.data.topic, time)
            }
            (ActionType::Create, _) => match self.data.count {
                Some(count) => format!(
                    "create {} {} about {}",
                    count,
                    noun(Some(count)),
                    self.data.topic
                ),
                None => format!("create {} about {}", noun(None), self.data.topic),
            },
            (ActionType::Delete, _) if self.data.all => {
                let confirm = if self.is_confirmed() { " confirm" } else { "" };
                format!("delete all {}{}", noun(None), confirm)
            }
            (ActionType::Delete, _) => format!("delete {} about {}", noun(None), self.data.topic),
            (ActionType::Read, _) if self.data.all => format!("show all {}", noun(None)),
            (ActionType::Read, _) => format!("show {} about {}", noun(None), self.data.topic),
            (ActionType::Update, ItemKind::Schedule) => match &self.data.time_expression {
                Some(t) => format!("reschedule {} to {}", self.data.topic, t),
                None => format!("reschedule {}", self.data.topic),
            },
            (ActionType::Update, _) => format!("update {} about {}", noun(None), self.data.topic),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} [{}]", self.action_type, self.target, self.data.topic)?;
        if let Some(count) = self.data.count {
            write!(f, " x{}", count)?;
        }
        if let Some(time) = &self.data.time_expression {
            write!(f, " @ {}", time)?;
        }
        Ok(())
    }
}

/// Classifier output before topic inheritance has run
#[derive(Debug, Clone, PartialEq)]
pub struct PartialAction {
    pub action_type: ActionType,
    pub target: Target,
    /// `None` when the clause had no usable topic (or only an adjective)
    pub topic: Option<String>,
    pub count: Option<u32>,
    pub time_expression: Option<String>,
    pub confirm: bool,
    pub all: bool,
    /// Heuristic certainty for this clause in [0, 1]
    pub confidence: f32,
    /// The verb was carried over from the previous clause
    pub inherited_verb: bool,
}

impl PartialAction {
    pub fn new(action_type: ActionType, target: Target) -> Self {
        Self {
            action_type,
            target,
            topic: None,
            count: None,
            time_expression: None,
            confirm: false,
            all: false,
            confidence: 1.0,
            inherited_verb: false,
        }
    }

    pub fn with_topic(mut self, topic: &str) -> Self {
        self.topic = Some(topic.to_string());
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.count = Some(count);
        self
    }
}

/// Lifecycle of one action inside an execution batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionStatus {
    Pending,
    Executing,
    Succeeded,
    Failed,
    AwaitingConfirmation,
}

impl ActionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ActionStatus::Succeeded | ActionStatus::Failed | ActionStatus::AwaitingConfirmation
        )
    }

    pub fn icon(&self) -> &'static str {
        match self {
            ActionStatus::Pending => "⏳",
            ActionStatus::Executing => "🔄",
            ActionStatus::Succeeded => "✅",
            ActionStatus::Failed => "❌",
            ActionStatus::AwaitingConfirmation => "⚠️",
        }
    }

    fn as_str(&self) -> &str {
        match self {
            ActionStatus::Pending => " Pending",
            ActionStatus::Executing => " Executing",
            ActionStatus::Succeeded => " Succeeded",
            ActionStatus::Failed => " Failed",
            ActionStatus::AwaitingConfirmation => " Awaiting confirmation",
        }
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.icon(), self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(action_type: ActionType, target: Target, topic: &str) -> Action {
        Action {
            action_type,
            target,
            data: ActionData {
                topic: topic.to_string(),
                count: None,
                time_expression: None,
                confirm: None,
                all: false,
            },
            priority: 0,
        }
    }

    #[test]
    fn test_lenient_action_type_parsing() {
        assert_eq!("Generate".parse::<ActionType>(), Ok(ActionType::Create));
        assert_eq!("reschedule".parse::<ActionType>(), Ok(ActionType::Update));
        assert_eq!("show".parse::<ActionType>(), Ok(ActionType::Read));
        assert!("dance".parse::<ActionType>().is_err());
    }

    #[test]
    fn test_lenient_target_parsing() {
        assert_eq!(parse_target("Flashcard"), Some(ItemKind::Flashcards));
        assert_eq!(parse_target("exam"), Some(ItemKind::Schedule));
        assert_eq!(parse_target("notes"), Some(ItemKind::Notes));
        assert_eq!(parse_target("spaceship"), None);
    }

    #[test]
    fn test_restate_create_with_count() {
        let mut a = action(ActionType::Create, ItemKind::Flashcards, "ninja");
        a.data.count = Some(5);
        assert_eq!(a.restate(), "create 5 flashcards about ninja");
    }

    #[test]
    fn test_restate_mass_delete_keeps_confirmation() {
        let mut a = action(ActionType::Delete, ItemKind::Flashcards, ALL_TOPIC);
        a.data.all = true;
        assert_eq!(a.restate(), "delete all flashcards");
        a.data.confirm = Some(true);
        assert_eq!(a.restate(), "delete all flashcards confirm");
    }

    #[test]
    fn test_restate_schedule() {
        let mut a = action(ActionType::Create, ItemKind::Schedule, "physics review");
        a.data.time_expression = Some("friday 6pm".to_string());
        assert_eq!(a.restate(), "schedule physics review friday 6pm");
    }

    #[test]
    fn test_action_serializes_type_field() {
        let a = action(ActionType::Read, ItemKind::Notes, "cells");
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["type"], "read");
        assert_eq!(json["target"], "notes");
        assert_eq!(json["data"]["topic"], "cells");
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ActionStatus::Pending.is_terminal());
        assert!(!ActionStatus::Executing.is_terminal());
        assert!(ActionStatus::AwaitingConfirmation.is_terminal());
        assert!(ActionStatus::Failed.to_string().contains("Failed"));
    }
}
