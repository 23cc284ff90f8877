use crate::understanding::action::{parse_target, ActionType, PartialAction, ALL_TOPIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Confidence given to an action the LLM produced
pub const LLM_ACTION_CONFIDENCE: f32 = 0.85;

/// One action as the LLM is asked to emit it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmAction {
    #[serde(alias = "type")]
    pub action: String,
    pub target: String,
    /// Models emit both `5` and `"5"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(
        default,
        rename = "timeString",
        alias = "time_string",
        alias = "time",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_string: Option<String>,
}

impl LlmAction {
    /// Lenient conversion; `None` when the action or target is unrecognised.
    /// `confirm` is never taken from model output.
    pub fn into_partial(self) -> Option<PartialAction> {
        let action_type: ActionType = self.action.parse().ok()?;
        let target = parse_target(&self.target)?;

        let topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let all = topic
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(ALL_TOPIC));

        Some(PartialAction {
            action_type,
            target,
            topic: if all { None } else { topic },
            count: self.count.as_ref().and_then(parse_count),
            time_expression: self
                .time_string
                .map(|t| t.trim().to_lowercase())
                .filter(|t| !t.is_empty()),
            confirm: false,
            all,
            confidence: LLM_ACTION_CONFIDENCE,
            inherited_verb: false,
        })
    }
}

fn parse_count(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// Helper to create JSON prompts for LLM
pub fn create_json_prompt(instruction: &str) -> String {
    format!(
        "{}\n\n\
        IMPORTANT: Respond with a compact JSON array only, following this schema:\n\
        [\n\
          {{\n\
            \"action\": \"create | delete | update | read\",\n\
            \"target\": \"notes | flashcards | schedule\",\n\
            \"count\": 5,\n\
            \"topic\": \"subject of the action\",\n\
            \"timeString\": \"friday 6pm\"\n\
          }}\n\
        ]\n\n\
        Omit count, topic and timeString when the message does not give them.\n\
        Example: {}\n\n\
        Do not include any text before or after the JSON.",
        instruction,
        examples::COMPOUND_REQUEST
    )
}

/// Schema examples for common requests
pub mod examples {
    pub const COMPOUND_REQUEST: &str = r#""schedule physics review friday 6pm and create 5 flashcards about it" -> [{"action":"create","target":"schedule","topic":"physics review","timeString":"friday 6pm"},{"action":"create","target":"flashcards","count":5,"topic":"physics review"}]"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ItemKind;

    #[test]
    fn test_llm_action_accepts_aliases() {
        let action: LlmAction = serde_json::from_str(
            r#"{"type":"generate","target":"flashcard","count":"3","topic":" cells ","time":"Friday"}"#,
        )
        .unwrap();
        let partial = action.into_partial().unwrap();
        assert_eq!(partial.action_type, ActionType::Create);
        assert_eq!(partial.target, ItemKind::Flashcards);
        assert_eq!(partial.count, Some(3));
        assert_eq!(partial.topic.as_deref(), Some("cells"));
        assert_eq!(partial.time_expression.as_deref(), Some("friday"));
    }

    #[test]
    fn test_all_topic_becomes_mass_action() {
        let action: LlmAction = serde_json::from_str(
            r#"{"action":"delete","target":"flashcards","topic":"all","confirm":true}"#,
        )
        .unwrap();
        let partial = action.into_partial().unwrap();
        assert!(partial.all);
        assert!(!partial.confirm);
        assert_eq!(partial.topic, None);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let action: LlmAction =
            serde_json::from_str(r#"{"action":"create","target":"podcast"}"#).unwrap();
        assert!(action.into_partial().is_none());
    }

    #[test]
    fn test_json_prompt_embeds_instruction_and_example() {
        let prompt = create_json_prompt("Parse this.");
        assert!(prompt.starts_with("Parse this."));
        assert!(prompt.contains("timeString"));
        assert!(prompt.contains("physics review"));
    }
}
