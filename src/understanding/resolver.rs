//! Topic and pronoun inheritance across the clauses of one message.
//!
//! A left-to-right fold carrying the last concrete topic. A topic is concrete
//! when it is not empty, not a pronoun and not made only of adjectives, so
//! "detailed" or "it" can never be inherited by a later clause.

use crate::understanding::action::{Action, ActionData, ActionType, PartialAction, ALL_TOPIC, DEFAULT_TOPIC};
use crate::understanding::classifier::is_vague_topic;

/// Confidence ceiling for an action that fell back to the placeholder topic
const DEFAULTED_CONFIDENCE: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub actions: Vec<Action>,
    /// Lowest clause confidence, lowered further when a topic was defaulted
    pub confidence: f32,
    /// Number of actions that ended up with the placeholder topic
    pub defaulted: usize,
}

struct Accumulator {
    last_concrete_topic: Option<String>,
    resolution: Resolution,
}

pub fn resolve(partials: &[PartialAction]) -> Resolution {
    resolve_with_seed(partials, None)
}

/// Like [`resolve`], but starting from a topic carried in from earlier turns
pub fn resolve_with_seed(partials: &[PartialAction], seed: Option<&str>) -> Resolution {
    let initial = Accumulator {
        last_concrete_topic: seed
            .filter(|topic| !is_vague_topic(topic))
            .map(str::to_string),
        resolution: Resolution {
            actions: Vec::with_capacity(partials.len()),
            confidence: 1.0,
            defaulted: 0,
        },
    };

    let finished = partials
        .iter()
        .enumerate()
        .fold(initial, |mut acc, (priority, partial)| {
            let mut confidence = partial.confidence;
            let mut all = partial.all;

            let topic = if all {
                ALL_TOPIC.to_string()
            } else {
                match partial.topic.as_deref() {
                    Some(topic) if !is_vague_topic(topic) => {
                        acc.last_concrete_topic = Some(topic.to_string());
                        topic.to_string()
                    }
                    _ => match &acc.last_concrete_topic {
                        Some(previous) => previous.clone(),
                        None if partial.action_type == ActionType::Read => {
                            all = true;
                            ALL_TOPIC.to_string()
                        }
                        None => {
                            confidence = confidence.min(DEFAULTED_CONFIDENCE);
                            acc.resolution.defaulted += 1;
                            DEFAULT_TOPIC.to_string()
                        }
                    },
                }
            };

            acc.resolution.confidence = acc.resolution.confidence.min(confidence);
            acc.resolution.actions.push(Action {
                action_type: partial.action_type,
                target: partial.target,
                data: ActionData {
                    topic,
                    count: partial.count,
                    time_expression: partial.time_expression.clone(),
                    confirm: partial.confirm.then_some(true),
                    all,
                },
                priority,
            });
            acc
        });

    let mut resolution = finished.resolution;
    if resolution.actions.is_empty() {
        resolution.confidence = 0.0;
    }
    resolution
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ItemKind;

    fn create(target: ItemKind) -> PartialAction {
        PartialAction::new(ActionType::Create, target)
    }

    #[test]
    fn test_pronoun_inherits_previous_topic() {
        let partials = vec![
            create(ItemKind::Schedule).with_topic("physics review"),
            create(ItemKind::Flashcards).with_topic("it").with_count(5),
        ];
        let resolved = resolve(&partials);
        assert_eq!(resolved.actions[1].data.topic, "physics review");
        assert_eq!(resolved.actions[1].data.count, Some(5));
        assert_eq!(resolved.defaulted, 0);
    }

    #[test]
    fn test_missing_topic_inherits() {
        let partials = vec![
            create(ItemKind::Flashcards).with_topic("chemistry"),
            create(ItemKind::Notes),
        ];
        let resolved = resolve(&partials);
        assert_eq!(resolved.actions[1].data.topic, "chemistry");
    }

    #[test]
    fn test_adjective_never_becomes_a_topic() {
        let partials = vec![
            create(ItemKind::Notes).with_topic("detailed"),
            create(ItemKind::Flashcards).with_topic("cells"),
            create(ItemKind::Notes).with_topic("comprehensive"),
        ];
        let resolved = resolve(&partials);
        assert_eq!(resolved.actions[0].data.topic, DEFAULT_TOPIC);
        assert_eq!(resolved.actions[2].data.topic, "cells");
        assert_eq!(resolved.defaulted, 1);
        assert!(resolved.confidence <= DEFAULTED_CONFIDENCE);
    }

    #[test]
    fn test_latest_concrete_topic_wins() {
        let partials = vec![
            create(ItemKind::Notes).with_topic("rome"),
            create(ItemKind::Notes).with_topic("greece"),
            create(ItemKind::Flashcards).with_topic("that"),
        ];
        assert_eq!(resolve(&partials).actions[2].data.topic, "greece");
    }

    #[test]
    fn test_mass_actions_do_not_feed_inheritance() {
        let mut wipe = PartialAction::new(ActionType::Delete, ItemKind::Flashcards);
        wipe.all = true;
        let partials = vec![wipe, create(ItemKind::Flashcards).with_topic("it")];
        let resolved = resolve(&partials);
        assert_eq!(resolved.actions[0].data.topic, ALL_TOPIC);
        assert_eq!(resolved.actions[1].data.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_read_without_topic_lists_everything() {
        let partials = vec![PartialAction::new(ActionType::Read, ItemKind::Notes)];
        let resolved = resolve(&partials);
        assert!(resolved.actions[0].data.all);
        assert_eq!(resolved.defaulted, 0);
    }

    #[test]
    fn test_seed_from_previous_turn() {
        let partials = vec![create(ItemKind::Flashcards).with_topic("it")];
        let resolved = resolve_with_seed(&partials, Some("mitochondria"));
        assert_eq!(resolved.actions[0].data.topic, "mitochondria");
        let ignored = resolve_with_seed(&partials, Some("that"));
        assert_eq!(ignored.actions[0].data.topic, DEFAULT_TOPIC);
    }

    #[test]
    fn test_priority_is_sequence_position() {
        let partials = vec![
            create(ItemKind::Notes).with_topic("a1"),
            create(ItemKind::Notes).with_topic("b2"),
        ];
        let priorities: Vec<usize> = resolve(&partials).actions.iter().map(|a| a.priority).collect();
        assert_eq!(priorities, vec![0, 1]);
    }
}
