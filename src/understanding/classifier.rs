//! Rule-based intent classification of a single clause.
//!
//! Verbs and target nouns are small declarative rule tables evaluated in
//! priority order; the earliest match in the clause wins and ties go to the
//! rule listed first. Whatever the verb, target, count, time and filler words
//! leave behind is the topic.

use crate::storage::ItemKind;
use crate::understanding::action::{ActionType, PartialAction, Target};
use crate::understanding::time_expr::{find_time_expression, TIME_EXPRESSION_RE};
use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

/// Modifiers that describe the material rather than name a subject
pub const ADJECTIVES: &[&str] = &[
    "detailed",
    "comprehensive",
    "quick",
    "advanced",
    "brief",
    "short",
    "long",
    "basic",
    "simple",
    "summary",
    "practice",
    "study",
    "review",
];

/// Words that point back at an earlier topic
pub const PRONOUNS: &[&str] = &[
    "it", "that", "this", "them", "those", "these", "they", "same", "topic", "one", "ones",
];

/// Connective and politeness words trimmed from the edges of a topic
const FILLER: &[&str] = &[
    "about", "on", "for", "regarding", "re", "of", "covering", "over", "into", "from", "with",
    "in", "to", "at", "by", "the", "a", "an", "some", "any", "my", "me", "our", "your", "please",
    "pls", "can", "could", "would", "will", "you", "i", "we", "us", "lets", "let's", "new", "more",
    "also", "then", "and", "set", "up", "now", "just", "few", "couple", "called", "titled",
    "topic", "subject",
];

const NUMBER_WORDS: &[(&str, u32)] = &[
    ("one", 1),
    ("two", 2),
    ("three", 3),
    ("four", 4),
    ("five", 5),
    ("six", 6),
    ("seven", 7),
    ("eight", 8),
    ("nine", 9),
    ("ten", 10),
    ("eleven", 11),
    ("twelve", 12),
    ("fifteen", 15),
    ("twenty", 20),
];

/// One verb rule: which action it signals and, optionally, the target it implies
pub struct IntentRule {
    pub name: &'static str,
    pub action: ActionType,
    pub default_target: Option<Target>,
    pub pattern: Regex,
}

/// One target-noun rule. `keep_in_topic` nouns ("exam", "class") stay part of
/// the topic because they name the event itself.
pub struct TargetRule {
    pub target: Target,
    pub keep_in_topic: bool,
    pub pattern: Regex,
}

pub static INTENT_RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    let rule = |name, action, default_target, pattern: &str| IntentRule {
        name,
        action,
        default_target,
        pattern: Regex::new(pattern).expect("valid intent regex"),
    };
    vec![
        rule(
            "delete",
            ActionType::Delete,
            None,
            r"\b(?:delete|remove|erase|wipe|clear|get\s+rid\s+of|drop)\b",
        ),
        rule(
            "reschedule",
            ActionType::Update,
            Some(ItemKind::Schedule),
            r"\b(?:reschedule|postpone|move)\b",
        ),
        rule(
            "update",
            ActionType::Update,
            None,
            r"\b(?:update|change|edit|modify|rewrite)\b",
        ),
        rule(
            "read",
            ActionType::Read,
            None,
            r"\b(?:show|list|find|search|display|view|open|see|what\s+are)\b",
        ),
        rule(
            "schedule",
            ActionType::Create,
            Some(ItemKind::Schedule),
            r"\b(?:schedule|book|remind\s+me|plan)\b",
        ),
        rule(
            "create",
            ActionType::Create,
            None,
            r"\b(?:create|make|generate|add|write|build|prepare|produce|give\s+me)\b",
        ),
    ]
});

pub static TARGET_RULES: Lazy<Vec<TargetRule>> = Lazy::new(|| {
    let rule = |target, keep_in_topic, pattern: &str| TargetRule {
        target,
        keep_in_topic,
        pattern: Regex::new(pattern).expect("valid target regex"),
    };
    vec![
        rule(
            ItemKind::Flashcards,
            false,
            r"\b(?:fla[a-z]*cards?|cards?|quiz(?:zes)?|deck)\b",
        ),
        rule(ItemKind::Notes, false, r"\bnotes?\b"),
        rule(
            ItemKind::Schedule,
            false,
            r"\b(?:schedules?|calendar|events?|reminders?|timetable|plan)\b",
        ),
        rule(
            ItemKind::Schedule,
            true,
            r"\b(?:class(?:es)?|exams?|tests?|lectures?|sessions?|meetings?|appointments?)\b",
        ),
    ]
});

static CONFIRM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:confirm(?:ed)?|i'?m\s+sure)\b").expect("valid confirm regex"));

static ALL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:all|every|everything|entire)\b").expect("valid all regex"));

/// Classify a clause that carries its own verb. `None` means "defer to the LLM".
pub fn classify(clause: &str) -> Option<PartialAction> {
    classify_clause(clause, None)
}

/// Classify a verbless clause ("detailed notes") using the previous clause's verb
pub fn classify_with_inherited_verb(clause: &str, verb: ActionType) -> Option<PartialAction> {
    classify_clause(clause, Some(verb))
}

pub fn has_action_verb(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTENT_RULES.iter().any(|rule| rule.pattern.is_match(&lower))
}

pub fn has_target_noun(text: &str) -> bool {
    let lower = text.to_lowercase();
    TARGET_RULES.iter().any(|rule| rule.pattern.is_match(&lower))
}

/// Whether the user's own text carries the mass-delete sentinel ("confirm")
pub fn mentions_confirmation(text: &str) -> bool {
    CONFIRM_RE.is_match(&text.to_lowercase())
}

/// True for an empty topic or one made only of adjectives and pronouns
pub fn is_vague_topic(topic: &str) -> bool {
    let words = topic_words(topic);
    words.is_empty()
        || words
            .iter()
            .all(|w| ADJECTIVES.contains(w) || PRONOUNS.contains(w) || FILLER.contains(w))
}

fn classify_clause(clause: &str, inherited: Option<ActionType>) -> Option<PartialAction> {
    let mut text = clause.to_lowercase();

    let time_expression = find_time_expression(&text);
    blank_matches(&mut text, &TIME_EXPRESSION_RE);

    let confirm = CONFIRM_RE.is_match(&text);
    blank_matches(&mut text, &CONFIRM_RE);

    let (action_type, default_target, verb_word) = match find_verb(&text) {
        Some((rule, range)) => {
            let word = text[range.clone()].to_string();
            blank(&mut text, range);
            (rule.action, rule.default_target, Some(word))
        }
        None => (inherited?, None, None),
    };

    let mut all = false;
    if matches!(action_type, ActionType::Delete | ActionType::Read) && ALL_RE.is_match(&text) {
        all = true;
        blank_matches(&mut text, &ALL_RE);
    }

    let target_match = find_target(&text);
    let target = target_match
        .as_ref()
        .map(|(rule, _)| rule.target)
        .or(default_target)?;
    let has_noun = target_match.is_some();

    let (count, topic) = match target_match {
        Some((rule, range)) if !rule.keep_in_topic => {
            extract_around_noun(&text[..range.start], &text[range.end..])
        }
        _ => extract_phrase(&text),
    };

    if action_type == ActionType::Delete
        && topic.is_none()
        && verb_word
            .as_deref()
            .is_some_and(|w| w.starts_with("clear") || w.starts_with("wipe"))
    {
        all = true;
    }

    let mut confidence: f32 = if inherited.is_some() && verb_word.is_none() {
        0.7
    } else {
        0.9
    };
    if !has_noun {
        confidence -= 0.05;
    }
    if topic.is_none() && !all {
        confidence -= 0.15;
    }

    Some(PartialAction {
        action_type,
        target,
        topic,
        count,
        time_expression,
        confirm,
        all,
        confidence: confidence.clamp(0.0, 1.0),
        inherited_verb: verb_word.is_none(),
    })
}

/// Earliest verb match; ties go to the rule listed first
fn find_verb(text: &str) -> Option<(&'static IntentRule, Range<usize>)> {
    INTENT_RULES
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| rule.pattern.find(text).map(|m| (m.start(), i, rule, m.range())))
        .min_by_key(|(start, i, _, _)| (*start, *i))
        .map(|(_, _, rule, range)| (rule, range))
}

fn find_target(text: &str) -> Option<(&'static TargetRule, Range<usize>)> {
    TARGET_RULES
        .iter()
        .enumerate()
        .filter_map(|(i, rule)| rule.pattern.find(text).map(|m| (m.start(), i, rule, m.range())))
        .min_by_key(|(start, i, _, _)| (*start, *i))
        .map(|(_, _, rule, range)| (rule, range))
}

/// Topic and count when a target noun splits the clause in two.
///
/// Words after the noun ("notes about cells") name the topic; words before it
/// ("chemistry notes") are used only when nothing follows, and then with
/// adjectives dropped so "detailed notes" yields no topic at all.
fn extract_around_noun(pre: &str, post: &str) -> (Option<u32>, Option<String>) {
    let mut count = None;
    let mut pre_kept = Vec::new();
    for word in topic_words(pre) {
        if count.is_none() {
            if let Some(n) = parse_count(word) {
                count = Some(n);
                continue;
            }
        }
        if !FILLER.contains(&word) && !ADJECTIVES.contains(&word) {
            pre_kept.push(word);
        }
    }

    let mut post_words = topic_words(post);
    if count.is_none() {
        if let Some(n) = post_words.first().and_then(|w| parse_count(w)) {
            count = Some(n);
            post_words.remove(0);
        }
    }
    let post_kept = trim_filler(post_words);

    let topic = if !post_kept.is_empty() {
        join_topic(&post_kept)
    } else {
        join_topic(&pre_kept)
    };
    (count, topic)
}

/// Topic and count when the whole remainder is the topic ("physics review")
fn extract_phrase(text: &str) -> (Option<u32>, Option<String>) {
    let mut words = trim_filler(topic_words(text));
    let mut count = None;
    if let Some(n) = words.first().and_then(|w| parse_count(w)) {
        count = Some(n);
        words.remove(0);
    }
    (count, join_topic(&trim_filler(words)))
}

fn join_topic(words: &[&str]) -> Option<String> {
    if words.is_empty() || words.iter().all(|w| ADJECTIVES.contains(w)) {
        None
    } else {
        Some(words.join(" "))
    }
}

fn topic_words(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '-'))
        .map(|w| w.trim_matches('\''))
        .filter(|w| !w.is_empty())
        .collect()
}

fn trim_filler(mut words: Vec<&str>) -> Vec<&str> {
    while words.first().is_some_and(|w| FILLER.contains(w)) {
        words.remove(0);
    }
    while words.last().is_some_and(|w| FILLER.contains(w)) {
        words.pop();
    }
    words
}

fn parse_count(word: &str) -> Option<u32> {
    if let Ok(n) = word.parse::<u32>() {
        return (1..=100).contains(&n).then_some(n);
    }
    NUMBER_WORDS
        .iter()
        .find(|(name, _)| *name == word)
        .map(|(_, n)| *n)
}

/// Overwrite a byte range with spaces so later offsets stay valid
fn blank(text: &mut String, range: Range<usize>) {
    let spaces = " ".repeat(range.len());
    text.replace_range(range, &spaces);
}

fn blank_matches(text: &mut String, re: &Regex) {
    let ranges: Vec<Range<usize>> = re.find_iter(text).map(|m| m.range()).collect();
    for range in ranges {
        blank(text, range);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_flashcards_with_count_and_topic() {
        let a = classify("make 5 flashcards for ninja").unwrap();
        assert_eq!(a.action_type, ActionType::Create);
        assert_eq!(a.target, ItemKind::Flashcards);
        assert_eq!(a.count, Some(5));
        assert_eq!(a.topic.as_deref(), Some("ninja"));
        assert!(!a.inherited_verb);
    }

    #[test]
    fn test_adjective_is_never_a_topic() {
        for adjective in ADJECTIVES {
            let a = classify(&format!("create {} notes", adjective)).unwrap();
            assert_eq!(a.target, ItemKind::Notes);
            assert_eq!(a.topic, None, "{}", adjective);
        }
    }

    #[test]
    fn test_adjective_before_noun_is_dropped() {
        let a = classify("write detailed notes about the french revolution").unwrap();
        assert_eq!(a.topic.as_deref(), Some("french revolution"));
    }

    #[test]
    fn test_topic_before_noun() {
        let a = classify("make some chemistry notes").unwrap();
        assert_eq!(a.topic.as_deref(), Some("chemistry"));
    }

    #[test]
    fn test_typo_tolerant_target() {
        let a = classify("generate 3 flasghcard about rome").unwrap();
        assert_eq!(a.target, ItemKind::Flashcards);
        assert_eq!(a.topic.as_deref(), Some("rome"));
    }

    #[test]
    fn test_schedule_with_time() {
        let a = classify("schedule physics review Friday 6pm").unwrap();
        assert_eq!(a.action_type, ActionType::Create);
        assert_eq!(a.target, ItemKind::Schedule);
        assert_eq!(a.topic.as_deref(), Some("physics review"));
        assert_eq!(a.time_expression.as_deref(), Some("friday 6pm"));
    }

    #[test]
    fn test_event_nouns_stay_in_topic() {
        let a = classify("reschedule my chemistry exam to monday 3pm").unwrap();
        assert_eq!(a.action_type, ActionType::Update);
        assert_eq!(a.target, ItemKind::Schedule);
        assert_eq!(a.topic.as_deref(), Some("chemistry exam"));
        assert_eq!(a.time_expression.as_deref(), Some("monday 3pm"));
    }

    #[test]
    fn test_pronoun_topic_is_kept_for_the_resolver() {
        let a = classify("create 5 flashcards about it").unwrap();
        assert_eq!(a.topic.as_deref(), Some("it"));
        assert_eq!(a.count, Some(5));
    }

    #[test]
    fn test_mass_delete_and_confirmation() {
        let a = classify("delete all flashcards").unwrap();
        assert_eq!(a.action_type, ActionType::Delete);
        assert!(a.all);
        assert!(!a.confirm);

        let b = classify("delete all flashcards confirm").unwrap();
        assert!(b.all);
        assert!(b.confirm);
        assert_eq!(b.topic, None);

        assert!(mentions_confirmation("wipe every card, I'm sure"));
        assert!(!mentions_confirmation("delete all flashcards"));
    }

    #[test]
    fn test_clear_without_topic_means_all() {
        let a = classify("clear my notes").unwrap();
        assert_eq!(a.action_type, ActionType::Delete);
        assert!(a.all);
    }

    #[test]
    fn test_earliest_verb_wins() {
        let a = classify("make notes on how to remove stains").unwrap();
        assert_eq!(a.action_type, ActionType::Create);
        assert_eq!(a.topic.as_deref(), Some("how to remove stains"));
    }

    #[test]
    fn test_read_request() {
        let a = classify("show my flashcards about chemistry").unwrap();
        assert_eq!(a.action_type, ActionType::Read);
        assert_eq!(a.target, ItemKind::Flashcards);
        assert_eq!(a.topic.as_deref(), Some("chemistry"));
    }

    #[test]
    fn test_verbless_clause_defers() {
        assert!(classify("detailed notes").is_none());
        assert!(classify("hello there").is_none());
        let a = classify_with_inherited_verb("2 flashcard for daredevil", ActionType::Create)
            .unwrap();
        assert!(a.inherited_verb);
        assert_eq!(a.count, Some(2));
        assert_eq!(a.topic.as_deref(), Some("daredevil"));
    }

    #[test]
    fn test_number_words_count() {
        let a = classify("give me ten cards on photosynthesis").unwrap();
        assert_eq!(a.count, Some(10));
        assert_eq!(a.topic.as_deref(), Some("photosynthesis"));
    }

    #[test]
    fn test_vague_topics() {
        assert!(is_vague_topic("it"));
        assert!(is_vague_topic("the same topic"));
        assert!(is_vague_topic("detailed"));
        assert!(is_vague_topic(""));
        assert!(!is_vague_topic("physics review"));
    }
}
