//! Compound command splitting.
//!
//! "then" always starts a new clause. "and" and commas only do so when the
//! piece that follows looks like a command of its own (an action verb or a
//! target noun); otherwise they are part of a topic phrase and are kept.
//!
//! Known failure modes: a topic that itself names a target noun ("notes about
//! the exam and the test") is split in two, and a "then" used as an adverb
//! inside a topic ends the clause early.

use crate::understanding::classifier::{has_action_verb, has_target_noun};
use once_cell::sync::Lazy;
use regex::Regex;

static HARD_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*,?\s*\b(?:and\s+then|then)\b\s*|\s*;\s*").expect("valid separator regex")
});

static SOFT_SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*,\s*(?:and\b\s*)?|\s+and\s+").expect("valid separator regex")
});

/// Break a message into ordered clauses. A single-clause message yields one
/// element; blank input yields none.
pub fn split(text: &str) -> Vec<String> {
    HARD_SEPARATOR_RE
        .split(text)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .flat_map(split_soft)
        .collect()
}

fn split_soft(segment: &str) -> Vec<String> {
    // (separator in front of the piece, piece)
    let mut pieces: Vec<(&str, &str)> = Vec::new();
    let mut separator = "";
    let mut last = 0;
    for m in SOFT_SEPARATOR_RE.find_iter(segment) {
        pieces.push((separator, &segment[last..m.start()]));
        separator = m.as_str();
        last = m.end();
    }
    pieces.push((separator, &segment[last..]));

    let mut clauses = Vec::new();
    let mut current = String::new();
    for (separator, piece) in pieces {
        if current.trim().is_empty() {
            current = piece.to_string();
        } else if starts_clause(piece) {
            clauses.push(tidy(&current));
            current = piece.to_string();
        } else {
            current.push_str(separator);
            current.push_str(piece);
        }
    }
    if !tidy(&current).is_empty() {
        clauses.push(tidy(&current));
    }
    clauses
}

fn starts_clause(piece: &str) -> bool {
    !piece.trim().is_empty() && (has_action_verb(piece) || has_target_noun(piece))
}

fn tidy(clause: &str) -> String {
    clause.trim().trim_end_matches(',').trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_clause() {
        assert_eq!(split("make 5 flashcards about cells"), vec!["make 5 flashcards about cells"]);
        assert!(split("   ").is_empty());
    }

    #[test]
    fn test_then_always_splits() {
        assert_eq!(
            split("make 5 flashcards for ninja then 2 flashcard for daredevil"),
            vec!["make 5 flashcards for ninja", "2 flashcard for daredevil"]
        );
        assert_eq!(
            split("delete my notes, and then create notes about rome"),
            vec!["delete my notes", "create notes about rome"]
        );
    }

    #[test]
    fn test_and_inside_topic_is_kept() {
        assert_eq!(split("notes on cats and dogs"), vec!["notes on cats and dogs"]);
        assert_eq!(
            split("create notes about salt, pepper and vinegar"),
            vec!["create notes about salt, pepper and vinegar"]
        );
    }

    #[test]
    fn test_and_before_new_command_splits() {
        assert_eq!(
            split("make notes and make flashcards"),
            vec!["make notes", "make flashcards"]
        );
        assert_eq!(
            split("generate 5 flashcards about chemistry and detailed notes"),
            vec!["generate 5 flashcards about chemistry", "detailed notes"]
        );
    }

    #[test]
    fn test_comma_before_verb_splits() {
        assert_eq!(
            split("show my notes, delete all flashcards"),
            vec!["show my notes", "delete all flashcards"]
        );
    }

    #[test]
    fn test_three_way_compound_keeps_order() {
        let clauses = split(
            "make 5 flashcards for ninja then 2 flashcard for daredevil and 3 flashcard for hospital",
        );
        assert_eq!(
            clauses,
            vec![
                "make 5 flashcards for ninja",
                "2 flashcard for daredevil",
                "3 flashcard for hospital"
            ]
        );
    }
}
