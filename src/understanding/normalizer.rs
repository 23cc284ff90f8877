//! Typo normalization ahead of pattern matching.
//!
//! Pure and deterministic. Only whole words (or whole known phrases) are ever
//! rewritten; anything unrecognised passes through untouched.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    pub original: String,
    pub corrected: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub original: String,
    pub corrected_text: String,
    pub corrections: Vec<Correction>,
}

impl Normalized {
    pub fn changed(&self) -> bool {
        !self.corrections.is_empty()
    }
}

static PHRASE_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\bblock\s*c(?:hai|ai|ha)n\b", "blockchain"),
        (r"(?i)\bflash\s+cards\b", "flashcards"),
        (r"(?i)\bflash\s+card\b", "flashcard"),
        (r"(?i)\bto\s+morrow\b", "tomorrow"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid phrase regex"), replacement))
    .collect()
});

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

/// Known misspellings, keyed by the lowercase form with letter runs capped at two
const MISSPELLINGS: &[(&str, &str)] = &[
    ("flashh", "flashcard"),
    ("flashhs", "flashcards"),
    ("flashcrd", "flashcard"),
    ("flashcrds", "flashcards"),
    ("flshcard", "flashcard"),
    ("flshcards", "flashcards"),
    ("falshcard", "flashcard"),
    ("falshcards", "flashcards"),
    ("flascard", "flashcard"),
    ("flascards", "flashcards"),
    ("flashcad", "flashcard"),
    ("flashcads", "flashcards"),
    ("crete", "create"),
    ("creat", "create"),
    ("craete", "create"),
    ("cretae", "create"),
    ("creaet", "create"),
    ("genrate", "generate"),
    ("generte", "generate"),
    ("genarate", "generate"),
    ("gnerate", "generate"),
    ("delte", "delete"),
    ("delet", "delete"),
    ("dlete", "delete"),
    ("deleet", "delete"),
    ("detele", "delete"),
    ("remvoe", "remove"),
    ("rmove", "remove"),
    ("ntoes", "notes"),
    ("noets", "notes"),
    ("nots", "notes"),
    ("ntoe", "note"),
    ("shedule", "schedule"),
    ("schedual", "schedule"),
    ("scedule", "schedule"),
    ("schdule", "schedule"),
    ("fpor", "for"),
    ("forr", "for"),
    ("abot", "about"),
    ("abut", "about"),
    ("abuot", "about"),
    ("aobut", "about"),
    ("baout", "about"),
    ("tommorow", "tomorrow"),
    ("tomorow", "tomorrow"),
    ("tommorrow", "tomorrow"),
    ("tmrw", "tomorrow"),
    ("blockcain", "blockchain"),
    ("blokchain", "blockchain"),
];

/// Words a fully de-duplicated token may collapse to ("notesss" -> "notes")
const VOCABULARY: &[&str] = &[
    "note", "notes", "card", "cards", "flashcard", "flashcards", "create", "make", "generate",
    "delete", "remove", "show", "schedule", "about", "for", "all", "confirm", "tomorrow",
];

/// Canonical terms matched by edit distance when no table entry applies
const FUZZY_TERMS: &[&str] = &["flashcard", "flashcards", "schedule", "blockchain"];

/// Real words close to a fuzzy term that must stay as they are
const FUZZY_EXCEPTIONS: &[&str] = &["schedules", "scheduled", "scheduler", "scheduling"];

/// Correct typos in `text`
pub fn normalize(text: &str) -> Normalized {
    let mut corrections = Vec::new();
    let mut corrected = text.to_string();

    for (re, replacement) in PHRASE_RULES.iter() {
        corrected = re
            .replace_all(&corrected, |caps: &Captures| {
                let original = caps[0].to_string();
                if original.to_lowercase() != *replacement {
                    corrections.push(Correction {
                        original,
                        corrected: replacement.to_string(),
                    });
                }
                replacement.to_string()
            })
            .into_owned();
    }

    let corrected = WORD_RE
        .replace_all(&corrected, |caps: &Captures| {
            let token = &caps[0];
            match correct_word(token) {
                Some(fixed) => {
                    corrections.push(Correction {
                        original: token.to_string(),
                        corrected: fixed.clone(),
                    });
                    fixed
                }
                None => token.to_string(),
            }
        })
        .into_owned();

    Normalized {
        original: text.to_string(),
        corrected_text: corrected,
        corrections,
    }
}

/// Canonical replacement for one word, or `None` to leave it alone
fn correct_word(token: &str) -> Option<String> {
    let lower = token.to_lowercase();
    let capped = collapse_runs(&lower, 2);

    if let Some(fixed) = lookup_misspelling(&capped) {
        return (fixed != lower).then(|| fixed.to_string());
    }

    if capped != lower {
        let single = collapse_runs(&lower, 1);
        if VOCABULARY.contains(&single.as_str()) {
            return Some(single);
        }
        if VOCABULARY.contains(&capped.as_str()) {
            return Some(capped);
        }
    }

    fuzzy_match(&capped)
        .filter(|term| *term != lower)
        .map(str::to_string)
}

fn lookup_misspelling(key: &str) -> Option<&'static str> {
    MISSPELLINGS
        .iter()
        .find(|(typo, _)| *typo == key)
        .map(|(_, fixed)| *fixed)
}

/// Cap every run of identical characters at `max_run`
fn collapse_runs(word: &str, max_run: usize) -> String {
    let mut out = String::with_capacity(word.len());
    let mut last: Option<char> = None;
    let mut run = 0;
    for c in word.chars() {
        if Some(c) == last {
            run += 1;
        } else {
            last = Some(c);
            run = 1;
        }
        if run <= max_run {
            out.push(c);
        }
    }
    out
}

fn fuzzy_match(word: &str) -> Option<&'static str> {
    if word.len() < 6 || FUZZY_EXCEPTIONS.contains(&word) {
        return None;
    }
    let prefix: String = word.chars().take(2).collect();

    FUZZY_TERMS
        .iter()
        .filter(|term| term.starts_with(&prefix))
        .filter(|term| term.len().abs_diff(word.len()) <= 2)
        .map(|term| (*term, edit_distance(word, term)))
        .filter(|(term, distance)| *distance <= max_distance(term))
        .min_by_key(|(_, distance)| *distance)
        .map(|(term, _)| term)
}

fn max_distance(term: &str) -> usize {
    if term.len() >= 8 {
        2
    } else {
        1
    }
}

/// Optimal string alignment distance (Levenshtein plus adjacent transpositions)
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut d = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in d.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        d[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[i - 1][j] + 1)
                .min(d[i][j - 1] + 1)
                .min(d[i - 1][j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[i - 2][j - 2] + 1);
            }
            d[i][j] = best;
        }
    }

    d[a.len()][b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_letters_become_flashcard() {
        for typo in ["flashhh", "flashhhh", "flashhhhhhhh"] {
            let n = normalize(&format!("make 3 {} about cells", typo));
            assert_eq!(n.corrected_text, "make 3 flashcard about cells", "{}", typo);
        }
    }

    #[test]
    fn test_block_cain_phrase() {
        let n = normalize("notes on block cain please");
        assert_eq!(n.corrected_text, "notes on blockchain please");
        assert_eq!(n.corrections[0].original, "block cain");
    }

    #[test]
    fn test_flashcard_typos_from_chat() {
        let n = normalize("then 2 flashcaed for daredevil and 3 flasghcard fpor hospital");
        assert_eq!(
            n.corrected_text,
            "then 2 flashcard for daredevil and 3 flashcard for hospital"
        );
        assert_eq!(n.corrections.len(), 3);
    }

    #[test]
    fn test_verb_typos() {
        assert_eq!(normalize("crete notes").corrected_text, "create notes");
        assert_eq!(normalize("delte all cards").corrected_text, "delete all cards");
        assert_eq!(normalize("makeeee notesss").corrected_text, "make notes");
    }

    #[test]
    fn test_unknown_words_pass_through() {
        let text = "Create notes about Mitochondria and the Krebs cycle";
        let n = normalize(text);
        assert_eq!(n.corrected_text, text);
        assert!(!n.changed());
    }

    #[test]
    fn test_only_whole_words_are_rewritten() {
        // "nots" is a table key but must not fire inside "knots"
        let n = normalize("notes about sailing knots");
        assert_eq!(n.corrected_text, "notes about sailing knots");
    }

    #[test]
    fn test_close_real_words_are_kept() {
        assert_eq!(normalize("scheduled").corrected_text, "scheduled");
        assert_eq!(normalize("notes on graph nodes").corrected_text, "notes on graph nodes");
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("flashcaed", "flashcard"), 1);
        assert_eq!(edit_distance("flasghcard", "flashcard"), 1);
        assert_eq!(edit_distance("shcedule", "schedule"), 1);
        assert_eq!(edit_distance("", "abc"), 3);
    }

    #[test]
    fn test_collapse_runs() {
        assert_eq!(collapse_runs("flashhhh", 2), "flashh");
        assert_eq!(collapse_runs("flashhhh", 1), "flash");
        assert_eq!(collapse_runs("book", 2), "book");
    }
}
