//! Resilient extraction of a JSON action list from raw model output.
//!
//! Strategies run in order until one yields a value:
//! 1. strip code fences and surrounding prose, drop trailing commas, parse
//! 2. parse the raw text as is
//! 3. the first `[...]` array; when it was cut off mid-stream, its complete
//!    leading objects
//! 4. the first balanced `{...}` object, wrapped in a one-element list
//!
//! Nothing here panics or returns an error; `None` means every strategy failed.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([\]}])").expect("valid trailing comma regex"));

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:json|JSON)?").expect("valid code fence regex"));

pub fn extract_json(raw: &str) -> Option<Vec<Value>> {
    let strategies: [(&str, fn(&str) -> Option<Value>); 4] = [
        ("cleaned", parse_cleaned),
        ("raw", parse_raw),
        ("array", parse_first_array),
        ("object", parse_first_object),
    ];

    for (name, strategy) in strategies {
        if let Some(items) = strategy(raw).and_then(into_items) {
            debug!("JSON extracted with '{}' strategy ({} items)", name, items.len());
            return Some(items);
        }
    }
    None
}

fn parse_cleaned(raw: &str) -> Option<Value> {
    let unfenced = CODE_FENCE_RE.replace_all(raw, "");
    let start = unfenced.find(['[', '{'])?;
    let end = unfenced.rfind([']', '}'])?;
    if end < start {
        return None;
    }
    parse_lenient(&unfenced[start..=end])
}

fn parse_raw(raw: &str) -> Option<Value> {
    serde_json::from_str(raw.trim()).ok()
}

fn parse_first_array(raw: &str) -> Option<Value> {
    let start = raw.find('[')?;
    match balanced_end(raw, start) {
        Some(end) => parse_lenient(&raw[start..end]),
        None => {
            let salvaged = complete_objects(&raw[start + 1..]);
            if salvaged.is_empty() {
                None
            } else {
                debug!("Salvaged {} objects from truncated array", salvaged.len());
                Some(Value::Array(salvaged))
            }
        }
    }
}

fn parse_first_object(raw: &str) -> Option<Value> {
    let mut offset = 0;
    while let Some(found) = raw[offset..].find('{') {
        let start = offset + found;
        if let Some(end) = balanced_end(raw, start) {
            if let Some(value) = parse_lenient(&raw[start..end]) {
                return Some(Value::Array(vec![value]));
            }
        }
        offset = start + 1;
    }
    None
}

fn parse_lenient(candidate: &str) -> Option<Value> {
    serde_json::from_str(candidate)
        .ok()
        .or_else(|| serde_json::from_str(&TRAILING_COMMA_RE.replace_all(candidate, "$1")).ok())
}

/// An array is a list of actions; an object may wrap one under "actions" or
/// "tasks", otherwise it is a single action.
fn into_items(value: Value) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => {
            for key in ["actions", "tasks"] {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Some(items);
                }
            }
            Some(vec![Value::Object(map)])
        }
        _ => None,
    }
}

/// Byte offset just past the bracket closing the one at `start`, honouring
/// string literals and escapes. `None` if the input ends first.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(start + i + c.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}

/// Every complete top-level object in the body of an array that may be cut off
fn complete_objects(body: &str) -> Vec<Value> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    let mut object_start = None;

    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => {
                if depth == 0 && c == '{' {
                    object_start = Some(i);
                }
                depth += 1;
            }
            '}' | ']' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                if depth == 0 {
                    if let Some(start) = object_start.take() {
                        if let Ok(value) = serde_json::from_str(&body[start..=i]) {
                            objects.push(value);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_plain_array() {
        let items = extract_json(r#"[{"action":"create","target":"notes","topic":"cells"}]"#).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["topic"], "cells");
    }

    #[test]
    fn test_fenced_with_prose_and_trailing_comma() {
        let raw = "Sure! Here you go:\n```json\n[\n  {\"action\": \"create\", \"target\": \"flashcards\", \"count\": 5,},\n]\n```\nLet me know!";
        let items = extract_json(raw).unwrap();
        assert_eq!(items, vec![json!({"action": "create", "target": "flashcards", "count": 5})]);
    }

    #[test]
    fn test_truncated_array_keeps_leading_objects() {
        let raw = r#"[{"action":"create","target":"notes","topic":"a"},{"action":"delete","target":"notes","topic":"b"},{"action":"create","tar"#;
        let items = extract_json(raw).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["action"], "delete");
    }

    #[test]
    fn test_brackets_inside_strings_are_ignored() {
        let raw = r#"[{"action":"create","target":"notes","topic":"arrays [and] {braces}"},{"act"#;
        let items = extract_json(raw).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["topic"], "arrays [and] {braces}");
    }

    #[test]
    fn test_single_object_is_wrapped() {
        let raw = r#"The action is {"action":"read","target":"notes"} as requested"#;
        let items = extract_json(raw).unwrap();
        assert_eq!(items, vec![json!({"action": "read", "target": "notes"})]);
    }

    #[test]
    fn test_wrapper_object_is_unwrapped() {
        let raw = r#"{"actions":[{"action":"create"},{"action":"delete"}]}"#;
        assert_eq!(extract_json(raw).unwrap().len(), 2);
    }

    #[test]
    fn test_garbage_returns_none() {
        assert!(extract_json("I could not understand that request.").is_none());
        assert!(extract_json("[[[").is_none());
        assert!(extract_json("").is_none());
    }
}
