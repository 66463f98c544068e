//! Full-text flattening and tokenization
//!
//! Flattening turns a full-text field into plain text lines:
//!
//! - a string contributes itself
//! - a number or boolean contributes its text form
//! - an array contributes each string element, and for each object element
//!   every string property whose name does not start with `$`
//! - an object is read like a single array element
//! - null or a missing field contributes nothing
//!
//! Tokenization splits a line into lowercase alphanumeric words.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix of metadata properties skipped while flattening
pub const METADATA_MARKER: char = '$';

/// A text line split into search tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedLine {
    pub tokens: Vec<String>,
}

impl TokenizedLine {
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Flattens one full-text field of a document into text lines
pub fn flatten_field(value: Option<&Value>, lines: &mut Vec<String>) {
    match value {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) => lines.push(s.clone()),
        Some(Value::Number(n)) => lines.push(n.to_string()),
        Some(Value::Bool(b)) => lines.push(b.to_string()),
        Some(Value::Array(items)) => {
            for item in items {
                match item {
                    Value::String(s) => lines.push(s.clone()),
                    Value::Object(map) => flatten_object(map, lines),
                    _ => {}
                }
            }
        }
        Some(Value::Object(map)) => flatten_object(map, lines),
    }
}

fn flatten_object(map: &Map<String, Value>, lines: &mut Vec<String>) {
    for (name, value) in map {
        if name.starts_with(METADATA_MARKER) {
            continue;
        }
        if let Value::String(s) = value {
            lines.push(s.clone());
        }
    }
}

/// Splits a line into lowercase alphanumeric tokens
pub fn tokenize_line(line: &str) -> TokenizedLine {
    let tokens = line
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(|word| word.to_lowercase())
        .collect();
    TokenizedLine { tokens }
}

/// Tokenizes every line, dropping lines without tokens
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<TokenizedLine> {
    lines
        .iter()
        .map(|line| tokenize_line(line.as_ref()))
        .filter(|line| !line.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flatten(value: Value) -> Vec<String> {
        let mut lines = Vec::new();
        flatten_field(Some(&value), &mut lines);
        lines
    }

    #[test]
    fn test_string_leaf() {
        assert_eq!(flatten(json!("some comment")), vec!["some comment"]);
    }

    #[test]
    fn test_array_of_strings() {
        assert_eq!(flatten(json!(["a", "b"])), vec!["a", "b"]);
    }

    #[test]
    fn test_nested_objects_skip_metadata() {
        let lines = flatten(json!(["plain", { "$meta": "x", "text": "hello", "n": 3 }]));
        assert_eq!(lines, vec!["plain", "hello"]);
    }

    #[test]
    fn test_null_and_missing_contribute_nothing() {
        let mut lines = Vec::new();
        flatten_field(None, &mut lines);
        flatten_field(Some(&Value::Null), &mut lines);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_tokenize_line() {
        let line = tokenize_line("Rue de la Paix, 75002 PARIS");
        assert_eq!(line.tokens, vec!["rue", "de", "la", "paix", "75002", "paris"]);
    }

    #[test]
    fn test_tokenize_lines_drops_empty() {
        let lines = tokenize_lines(&["hello world", " -- ", "bye"]);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].tokens, vec!["bye"]);
    }
}
