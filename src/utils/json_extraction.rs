//! JSON extraction utilities for parsing LLM responses.
//!
//! Model replies are free text that usually carries one JSON object
//! somewhere: inside a code fence, after some prose, or sprinkled with raw
//! control characters. [`extract_json_object`] recovers that object by
//! trying a fixed sequence of stages and stops at the first one that yields
//! a JSON object.
//!
//! # Extraction Stages
//!
//! 1. Interior of the first fenced code block (with or without a `json` tag)
//! 2. First balanced `{...}` span, found by brace matching
//! 3. Entire text
//! 4. Recovery: un-escape over-escaped quotes, then a greedy `{.*}` match
//!
//! Stages 1-3 replace ASCII control characters with spaces before parsing.
//! Stage 2 onward is a fallback and is reported through `tracing`.
//!
//! # Example
//!
//! ```
//! use anomaly_forge::utils::json_extraction::extract_json_object;
//!
//! let reply = "Sure!\n```json\n{\"approved\": true, \"feedback\": null}\n```";
//! let object = extract_json_object(reply).unwrap();
//! assert_eq!(object["approved"], serde_json::json!(true));
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

/// Maximum number of characters quoted in error messages and logs.
const PREVIEW_CHARS: usize = 200;

static FENCED_BLOCK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"```(?:json)?\s*([\s\S]*?)```").ok());

static CONTROL_CHARS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"[\x00-\x1F\x7F]").ok());

static GREEDY_OBJECT: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").ok());

/// Error type for JSON extraction failures.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ExtractionError {
    #[error("Malformed response: no parseable JSON object found. Content starts with: '{preview}'")]
    MalformedResponse { preview: String },
}

impl ExtractionError {
    fn malformed(text: &str) -> Self {
        ExtractionError::MalformedResponse {
            preview: preview(text),
        }
    }
}

/// Stage of the extractor that produced an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStage {
    FencedBlock,
    BraceScan,
    WholeText,
    Recovery,
}

impl ExtractionStage {
    /// Short name used in log events.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionStage::FencedBlock => "fenced_block",
            ExtractionStage::BraceScan => "brace_scan",
            ExtractionStage::WholeText => "whole_text",
            ExtractionStage::Recovery => "recovery",
        }
    }
}

impl std::fmt::Display for ExtractionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extracts the JSON object carried by a model reply.
///
/// # Errors
///
/// Returns [`ExtractionError::MalformedResponse`] when no stage yields a
/// JSON object. A parseable non-object (array, number, string) counts as a
/// failed stage.
pub fn extract_json_object(text: &str) -> Result<Map<String, Value>, ExtractionError> {
    extract_json_object_with_stage(text).map(|(object, _)| object)
}

/// Like [`extract_json_object`], also reporting which stage succeeded.
pub fn extract_json_object_with_stage(
    text: &str,
) -> Result<(Map<String, Value>, ExtractionStage), ExtractionError> {
    if let Some(block) = fenced_block(text) {
        match parse_object(&strip_control_chars(block)) {
            Some(object) => return Ok((object, ExtractionStage::FencedBlock)),
            None => tracing::debug!(stage = "fenced_block", "Fenced block did not parse as a JSON object"),
        }
    }

    if let Some(span) = first_balanced_object(text) {
        if let Some(object) = parse_object(&strip_control_chars(span)) {
            tracing::debug!(stage = "brace_scan", "Recovered JSON object by brace matching");
            return Ok((object, ExtractionStage::BraceScan));
        }
    }

    if let Some(object) = parse_object(strip_control_chars(text).trim()) {
        tracing::debug!(stage = "whole_text", "Parsed entire reply as a JSON object");
        return Ok((object, ExtractionStage::WholeText));
    }

    tracing::warn!(
        stage = "recovery",
        preview = %preview(text),
        "Standard JSON extraction failed, attempting recovery pass"
    );

    let cleaned = strip_control_chars(text)
        .replace("\\\"", "\"")
        .replace("\\'", "'");
    if let Some(candidate) = GREEDY_OBJECT
        .as_ref()
        .and_then(|re| re.find(&cleaned))
        .map(|m| m.as_str())
    {
        if let Some(object) = parse_object(candidate) {
            tracing::info!(stage = "recovery", "Recovery pass produced a JSON object");
            return Ok((object, ExtractionStage::Recovery));
        }
    }

    tracing::warn!(preview = %preview(text), "No parseable JSON object in model reply");
    Err(ExtractionError::malformed(text))
}

/// Replaces every ASCII control character (including newlines) with a space.
pub fn strip_control_chars(text: &str) -> String {
    match CONTROL_CHARS.as_ref() {
        Some(re) => re.replace_all(text, " ").into_owned(),
        None => text
            .chars()
            .map(|c| if c.is_ascii_control() { ' ' } else { c })
            .collect(),
    }
}

/// Helper function to find the matching closing brace for a JSON object.
///
/// This function properly handles:
/// - Nested braces
/// - String literals (including escaped quotes)
///
/// # Arguments
///
/// * `s` - A string starting with '{'
///
/// # Returns
///
/// The byte index of the matching closing '}', or None if not found.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

fn fenced_block(text: &str) -> Option<&str> {
    FENCED_BLOCK
        .as_ref()?
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let rest = &text[start..];
    let end = find_matching_brace(rest)?;
    Some(&rest[..=end])
}

fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(object) => Some(object),
        _ => None,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fenced_block_with_language_tag() {
        let text = "Here you go:\n```json\n{\"context\": [\"a\", \"b\"], \"anomaly_index\": 1}\n```\nGood luck!";
        let (object, stage) = extract_json_object_with_stage(text).expect("should extract");
        assert_eq!(stage, ExtractionStage::FencedBlock);
        assert_eq!(object["anomaly_index"], json!(1));
        assert_eq!(object["context"], json!(["a", "b"]));
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let text = "```\n{\"approved\": false, \"feedback\": \"too easy\"}\n```";
        let object = extract_json_object(text).expect("should extract");
        assert_eq!(object["feedback"], json!("too easy"));
    }

    #[test]
    fn test_fenced_block_roundtrip_with_surrounding_prose() {
        let original = json!({
            "sentence": "In the early 2000s, the widespread adoption of _____ began to reshape life.",
            "choices": ["forums", "messaging", "MySpace", "dating apps", "blogs"],
            "anomaly_index": 3,
            "nested": {"deep": [1, 2, {"x": "}{"}]}
        });
        let text = format!(
            "Let me think about this {{carefully}}.\n```json\n{}\n```\nThat's all {{ folks",
            serde_json::to_string_pretty(&original).expect("serializes")
        );
        let object = extract_json_object(&text).expect("should extract");
        assert_eq!(Value::Object(object), original);
    }

    #[test]
    fn test_brace_scan_with_prose() {
        let text = "The result is {\"approved\": true, \"feedback\": null} as requested.";
        let (object, stage) = extract_json_object_with_stage(text).expect("should extract");
        assert_eq!(stage, ExtractionStage::BraceScan);
        assert_eq!(object["approved"], json!(true));
    }

    #[test]
    fn test_brace_scan_ignores_braces_inside_strings() {
        let text = "Answer: {\"feedback\": \"use {braces} carefully\", \"approved\": false} trailing }";
        let object = extract_json_object(text).expect("should extract");
        assert_eq!(object["feedback"], json!("use {braces} carefully"));
    }

    #[test]
    fn test_control_characters_inside_strings_are_tolerated() {
        let text = "```json\n{\"analysis\": \"line one\nline two\tend\"}\n```";
        let object = extract_json_object(text).expect("should extract");
        assert_eq!(object["analysis"], json!("line one line two end"));
    }

    #[test]
    fn test_recovery_unescapes_over_escaped_quotes() {
        let text = r#"Result: {\"approved\": true, \"feedback\": null}"#;
        let (object, stage) = extract_json_object_with_stage(text).expect("should recover");
        assert_eq!(stage, ExtractionStage::Recovery);
        assert_eq!(object["approved"], json!(true));
    }

    #[test]
    fn test_no_object_is_malformed() {
        let err = extract_json_object("I approve this problem wholeheartedly.")
            .expect_err("should fail");
        assert!(matches!(err, ExtractionError::MalformedResponse { .. }));
    }

    #[test]
    fn test_unbalanced_object_is_malformed() {
        let err = extract_json_object("{\"approved\": true, \"feedback\": ").expect_err("should fail");
        assert!(matches!(err, ExtractionError::MalformedResponse { ref preview } if preview.starts_with("{\"approved\"")));
    }

    #[test]
    fn test_array_is_not_an_object() {
        assert!(extract_json_object("[1, 2, 3]").is_err());
        assert!(extract_json_object("```json\n[{\"a\": 1}]\n```").is_ok());
    }

    #[test]
    fn test_find_matching_brace_nested() {
        let s = r#"{"a": {"b": "}"}, "c": 1} tail"#;
        let end = find_matching_brace(s).expect("should match");
        assert_eq!(&s[..=end], r#"{"a": {"b": "}"}, "c": 1}"#);
        assert_eq!(find_matching_brace("{\"open\": "), None);
    }

    #[test]
    fn test_strip_control_chars() {
        assert_eq!(strip_control_chars("a\nb\rc\u{7f}d"), "a b c d");
        assert_eq!(strip_control_chars("plain ünïcode"), "plain ünïcode");
    }

    #[test]
    fn test_preview_is_char_bounded() {
        let long = "é".repeat(500);
        let err = extract_json_object(&long).expect_err("should fail");
        let ExtractionError::MalformedResponse { preview } = err;
        assert_eq!(preview.chars().count(), PREVIEW_CHARS);
    }
}
