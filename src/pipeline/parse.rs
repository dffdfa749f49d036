//! Response parsing: turn the model's text answer into an [`ExtractedRecord`].
//!
//! Models are asked for bare JSON but regularly wrap it in a Markdown fence or
//! add a sentence before it. Two deterministic recoveries are applied before
//! giving up:
//!
//! 1. strip a surrounding ```` ```json ```` / ```` ``` ```` fence
//! 2. parse the outermost `{ … }` span
//!
//! Anything that still is not a JSON object is an error; the caller counts it
//! as a failed model attempt.

use crate::record::ExtractedRecord;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z]*\s*\n?(.*?)\n?\s*```$").unwrap());

/// Parse a raw model answer into a typed record.
pub fn parse_response(text: &str) -> Result<ExtractedRecord, String> {
    let value = parse_json_object(text)?;
    Ok(ExtractedRecord::from_json(&value))
}

/// Extract the JSON object from a raw model answer.
pub fn parse_json_object(text: &str) -> Result<Value, String> {
    let body = strip_code_fences(text);

    let value = match serde_json::from_str::<Value>(&body) {
        Ok(v) => v,
        Err(first_err) => match outer_braces(&body) {
            Some(span) => serde_json::from_str::<Value>(span).map_err(|e| e.to_string())?,
            None => return Err(first_err.to_string()),
        },
    };

    if value.is_object() {
        Ok(value)
    } else {
        Err(format!("expected a JSON object, got {}", kind_of(&value)))
    }
}

fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    match RE_OUTER_FENCES.captures(trimmed) {
        Some(caps) => caps[1].trim().to_string(),
        None => trimmed.to_string(),
    }
}

fn outer_braces(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
