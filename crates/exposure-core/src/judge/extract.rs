//! Structured-payload extraction from free-form judge output.
//!
//! Strict contract: the payload is parsed as JSON or rejected. Model text is
//! never evaluated as code.

use regex::Regex;
use std::sync::OnceLock;

/// First JSON object embedded in `text`, if any.
///
/// Finds the first `{` and stream-deserializes exactly one JSON value from
/// there, so trailing prose after the object does not break parsing.
pub fn extract_json_object(text: &str) -> Option<serde_json::Value> {
    let start = text.find('{')?;
    let value = serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<serde_json::Value>()
        .next()?
        .ok()?;
    value.is_object().then_some(value)
}

/// Content of the first bracketed `[...]` segment in `text`, if any.
pub fn extract_bracketed(text: &str) -> Option<String> {
    static BRACKETED: OnceLock<Regex> = OnceLock::new();
    let re = BRACKETED.get_or_init(|| Regex::new(r"(?s)\[(.*?)\]").expect("valid regex"));
    re.captures(text).map(|c| c[1].to_string())
}

/// First bracketed segment including its brackets, for JSON-array parsing.
pub fn extract_bracketed_raw(text: &str) -> Option<&str> {
    static BRACKETED_RAW: OnceLock<Regex> = OnceLock::new();
    let re = BRACKETED_RAW.get_or_init(|| Regex::new(r"(?s)\[.*?\]").expect("valid regex"));
    re.find(text).map(|m| m.as_str())
}
