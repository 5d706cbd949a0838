//! Debug capture and secret redaction.

use serde::Serialize;
use serde_json::{Map, Value};

/// Replacement for values under sensitive keys.
pub const REDACTED: &str = "[REDACTED]";

/// Substrings marking a key as sensitive, matched against the key lowercased
/// with `_` and `-` removed.
const SENSITIVE_TERMS: &[&str] = &["token", "secret", "password", "apikey", "auth", "credential"];

/// Snapshot of the most recent successful call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugRecord {
    pub tool_name: String,
    /// Sanitized request arguments.
    pub request: Value,
    /// Sanitized reconciled response.
    pub response: Value,
    pub duration_ms: u64,
    /// Text the response was derived from, when no structured payload was used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

/// Whether `key` names a credential-like field.
pub fn is_sensitive_key(key: &str) -> bool {
    let normalized: String = key
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect();
    SENSITIVE_TERMS.iter().any(|term| normalized.contains(term))
}

/// Copy `value`, redacting every sensitive key at any depth.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(sanitize_map(map)),
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        other => other.clone(),
    }
}

pub fn sanitize_map(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                sanitize(value)
            };
            (key.clone(), value)
        })
        .collect()
}
