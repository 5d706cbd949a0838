//! Collapsing raw call results into one value.

use mcp::CallToolResult;
use serde_json::{Value, json};

use crate::{Error, Result};

/// Field the first text block is merged under when structured data exists.
pub const MESSAGE_FIELD: &str = "_message";

/// Maximum characters of offending text quoted in errors.
pub const PREVIEW_CHARS: usize = 200;

/// Shape of a raw call result, decided once right after the call returns.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// Structured payload present, optionally with a human-readable message.
    Structured { data: Value, message: Option<String> },
    /// No structured payload, only text.
    TextOnly { text: String },
    /// Neither.
    Empty,
}

impl CallOutcome {
    /// Classify a result. A `null` structured payload counts as absent.
    pub fn classify(result: CallToolResult) -> Self {
        let message = result.first_text().map(str::to_string);
        match result.structured_content {
            Some(Value::Null) | None => match message {
                Some(text) => Self::TextOnly { text },
                None => Self::Empty,
            },
            Some(data) => Self::Structured { data, message },
        }
    }
}

/// A reconciled value plus the text it came from, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub value: Value,
    pub raw_text: Option<String>,
}

/// What to do when a server sends text where structured data belongs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Reject text-only results with [`Error::MissingStructuredData`].
    #[default]
    Strict,
    /// Parse text-only results as JSON, or wrap them as `{"message": text}`.
    Lenient,
}

impl ReconcilePolicy {
    pub fn reconcile(self, tool: &str, outcome: CallOutcome) -> Result<Reconciled> {
        match outcome {
            CallOutcome::Structured { data, message } => Ok(Reconciled {
                value: merge_message(data, message),
                raw_text: None,
            }),
            CallOutcome::TextOnly { text } => match self {
                Self::Strict => Err(Error::MissingStructuredData {
                    tool: tool.to_string(),
                    preview: Some(preview(&text)),
                }),
                Self::Lenient => {
                    let value = serde_json::from_str::<Value>(&text)
                        .unwrap_or_else(|_| json!({ "message": text }));
                    Ok(Reconciled {
                        value,
                        raw_text: Some(text),
                    })
                }
            },
            CallOutcome::Empty => Err(Error::MissingStructuredData {
                tool: tool.to_string(),
                preview: None,
            }),
        }
    }
}

/// Add `message` under [`MESSAGE_FIELD`] unless the payload already has one.
fn merge_message(data: Value, message: Option<String>) -> Value {
    match (data, message) {
        (Value::Object(mut map), Some(message)) => {
            map.entry(MESSAGE_FIELD)
                .or_insert_with(|| Value::String(message));
            Value::Object(map)
        }
        (data, _) => data,
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
