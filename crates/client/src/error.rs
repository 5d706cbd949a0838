//! Client error types.

use thiserror::Error;

/// Client errors.
///
/// `Connection` and `Transport` carry the transport's own error untouched so
/// callers can tell connectivity problems from protocol problems.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The connection could not be established.
    #[error("{0}")]
    Connection(#[source] mcp::Error),

    /// A network-level failure during a call.
    #[error(transparent)]
    Transport(mcp::Error),

    /// The server answered without a structured payload.
    #[error(
        "API Error: Missing structured data in response from tool '{tool}'. \
         This is an API bug that needs to be fixed upstream.{}",
        describe_preview(.preview)
    )]
    MissingStructuredData {
        tool: String,
        preview: Option<String>,
    },

    /// Arguments did not serialize to a mapping.
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The reconciled value did not match the requested type.
    #[error("failed to decode response from {tool}: {source}")]
    Decode {
        tool: String,
        #[source]
        source: serde_json::Error,
    },

    /// Client configuration is invalid.
    #[error("config error: {0}")]
    Config(String),
}

fn describe_preview(preview: &Option<String>) -> String {
    match preview {
        Some(text) => format!(" Text content received instead: {text}"),
        None => " No content was returned.".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
