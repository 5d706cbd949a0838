//! Agent error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// A request rejected before any work was done.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ValidationError {
    pub reason: String,
}

impl ValidationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Agent errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A platform call failed.
    #[error(transparent)]
    Client(#[from] client::Error),

    #[error(transparent)]
    Allocation(#[from] allocation::Error),

    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Discovery came back empty.
    #[error(
        "No products available from {agents} agents. \
         Cannot propose tactics without available inventory."
    )]
    NoInventory { agents: usize },

    /// A webhook handler reported failure.
    #[error("webhook handler failed: {0}")]
    Handler(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
