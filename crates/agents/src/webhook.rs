//! Webhook listener with per-event-type handlers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Request, State};
use axum::http::{StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use crate::{Error, Result};

/// Event type that matches every event.
pub const WILDCARD: &str = "*";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_PATH: &str = "/webhooks";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: Value,
}

pub type Handler = Arc<dyn Fn(WebhookEvent) -> BoxFuture<'static, Result<()>> + Send + Sync>;

/// Returned by [`WebhookServer::on`]; pass to [`WebhookServer::off`] to
/// remove that handler only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub port: u16,
    pub path: String,
    /// Expected as `Authorization: Bearer <secret>` when set.
    pub secret: Option<String>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            path: DEFAULT_PATH.to_string(),
            secret: None,
        }
    }
}

pub struct WebhookServer {
    config: WebhookConfig,
    handlers: RwLock<HashMap<String, Vec<(HandlerId, Handler)>>>,
    next_id: AtomicU64,
}

impl WebhookServer {
    /// A path given without a leading `/` is served under `/{path}`.
    pub fn new(mut config: WebhookConfig) -> Self {
        if !config.path.starts_with('/') {
            config.path.insert(0, '/');
        }
        Self {
            config,
            handlers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    /// Local URL events should be posted to.
    pub fn url(&self) -> String {
        format!("http://localhost:{}{}", self.config.port, self.config.path)
    }

    /// Register `handler` for `event_type`, or for every event with `"*"`.
    pub fn on<F, Fut>(&self, event_type: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(WebhookEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let handler: Handler = Arc::new(move |event: WebhookEvent| handler(event).boxed());
        self.write()
            .entry(event_type.into())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one handler, or every handler for `event_type` when `id` is `None`.
    pub fn off(&self, event_type: &str, id: Option<HandlerId>) {
        let mut handlers = self.write();
        match id {
            None => {
                handlers.remove(event_type);
            }
            Some(id) => {
                if let Some(registered) = handlers.get_mut(event_type) {
                    registered.retain(|(existing, _)| *existing != id);
                }
            }
        }
    }

    pub fn handler_count(&self, event_type: &str) -> usize {
        self.read().get(event_type).map_or(0, Vec::len)
    }

    /// Run every handler for the event's type plus the wildcard handlers.
    ///
    /// Handlers run concurrently; the first failure is returned after all
    /// have finished.
    pub async fn dispatch(&self, event: WebhookEvent) -> Result<()> {
        let handlers: Vec<Handler> = {
            let registry = self.read();
            let keys = [event.event_type.as_str(), WILDCARD];
            let keys = if event.event_type == WILDCARD {
                &keys[1..]
            } else {
                &keys[..]
            };
            keys.iter()
                .filter_map(|key| registry.get(*key))
                .flatten()
                .map(|(_, handler)| Arc::clone(handler))
                .collect()
        };

        join_all(handlers.iter().map(|handler| handler(event.clone())))
            .await
            .into_iter()
            .collect()
    }

    pub fn router(self: Arc<Self>) -> Router {
        let path = self.config.path.clone();
        Router::new()
            .route(&path, post(receive))
            .route("/health", get(health))
            .layer(middleware::from_fn_with_state(
                Arc::clone(&self),
                require_secret,
            ))
            .with_state(self)
    }

    /// Bind the configured port and serve until the process exits.
    pub async fn serve(self: Arc<Self>) -> Result<()> {
        info!(url = %self.url(), "webhook endpoint");
        let port = self.config.port;
        crate::routes::serve(self.router(), port).await
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<(HandlerId, Handler)>>> {
        self.handlers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Vec<(HandlerId, Handler)>>> {
        self.handlers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn require_secret(
    State(server): State<Arc<WebhookServer>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(secret) = &server.config.secret {
        let expected = format!("Bearer {secret}");
        let presented = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok());
        if presented != Some(expected.as_str()) {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn receive(State(server): State<Arc<WebhookServer>>, body: Bytes) -> Response {
    let event = serde_json::from_slice::<Value>(&body)
        .ok()
        .filter(|value| {
            value
                .get("type")
                .and_then(Value::as_str)
                .is_some_and(|t| !t.is_empty())
        })
        .and_then(|value| serde_json::from_value::<WebhookEvent>(value).ok());
    let Some(event) = event else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "Missing event type" })),
        )
            .into_response();
    };

    match server.dispatch(event).await {
        Ok(()) => Json(json!({ "success": true })).into_response(),
        Err(err) => {
            error!(error = %err, "webhook handler error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal server error" })),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
