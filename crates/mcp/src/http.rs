//! Streamable HTTP transport.
//!
//! Every JSON-RPC message is a `POST` to a single endpoint. The server may
//! answer with plain JSON or with a short SSE stream, and may hand out a
//! session id during `initialize` that must be echoed on later requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, RequestId, Tool,
};
use crate::sse;
use crate::transport::{Connection, Transport};

/// Session header assigned by the server during `initialize`.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
    pub client_name: String,
    pub client_version: String,
}

impl HttpTransportConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            client_name: "scope3-agentic-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Opens [`HttpConnection`]s to one endpoint with one credential.
pub struct HttpTransport {
    client: reqwest::Client,
    config: Arc<HttpTransportConfig>,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }
}

impl Transport for HttpTransport {
    type Connection = HttpConnection;

    async fn connect(&self) -> Result<HttpConnection> {
        let id = RequestId::Number(0);
        let request = JsonRpcRequest::new(id.clone(), "initialize").with_params(
            InitializeParams::new(&self.config.client_name, &self.config.client_version),
        );

        let response = post(&self.client, &self.config, None, &request).await?;
        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let init: InitializeResult = read_result(response, &id).await?;

        debug!(
            endpoint = %self.config.endpoint,
            server = %init.server_info.name,
            protocol = %init.protocol_version,
            session = session_id.as_deref().unwrap_or("-"),
            "connected"
        );

        let notification = JsonRpcNotification::new("notifications/initialized");
        post(&self.client, &self.config, session_id.as_deref(), &notification).await?;

        Ok(HttpConnection {
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            session_id,
            next_id: AtomicI64::new(1),
            closed: AtomicBool::new(false),
        })
    }
}

/// An initialized streamable HTTP session.
pub struct HttpConnection {
    client: reqwest::Client,
    config: Arc<HttpTransportConfig>,
    session_id: Option<String>,
    next_id: AtomicI64,
    closed: AtomicBool,
}

impl HttpConnection {
    /// Session id assigned by the server, if any.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    fn next_request_id(&self) -> RequestId {
        RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn request<P, R>(&self, method: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::Closed);
        }

        let id = self.next_request_id();
        let request = JsonRpcRequest::new(id.clone(), method).with_params(params);
        let response = post(
            &self.client,
            &self.config,
            self.session_id.as_deref(),
            &request,
        )
        .await?;
        read_result(response, &id).await
    }
}

impl Connection for HttpConnection {
    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult> {
        self.request("tools/call", params).await
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = match &cursor {
                Some(c) => serde_json::json!({ "cursor": c }),
                None => serde_json::json!({}),
            };
            let page: ListToolsResult = self.request("tools/list", params).await?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let Some(session_id) = &self.session_id else {
            return Ok(());
        };

        // Servers may not support explicit termination.
        let result = self
            .client
            .delete(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .header(SESSION_HEADER, session_id)
            .send()
            .await;
        if let Err(e) = result {
            warn!(error = %e, "failed to terminate session");
        }
        Ok(())
    }
}

async fn post(
    client: &reqwest::Client,
    config: &HttpTransportConfig,
    session_id: Option<&str>,
    body: &impl Serialize,
) -> Result<reqwest::Response> {
    let mut req = client
        .post(&config.endpoint)
        .bearer_auth(&config.api_key)
        .header(CONTENT_TYPE, "application/json")
        .header(ACCEPT, "application/json, text/event-stream");
    if let Some(session_id) = session_id {
        req = req.header(SESSION_HEADER, session_id);
    }

    let response = req.json(body).send().await?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

async fn read_result<R: DeserializeOwned>(response: reqwest::Response, id: &RequestId) -> Result<R> {
    let is_stream = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("text/event-stream"));

    let body = response.text().await?;
    let rpc: JsonRpcResponse = if is_stream {
        sse::find_response(&body, id).ok_or_else(|| {
            Error::InvalidResponse(format!("no response for request {id:?} in event stream"))
        })?
    } else {
        serde_json::from_str(&body)?
    };

    if &rpc.id != id {
        return Err(Error::InvalidResponse(format!(
            "response ID mismatch: expected {id:?}, got {:?}",
            rpc.id
        )));
    }

    let value = rpc.into_result()?;
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = HttpTransportConfig::new("https://example.com/mcp", "key");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
        assert_eq!(config.client_name, "scope3-agentic-client");
    }

    #[test]
    fn config_timeout_override() {
        let config = HttpTransportConfig::new("https://example.com/mcp", "key")
            .timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn transport_reports_endpoint() {
        let transport =
            HttpTransport::new(HttpTransportConfig::new("https://example.com/mcp", "key")).unwrap();
        assert_eq!(transport.endpoint(), "https://example.com/mcp");
    }
}
