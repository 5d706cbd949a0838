//! Session management.

use std::sync::Arc;
use std::time::Instant;

use mcp::{
    CallToolParams, Connection, HttpTransport, HttpTransportConfig, Tool, Transport,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::debug::{DebugRecord, sanitize, sanitize_map};
use crate::reconcile::{CallOutcome, ReconcilePolicy};
use crate::{Error, Result};

/// One logical connection to a Tool Protocol endpoint.
///
/// The connection is opened lazily on first use and reused for every call
/// until [`Session::disconnect`]. Concurrent first callers wait on the same
/// gate, so only one handshake ever happens per connect.
pub struct Session<T: Transport = HttpTransport> {
    transport: T,
    connection: Mutex<Option<Arc<T::Connection>>>,
    policy: ReconcilePolicy,
    debug: bool,
    last_debug: RwLock<Option<DebugRecord>>,
}

impl Session<HttpTransport> {
    /// Create a session over streamable HTTP from client options.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let mut http = HttpTransportConfig::new(config.endpoint(), &config.api_key);
        if let Some(timeout) = config.timeout {
            http = http.timeout(timeout);
        }
        let transport = HttpTransport::new(http).map_err(Error::Connection)?;

        Ok(Self::with_transport(transport)
            .with_policy(config.policy)
            .with_debug(config.debug))
    }

    /// Tool Protocol endpoint this session talks to.
    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }
}

impl<T: Transport> Session<T> {
    /// Create a session over any transport.
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            connection: Mutex::new(None),
            policy: ReconcilePolicy::default(),
            debug: false,
            last_debug: RwLock::new(None),
        }
    }

    /// Handle text-only results with `policy` instead of the default.
    pub fn with_policy(mut self, policy: ReconcilePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Record a [`DebugRecord`] for each successful call.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Policy applied to every call result.
    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    /// Whether debug capture is on.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Establish the connection if not already connected.
    pub async fn connect(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    /// Tear the connection down. Safe to call when never connected.
    pub async fn disconnect(&self) -> Result<()> {
        let connection = self.connection.lock().await.take();
        if let Some(connection) = connection {
            connection.close().await.map_err(Error::Transport)?;
            debug!("disconnected");
        }
        Ok(())
    }

    /// Whether a connection is currently open.
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    /// Most recent Debug Record; `None` unless debug mode is on.
    pub async fn last_debug_record(&self) -> Option<DebugRecord> {
        self.last_debug.read().await.clone()
    }

    /// List the tools the endpoint exposes.
    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        let connection = self.connection().await?;
        connection.list_tools().await.map_err(Error::Transport)
    }

    /// Invoke `tool` and decode the reconciled value into `R`.
    pub async fn invoke<R, A>(&self, tool: &str, arguments: A) -> Result<R>
    where
        R: DeserializeOwned,
        A: Serialize,
    {
        let arguments = to_arguments(tool, arguments)?;
        let value = self.call_tool(tool, arguments).await?;
        serde_json::from_value(value).map_err(|source| Error::Decode {
            tool: tool.to_string(),
            source,
        })
    }

    /// Invoke `tool` and return the reconciled value.
    pub async fn call_tool(&self, tool: &str, arguments: Map<String, Value>) -> Result<Value> {
        let connection = self.connection().await?;

        let request = self.debug.then(|| Value::Object(sanitize_map(&arguments)));
        let started = Instant::now();

        let result = connection
            .call_tool(CallToolParams {
                name: tool.to_string(),
                arguments,
            })
            .await
            .map_err(Error::Transport)?;

        if result.is_error {
            warn!(tool, "tool reported an error result");
        }

        let reconciled = self.policy.reconcile(tool, CallOutcome::classify(result))?;

        if let Some(request) = request {
            let record = DebugRecord {
                tool_name: tool.to_string(),
                request,
                response: sanitize(&reconciled.value),
                duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                raw_text: reconciled.raw_text.clone(),
            };
            debug!(
                tool = %record.tool_name,
                duration_ms = record.duration_ms,
                request = %record.request,
                response = %record.response,
                "tool call"
            );
            *self.last_debug.write().await = Some(record);
        }

        Ok(reconciled.value)
    }

    async fn connection(&self) -> Result<Arc<T::Connection>> {
        let mut guard = self.connection.lock().await;
        if let Some(connection) = guard.as_ref() {
            return Ok(Arc::clone(connection));
        }

        let connection = Arc::new(self.transport.connect().await.map_err(Error::Connection)?);
        *guard = Some(Arc::clone(&connection));
        debug!("connected");
        Ok(connection)
    }
}

fn to_arguments(tool: &str, arguments: impl Serialize) -> Result<Map<String, Value>> {
    let invalid = |reason: String| Error::InvalidArguments {
        tool: tool.to_string(),
        reason,
    };
    match serde_json::to_value(arguments).map_err(|e| invalid(e.to_string()))? {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        other => Err(invalid(format!("expected an object, got {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp::CallToolResult;
    use mcp::testing::ScriptedTransport;
    use serde_json::json;
    use std::time::Duration;

    fn session(transport: &ScriptedTransport) -> Session<ScriptedTransport> {
        Session::with_transport(transport.clone())
    }

    #[tokio::test]
    async fn connects_once_on_first_call() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({"result": "success"})));
        let session = session(&transport);

        let _: Value = session.invoke("test_tool", json!({"arg": "value"})).await.unwrap();
        let _: Value = session.invoke("test_tool_2", json!({})).await.unwrap();

        assert_eq!(transport.connect_count(), 1);
        assert!(session.is_connected().await);
    }

    #[tokio::test]
    async fn concurrent_first_calls_share_one_connect() {
        let transport = ScriptedTransport::new();
        transport
            .respond_default(CallToolResult::structured(json!({"ok": true})))
            .connect_delay(Duration::from_millis(20));
        let session = Arc::new(session(&transport));

        let calls = (0..16).map(|i| {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                session
                    .call_tool(&format!("tool_{i}"), Map::new())
                    .await
                    .unwrap()
            })
        });
        for handle in calls.collect::<Vec<_>>() {
            handle.await.unwrap();
        }

        assert_eq!(transport.connect_count(), 1);
        assert_eq!(transport.calls().len(), 16);
    }

    #[tokio::test]
    async fn concurrent_debug_calls_keep_one_whole_record() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({"ok": true})));
        let session = Arc::new(session(&transport).with_debug(true));

        let tools: Vec<String> = (0..12).map(|i| format!("tool_{i}")).collect();
        let calls: Vec<_> = tools
            .iter()
            .cloned()
            .map(|tool| {
                let session = Arc::clone(&session);
                tokio::spawn(async move {
                    let mut args = Map::new();
                    args.insert("name".into(), json!(tool));
                    session.call_tool(&tool, args).await.unwrap()
                })
            })
            .collect();
        for handle in calls {
            handle.await.unwrap();
        }

        let record = session.last_debug_record().await.unwrap();
        assert!(tools.contains(&record.tool_name));
        assert_eq!(record.request, json!({"name": record.tool_name}));
        assert_eq!(record.response, json!({"ok": true}));
    }

    #[tokio::test]
    async fn concurrent_connects_share_one_connect() {
        let transport = ScriptedTransport::new();
        transport.connect_delay(Duration::from_millis(20));
        let session = session(&transport);

        let (a, b, c) = tokio::join!(session.connect(), session.connect(), session.connect());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(transport.connect_count(), 1);
    }

    #[tokio::test]
    async fn disconnect_closes_connection() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({})));
        let session = session(&transport);

        session.call_tool("test_tool", Map::new()).await.unwrap();
        session.disconnect().await.unwrap();
        session.disconnect().await.unwrap();

        assert_eq!(transport.close_count(), 1);
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn disconnect_without_connect_is_noop() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);

        session.disconnect().await.unwrap();

        assert_eq!(transport.close_count(), 0);
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn reconnects_after_disconnect() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({})));
        let session = session(&transport);

        session.connect().await.unwrap();
        session.disconnect().await.unwrap();
        session.call_tool("t", Map::new()).await.unwrap();

        assert_eq!(transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn connection_errors_propagate_verbatim() {
        let transport = ScriptedTransport::new();
        transport.fail_connect("Connection refused");
        let session = session(&transport);

        let err = session.call_tool("t", Map::new()).await.unwrap_err();

        assert!(matches!(err, Error::Connection(_)));
        assert_eq!(err.to_string(), "Connection refused");
        assert!(!session.is_connected().await);
    }

    #[tokio::test]
    async fn transport_failures_are_not_wrapped() {
        let transport = ScriptedTransport::new();
        transport.fail("t", "MCP transport failure");
        let session = session(&transport);

        let err = session.call_tool("t", Map::new()).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
        assert_eq!(err.to_string(), "MCP transport failure");
    }

    #[tokio::test]
    async fn passes_arguments_through() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({"success": true})));
        let session = session(&transport);
        let args = json!({
            "stringArg": "test",
            "numberArg": 123,
            "boolArg": true,
            "objectArg": {"nested": "value"},
            "arrayArg": [1, 2, 3]
        });

        let _: Value = session.invoke("test_tool", &args).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].name, "test_tool");
        assert_eq!(Value::Object(calls[0].arguments.clone()), args);
    }

    #[tokio::test]
    async fn unit_arguments_become_empty_object() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({})));
        let session = session(&transport);

        let _: Value = session.invoke("test_tool", ()).await.unwrap();

        assert!(transport.calls()[0].arguments.is_empty());
    }

    #[tokio::test]
    async fn non_object_arguments_rejected() {
        let transport = ScriptedTransport::new();
        let session = session(&transport);

        let err = session.invoke::<Value, _>("t", json!([1, 2])).await.unwrap_err();

        assert!(matches!(err, Error::InvalidArguments { .. }));
        assert_eq!(transport.connect_count(), 0);
    }

    #[tokio::test]
    async fn invoke_decodes_typed_values() {
        #[derive(serde::Deserialize)]
        struct Campaign {
            id: String,
            #[serde(rename = "_message")]
            message: Option<String>,
        }

        let transport = ScriptedTransport::new();
        transport.respond(
            "campaign_get",
            CallToolResult::structured(json!({"id": "123"})).with_text("ok"),
        );
        let session = session(&transport);

        let campaign: Campaign = session
            .invoke("campaign_get", json!({"campaignId": "123"}))
            .await
            .unwrap();

        assert_eq!(campaign.id, "123");
        assert_eq!(campaign.message.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn decode_failure_names_tool() {
        let transport = ScriptedTransport::new();
        transport.respond("t", CallToolResult::structured(json!({"id": 5})));
        let session = session(&transport);

        let err = session.invoke::<Vec<String>, _>("t", ()).await.unwrap_err();

        assert!(matches!(err, Error::Decode { ref tool, .. } if tool == "t"));
    }

    #[tokio::test]
    async fn text_only_response_fails_strictly() {
        let transport = ScriptedTransport::new();
        transport.respond("test_tool", CallToolResult::text(r#"[{"id":"1"},{"id":"2"}]"#));
        let session = session(&transport);

        let err = session.call_tool("test_tool", Map::new()).await.unwrap_err();

        assert!(err.to_string().contains("API Error: Missing structured data"));
        assert!(err.to_string().contains("test_tool"));
    }

    #[tokio::test]
    async fn lenient_policy_is_injectable() {
        let transport = ScriptedTransport::new();
        transport.respond("t", CallToolResult::text("Operation completed"));
        let session = session(&transport).with_policy(ReconcilePolicy::Lenient);

        let value = session.call_tool("t", Map::new()).await.unwrap();

        assert_eq!(value, json!({"message": "Operation completed"}));
    }

    #[tokio::test]
    async fn debug_record_captured() {
        let transport = ScriptedTransport::new();
        transport.respond(
            "campaign_get",
            CallToolResult::structured(json!({"id": "123", "name": "Test"})),
        );
        let session = session(&transport).with_debug(true);

        let _: Value = session
            .invoke("campaign_get", json!({"campaignId": "123", "apiKey": "k"}))
            .await
            .unwrap();

        let record = session.last_debug_record().await.unwrap();
        assert_eq!(record.tool_name, "campaign_get");
        assert_eq!(
            record.request,
            json!({"campaignId": "123", "apiKey": crate::debug::REDACTED})
        );
        assert_eq!(record.response, json!({"id": "123", "name": "Test"}));
        assert!(record.raw_text.is_none());
        // The real arguments went out unredacted.
        assert_eq!(transport.calls()[0].arguments["apiKey"], "k");
    }

    #[tokio::test]
    async fn debug_record_keeps_only_latest_call() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({})));
        let session = session(&transport).with_debug(true);

        session.call_tool("first", Map::new()).await.unwrap();
        session.call_tool("second", Map::new()).await.unwrap();

        assert_eq!(session.last_debug_record().await.unwrap().tool_name, "second");
    }

    #[tokio::test]
    async fn no_debug_record_on_protocol_violation() {
        let transport = ScriptedTransport::new();
        transport.respond("t", CallToolResult::text(r#"{"id":"456"}"#));
        let session = session(&transport).with_debug(true);

        assert!(session.call_tool("t", Map::new()).await.is_err());
        assert!(session.last_debug_record().await.is_none());
    }

    #[tokio::test]
    async fn no_debug_record_when_disabled() {
        let transport = ScriptedTransport::new();
        transport.respond_default(CallToolResult::structured(json!({"result": "success"})));
        let session = session(&transport);

        session.call_tool("t", Map::new()).await.unwrap();

        assert!(session.last_debug_record().await.is_none());
    }

    #[tokio::test]
    async fn lenient_debug_record_keeps_raw_text() {
        let transport = ScriptedTransport::new();
        transport.respond("t", CallToolResult::text(r#"{"token":"abc"}"#));
        let session = session(&transport)
            .with_policy(ReconcilePolicy::Lenient)
            .with_debug(true);

        session.call_tool("t", Map::new()).await.unwrap();

        let record = session.last_debug_record().await.unwrap();
        assert_eq!(record.response, json!({"token": crate::debug::REDACTED}));
        assert_eq!(record.raw_text.as_deref(), Some(r#"{"token":"abc"}"#));
    }

    #[tokio::test]
    async fn list_tools_connects() {
        let transport = ScriptedTransport::new();
        transport.tools(vec![Tool {
            name: "campaign_list".into(),
            description: None,
            input_schema: json!({"type": "object"}),
        }]);
        let session = session(&transport);

        let tools = session.list_tools().await.unwrap();

        assert_eq!(tools.len(), 1);
        assert_eq!(transport.connect_count(), 1);
    }

    #[test]
    fn http_session_from_config() {
        let config = ClientConfig::new("test-key").base_url("https://custom.api.com");
        let session = Session::new(&config).unwrap();
        assert_eq!(session.endpoint(), "https://custom.api.com/mcp");
        assert!(!session.is_debug());
    }

    #[test]
    fn http_session_requires_api_key() {
        assert!(matches!(
            Session::new(&ClientConfig::new("")),
            Err(Error::Config(_))
        ));
    }
}
