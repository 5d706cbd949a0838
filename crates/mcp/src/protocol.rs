//! Tool Protocol types (JSON-RPC 2.0 based).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol revision announced during `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// JSON-RPC 2.0 request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: &'static str,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id: id.into(),
            method: method.into(),
            params: None,
        }
    }

    pub fn with_params(mut self, params: impl Serialize) -> Self {
        self.params = Some(serde_json::to_value(params).unwrap_or(Value::Null));
        self
    }
}

/// JSON-RPC 2.0 notification (no id, no response).
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: &'static str,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            method: method.into(),
            params: None,
        }
    }
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// The `error` member if present, else `result` (absent reads as `null`).
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        if let Some(error) = self.error {
            Err(error)
        } else {
            Ok(self.result.unwrap_or(Value::Null))
        }
    }
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// Correlates a response with its request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(i64),
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

/// `initialize` request params.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

impl InitializeParams {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: name.into(),
                version: version.into(),
            },
        }
    }
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self::new("scope3-agentic-client", env!("CARGO_PKG_VERSION"))
    }
}

/// Client capabilities sent during initialization.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ClientCapabilities {}

/// Client info sent during initialization.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// `initialize` response result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

/// Server info returned during initialization.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Tool definition returned by tools/list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub input_schema: Value,
}

/// Result of tools/list.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListToolsResult {
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

/// Params for tools/call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Map<String, Value>,
}

/// Result of tools/call.
///
/// `structured_content` is the schema-typed payload; `content` carries the
/// free-text blocks older servers used instead.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
    #[serde(default)]
    pub is_error: bool,
}

impl CallToolResult {
    /// Result carrying only a structured payload.
    pub fn structured(data: Value) -> Self {
        Self {
            structured_content: Some(data),
            ..Self::default()
        }
    }

    /// Result carrying only a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            ..Self::default()
        }
    }

    /// Append a text block.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content.push(ToolContent::Text { text: text.into() });
        self
    }

    /// The first text block, if any.
    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(ToolContent::as_text)
    }
}

/// One block of a tool's free-form output.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(default, rename = "mimeType")]
        mime_type: Option<String>,
    },
    Resource {
        resource: Value,
    },
    #[serde(other)]
    Unsupported,
}

impl ToolContent {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serialize_request() {
        let req = JsonRpcRequest::new(1i64, "initialize").with_params(InitializeParams::default());
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"jsonrpc\":\"2.0\""));
        assert!(json.contains("\"method\":\"initialize\""));
        assert!(json.contains("\"protocolVersion\":\"2025-03-26\""));
    }

    #[test]
    fn notification_has_no_id() {
        let json = serde_json::to_value(JsonRpcNotification::new("notifications/initialized"))
            .unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["method"], "notifications/initialized");
    }

    #[test]
    fn response_without_result_is_null() {
        let resp: JsonRpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 7})).unwrap();
        assert_eq!(resp.id, RequestId::Number(7));
        assert_eq!(resp.into_result().unwrap(), Value::Null);
    }

    #[test]
    fn error_response_into_result() {
        let json = r#"{"jsonrpc":"2.0","id":"a","error":{"code":-32601,"message":"no such method"}}"#;
        let resp: JsonRpcResponse = serde_json::from_str(json).unwrap();
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.to_string(), "[-32601] no such method");
    }

    #[test]
    fn deserialize_tool() {
        let json = r#"{
            "name": "campaign_get",
            "description": "Get a campaign",
            "inputSchema": {"type": "object", "properties": {"campaignId": {"type": "string"}}}
        }"#;
        let tool: Tool = serde_json::from_str(json).unwrap();
        assert_eq!(tool.name, "campaign_get");
    }

    #[test]
    fn call_result_with_structured_content() {
        let result: CallToolResult = serde_json::from_value(json!({
            "structuredContent": {"id": "123"},
            "content": [{"type": "text", "text": "Campaign retrieved"}]
        }))
        .unwrap();
        assert_eq!(result.structured_content, Some(json!({"id": "123"})));
        assert_eq!(result.first_text(), Some("Campaign retrieved"));
        assert!(!result.is_error);
    }

    #[test]
    fn call_result_tolerates_unknown_content() {
        let result: CallToolResult = serde_json::from_value(json!({
            "content": [
                {"type": "image", "data": "base64data"},
                {"type": "resource_link", "uri": "file:///x"},
                {"type": "text", "text": "later"}
            ]
        }))
        .unwrap();
        assert!(result.structured_content.is_none());
        assert!(matches!(result.content[1], ToolContent::Unsupported));
        assert_eq!(result.first_text(), Some("later"));
    }

    #[test]
    fn call_params_serialize_arguments() {
        let mut arguments = Map::new();
        arguments.insert("campaignId".into(), json!("123"));
        let params = CallToolParams {
            name: "campaign_get".into(),
            arguments,
        };
        assert_eq!(
            serde_json::to_value(params).unwrap(),
            json!({"name": "campaign_get", "arguments": {"campaignId": "123"}})
        );
    }
}
