//! Tool Protocol client plumbing.
//!
//! This crate provides the wire layer for invoking named tools on a remote
//! endpoint: JSON-RPC 2.0 message types, the [`Transport`]/[`Connection`]
//! seam, and a streamable HTTP implementation of it.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{Connection, HttpTransport, HttpTransportConfig, Transport};
//!
//! # async fn example() -> mcp::Result<()> {
//! let config = HttpTransportConfig::new("https://api.agentic.scope3.com/mcp", "api-key");
//! let transport = HttpTransport::new(config)?;
//!
//! let connection = transport.connect().await?;
//! for tool in connection.list_tools().await? {
//!     println!("Tool: {}", tool.name);
//! }
//!
//! let result = connection
//!     .call_tool(mcp::CallToolParams {
//!         name: "campaign_list".to_string(),
//!         arguments: serde_json::Map::new(),
//!     })
//!     .await?;
//! println!("{:?}", result.structured_content);
//!
//! connection.close().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod protocol;
mod sse;
mod transport;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use error::{Error, Result};
pub use http::{DEFAULT_TIMEOUT, HttpConnection, HttpTransport, HttpTransportConfig, SESSION_HEADER};
pub use protocol::{
    CallToolParams, CallToolResult, ClientCapabilities, ClientInfo, InitializeParams,
    InitializeResult, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, PROTOCOL_VERSION, RequestId, ServerInfo, Tool, ToolContent,
};
pub use transport::{Connection, Transport};
