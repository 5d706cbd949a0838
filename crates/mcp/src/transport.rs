//! Transport seam between a session and the wire.

use std::future::Future;

use crate::Result;
use crate::protocol::{CallToolParams, CallToolResult, Tool};

/// Something that can open a connection to a Tool Protocol endpoint.
///
/// Implementations own endpoint and credential details; the session only
/// decides *when* to connect.
pub trait Transport: Send + Sync {
    type Connection: Connection + 'static;

    /// Establish a new connection (handshake included).
    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}

/// An established connection.
pub trait Connection: Send + Sync {
    /// Invoke a tool and return the raw result.
    fn call_tool(
        &self,
        params: CallToolParams,
    ) -> impl Future<Output = Result<CallToolResult>> + Send;

    /// List the tools the endpoint exposes.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<Tool>>> + Send;

    /// Tear the connection down.
    fn close(&self) -> impl Future<Output = Result<()>> + Send;
}
