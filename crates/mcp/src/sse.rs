//! Minimal `text/event-stream` reader for single-response streams.

use crate::protocol::{JsonRpcResponse, RequestId};

/// Split an SSE body into the `data` payload of each event.
fn events(body: &str) -> Vec<String> {
    let mut events = Vec::new();
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            if !data.is_empty() {
                events.push(data.join("\n"));
                data.clear();
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            data.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
        // `event:`, `id:`, `retry:` and comments carry nothing we need.
    }
    if !data.is_empty() {
        events.push(data.join("\n"));
    }
    events
}

/// Find the JSON-RPC response for `id` in an SSE body.
///
/// Server-initiated notifications and requests interleaved in the stream are
/// skipped.
pub(crate) fn find_response(body: &str, id: &RequestId) -> Option<JsonRpcResponse> {
    events(body)
        .into_iter()
        .filter_map(|data| serde_json::from_str::<JsonRpcResponse>(&data).ok())
        .find(|response| &response.id == id)
}
