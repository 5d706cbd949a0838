//! In-memory transport with scripted replies, for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::protocol::{CallToolParams, CallToolResult, Tool};
use crate::transport::{Connection, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Result(CallToolResult),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Matched {
    tool: String,
    key: String,
    value: Value,
    reply: Reply,
}

#[derive(Default)]
struct Script {
    connects: AtomicUsize,
    closes: AtomicUsize,
    calls: Mutex<Vec<CallToolParams>>,
    replies: Mutex<HashMap<String, Reply>>,
    matched: Mutex<Vec<Matched>>,
    fallback: Mutex<Option<Reply>>,
    connect_error: Mutex<Option<String>>,
    connect_delay: Mutex<Option<Duration>>,
    tools: Mutex<Vec<Tool>>,
}

/// Transport whose connections answer from a per-tool script.
///
/// Clones share the same script and counters.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer calls to `tool` with `result`.
    pub fn respond(&self, tool: &str, result: CallToolResult) -> &Self {
        lock(&self.script.replies).insert(tool.to_string(), Reply::Result(result));
        self
    }

    /// Fail calls to `tool` with a transport error.
    pub fn fail(&self, tool: &str, message: &str) -> &Self {
        lock(&self.script.replies).insert(tool.to_string(), Reply::Fail(message.to_string()));
        self
    }

    /// Answer calls to `tool` whose argument `key` equals `value`.
    ///
    /// Checked before the per-tool replies.
    pub fn respond_where(&self, tool: &str, key: &str, value: Value, result: CallToolResult) -> &Self {
        self.push_matched(tool, key, value, Reply::Result(result))
    }

    /// Fail calls to `tool` whose argument `key` equals `value`.
    pub fn fail_where(&self, tool: &str, key: &str, value: Value, message: &str) -> &Self {
        self.push_matched(tool, key, value, Reply::Fail(message.to_string()))
    }

    fn push_matched(&self, tool: &str, key: &str, value: Value, reply: Reply) -> &Self {
        lock(&self.script.matched).push(Matched {
            tool: tool.to_string(),
            key: key.to_string(),
            value,
            reply,
        });
        self
    }

    /// Answer every unscripted tool with `result`.
    pub fn respond_default(&self, result: CallToolResult) -> &Self {
        *lock(&self.script.fallback) = Some(Reply::Result(result));
        self
    }

    /// Make `connect` fail with `message`.
    pub fn fail_connect(&self, message: &str) -> &Self {
        *lock(&self.script.connect_error) = Some(message.to_string());
        self
    }

    /// Delay every handshake, widening race windows.
    pub fn connect_delay(&self, delay: Duration) -> &Self {
        *lock(&self.script.connect_delay) = Some(delay);
        self
    }

    /// Tools returned by `list_tools`.
    pub fn tools(&self, tools: Vec<Tool>) -> &Self {
        *lock(&self.script.tools) = tools;
        self
    }

    pub fn connect_count(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<CallToolParams> {
        lock(&self.script.calls).clone()
    }

    /// Calls issued to one tool.
    pub fn calls_to(&self, tool: &str) -> Vec<CallToolParams> {
        self.calls().into_iter().filter(|c| c.name == tool).collect()
    }
}

impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(&self) -> Result<ScriptedConnection> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.script.connect_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let error = lock(&self.script.connect_error).clone();
        if let Some(message) = error {
            return Err(Error::Transport(message));
        }
        Ok(ScriptedConnection {
            script: Arc::clone(&self.script),
        })
    }
}

pub struct ScriptedConnection {
    script: Arc<Script>,
}

impl Connection for ScriptedConnection {
    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult> {
        let name = params.name.clone();
        lock(&self.script.calls).push(params.clone());

        let matched = lock(&self.script.matched)
            .iter()
            .find(|m| m.tool == name && params.arguments.get(&m.key) == Some(&m.value))
            .map(|m| m.reply.clone());
        let reply = matched
            .or_else(|| lock(&self.script.replies).get(&name).cloned())
            .or_else(|| lock(&self.script.fallback).clone());
        match reply {
            Some(Reply::Result(result)) => Ok(result),
            Some(Reply::Fail(message)) => Err(Error::Transport(message)),
            None => Err(Error::Transport(format!("no scripted reply for {name}"))),
        }
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(lock(&self.script.tools).clone())
    }

    async fn close(&self) -> Result<()> {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
