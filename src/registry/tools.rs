//! Tool registry: named, JSON-schema-described operations a client may
//! invoke via `tools/call`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::protocol::{ContentItem, ToolCallResult, ToolDefinition};

/// The clock a tool handler reads from. Abstracted behind a trait object
/// so tests can inject a fixed instant instead of the wall clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

/// The real clock, returning an RFC 3339 UTC timestamp.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_owned())
    }
}

/// Per-call context passed to every tool handler.
pub struct ToolContext {
    clock: Arc<dyn Clock>,
}

impl ToolContext {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    #[must_use]
    pub fn now(&self) -> String {
        self.clock.now()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

/// A tool's executable half. Handlers never fail at the JSON-RPC level —
/// internal problems are reported as `ToolCallResult { is_error: true }`
/// instead, a tool-level error rather than a JSON-RPC one.
pub trait ToolHandler: Send + Sync {
    fn call(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolCallResult;
}

impl<F> ToolHandler for F
where
    F: Fn(serde_json::Value, &ToolContext) -> ToolCallResult + Send + Sync,
{
    fn call(&self, arguments: serde_json::Value, ctx: &ToolContext) -> ToolCallResult {
        self(arguments, ctx)
    }
}

struct Entry {
    definition: ToolDefinition,
    handler: Box<dyn ToolHandler>,
}

/// In-memory tool index. Registration keys are unique; re-registering a
/// name silently replaces the previous definition and handler — this is
/// how built-ins are customized.
#[derive(Default)]
pub struct ToolRegistry {
    entries: HashMap<String, Entry>,
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition, handler: impl ToolHandler + 'static) {
        self.entries.insert(
            definition.name.clone(),
            Entry {
                definition,
                handler: Box::new(handler),
            },
        );
    }

    /// A snapshot of all registered tool definitions.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.entries.values().map(|e| e.definition.clone()).collect()
    }

    /// Invoke `name` with `arguments`. An unknown name is not a dispatch
    /// failure: it returns a graceful `isError` result.
    #[must_use]
    pub fn call(&self, name: &str, arguments: serde_json::Value, ctx: &ToolContext) -> ToolCallResult {
        match self.entries.get(name) {
            Some(entry) => entry.handler.call(arguments, ctx),
            None => ToolCallResult {
                content: vec![ContentItem::text(format!("Tool not found: {name}"))],
                is_error: true,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Built-in demonstration tools, registered so the protocol surface is
// non-empty at startup.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Default)]
struct PingParams {
    message: Option<String>,
}

pub fn ping_definition() -> ToolDefinition {
    ToolDefinition {
        name: "ping".to_owned(),
        description: Some("Echo a message back, or \"pong\" if none is given.".to_owned()),
        input_schema: Some(serde_json::json!({
            "type": "object",
            "properties": {
                "message": { "type": "string" }
            }
        })),
    }
}

pub fn ping_handler(arguments: serde_json::Value, _ctx: &ToolContext) -> ToolCallResult {
    let params: PingParams = serde_json::from_value(arguments).unwrap_or_default();
    ToolCallResult::ok(params.message.unwrap_or_else(|| "pong".to_owned()))
}

#[derive(Debug, Deserialize)]
struct EchoParams {
    text: String,
}

pub fn echo_definition() -> ToolDefinition {
    ToolDefinition {
        name: "echo".to_owned(),
        description: Some("Return the given text unchanged.".to_owned()),
        input_schema: Some(serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string" }
            },
            "required": ["text"]
        })),
    }
}

pub fn echo_handler(arguments: serde_json::Value, _ctx: &ToolContext) -> ToolCallResult {
    match serde_json::from_value::<EchoParams>(arguments) {
        Ok(params) => ToolCallResult::ok(params.text),
        Err(e) => ToolCallResult::error(format!("invalid echo arguments: {e}")),
    }
}

pub fn time_definition() -> ToolDefinition {
    ToolDefinition {
        name: "time".to_owned(),
        description: Some("Return the current instant as an ISO-8601 timestamp.".to_owned()),
        input_schema: Some(serde_json::json!({
            "type": "object",
            "properties": {}
        })),
    }
}

pub fn time_handler(_arguments: serde_json::Value, ctx: &ToolContext) -> ToolCallResult {
    ToolCallResult::ok(ctx.now())
}

/// Register `ping`, `echo`, and `time` into `registry`.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(ping_definition(), ping_handler);
    registry.register(echo_definition(), echo_handler);
    registry.register(time_definition(), time_handler);
}
