//! Method dispatcher: maps JSON-RPC method names to registry operations
//! and tracks the terminal shutdown transition.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Deserialize;
use tracing::{error, info};

use crate::error::McpError;
use crate::protocol::{self, error_code, JsonRpcRequest, JsonRpcResponse};
use crate::registry::{PromptRegistry, ResourceRegistry, ToolContext, ToolRegistry};

const PROTOCOL_VERSION: &str = "2024-11-01";

/// Owns the three registries and the shutdown flag, and turns one request
/// into one response. Holds no transport state — the server loop
/// decides what to do with the result.
pub struct MethodDispatcher {
    tools: ToolRegistry,
    resources: ResourceRegistry,
    prompts: PromptRegistry,
    tool_ctx: ToolContext,
    shutting_down: AtomicBool,
    server_name: String,
    server_version: String,
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
}

#[derive(Deserialize)]
struct ResourceReadParams {
    uri: Option<String>,
}

#[derive(Deserialize)]
struct PromptGetParams {
    name: Option<String>,
    #[serde(default)]
    variables: serde_json::Value,
}

impl MethodDispatcher {
    #[must_use]
    pub fn new(
        tools: ToolRegistry,
        resources: ResourceRegistry,
        prompts: PromptRegistry,
        tool_ctx: ToolContext,
    ) -> Self {
        Self {
            tools,
            resources,
            prompts,
            tool_ctx,
            shutting_down: AtomicBool::new(false),
            server_name: "eva-mcp".to_owned(),
            server_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Whether `shutdown` has been dispatched. Once true the server loop
    /// must not issue another `read`.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }

    /// Dispatch one request to its handler and build the response. The
    /// caller (the server loop) decides whether a notification's response
    /// is actually written to the wire.
    pub fn dispatch(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "shutdown" => self.handle_shutdown(id),
            "tools/list" => self.handle_tools_list(id),
            "tools/call" => self.handle_tools_call(id, &request.params),
            "resources/list" => self.handle_resources_list(id),
            "resources/read" => self.handle_resources_read(id, &request.params),
            "prompts/list" => self.handle_prompts_list(id),
            "prompts/get" => self.handle_prompts_get(id, &request.params),
            protocol::INTERNAL_PARSE_ERROR_METHOD => self.handle_parse_error(id, &request.params),
            other => {
                JsonRpcResponse::failure_with_data(
                    id,
                    error_code::METHOD_NOT_FOUND,
                    "Method not found",
                    Some(serde_json::json!({ "method": other })),
                )
            }
        }
    }

    fn handle_initialize(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        info!("initialize");
        JsonRpcResponse::success(
            id,
            serde_json::json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                },
                "capabilities": {
                    "tools": { "list": true, "call": true },
                    "resources": { "list": true, "read": true, "supportedSchemes": ["file"] },
                    "prompts": { "list": true, "get": true },
                }
            }),
        )
    }

    fn handle_shutdown(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        info!("shutdown requested");
        self.shutting_down.store(true, Ordering::SeqCst);
        JsonRpcResponse::success(id, serde_json::Value::Null)
    }

    fn handle_tools_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({ "tools": self.tools.list() }))
    }

    fn handle_tools_call(&self, id: Option<serde_json::Value>, params: &serde_json::Value) -> JsonRpcResponse {
        let parsed: ToolCallParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => return self.server_error(id, format!("invalid tools/call params: {e}")),
        };

        let result = self.tools.call(&parsed.name, parsed.arguments, &self.tool_ctx);
        match serde_json::to_value(&result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.server_error(id, format!("failed to serialize tool result: {e}")),
        }
    }

    fn handle_resources_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({ "resources": self.resources.list() }))
    }

    fn handle_resources_read(&self, id: Option<serde_json::Value>, params: &serde_json::Value) -> JsonRpcResponse {
        let parsed: ResourceReadParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => return self.server_error(id, format!("invalid resources/read params: {e}")),
        };
        let Some(uri) = parsed.uri else {
            return self.server_error(id, McpError::MissingParam("uri").to_string());
        };

        match self.resources.read(&uri) {
            Ok(content) => match serde_json::to_value(&content) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => self.server_error(id, format!("failed to serialize resource: {e}")),
            },
            Err(e) => {
                error!(error = %e, "resources/read failed");
                self.server_error(id, e.to_string())
            }
        }
    }

    fn handle_prompts_list(&self, id: Option<serde_json::Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, serde_json::json!({ "prompts": self.prompts.list() }))
    }

    fn handle_prompts_get(&self, id: Option<serde_json::Value>, params: &serde_json::Value) -> JsonRpcResponse {
        let parsed: PromptGetParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => return self.server_error(id, format!("invalid prompts/get params: {e}")),
        };
        let Some(name) = parsed.name else {
            return self.server_error(id, McpError::MissingParam("name").to_string());
        };

        match self.prompts.get(&name, &parsed.variables) {
            Ok(rendered) => JsonRpcResponse::success(id, serde_json::json!({ "prompt": rendered })),
            Err(e) => {
                error!(error = %e, "prompts/get failed");
                self.server_error(id, e.to_string())
            }
        }
    }

    fn handle_parse_error(&self, id: Option<serde_json::Value>, params: &serde_json::Value) -> JsonRpcResponse {
        JsonRpcResponse::failure_with_data(
            id,
            error_code::PARSE_ERROR,
            "Parse error",
            Some(params.clone()),
        )
    }

    fn server_error(&self, id: Option<serde_json::Value>, message: impl Into<String>) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, error_code::SERVER_ERROR, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::tools::register_builtins as register_tools;
    use crate::registry::prompts::register_builtins as register_prompts;

    fn dispatcher() -> MethodDispatcher {
        let mut tools = ToolRegistry::new();
        register_tools(&mut tools);
        let mut prompts = PromptRegistry::new();
        register_prompts(&mut prompts);
        MethodDispatcher::new(tools, ResourceRegistry::new(), prompts, ToolContext::default())
    }

    fn req(id: Option<serde_json::Value>, method: &str, params: serde_json::Value) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".to_owned(),
            id,
            method: method.to_owned(),
            params,
        }
    }

    #[test]
    fn initialize_reports_capabilities() {
        let d = dispatcher();
        let resp = d.dispatch(&req(Some(serde_json::json!(1)), "initialize", serde_json::json!({})));
        assert_eq!(resp.id, Some(serde_json::json!(1)));
        let result = resp.result.expect("result");
        assert_eq!(result["capabilities"]["tools"]["list"], true);
    }

    #[test]
    fn shutdown_sets_terminal_flag() {
        let d = dispatcher();
        assert!(!d.is_shutting_down());
        let resp = d.dispatch(&req(Some(serde_json::json!(2)), "shutdown", serde_json::json!({})));
        assert!(resp.error.is_none());
        assert!(d.is_shutting_down());
    }

    #[test]
    fn unknown_tool_call_is_success_with_is_error_flag() {
        let d = dispatcher();
        let resp = d.dispatch(&req(
            Some(serde_json::json!(1)),
            "tools/call",
            serde_json::json!({"name": "nope", "arguments": {}}),
        ));
        assert!(resp.error.is_none());
        let result = resp.result.expect("result");
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"].as_str().expect("text").contains("Tool not found"));
    }

    #[test]
    fn resources_read_missing_uri_is_server_error() {
        let d = dispatcher();
        let resp = d.dispatch(&req(Some(serde_json::json!(2)), "resources/read", serde_json::json!({})));
        let err = resp.error.expect("error");
        assert_eq!(err.code, error_code::SERVER_ERROR);
        assert!(err.message.contains("uri required"));
    }

    #[test]
    fn prompts_get_missing_name_is_server_error() {
        let d = dispatcher();
        let resp = d.dispatch(&req(Some(serde_json::json!(2)), "prompts/get", serde_json::json!({})));
        let err = resp.error.expect("error");
        assert_eq!(err.code, error_code::SERVER_ERROR);
        assert!(err.message.contains("name required"));
    }

    #[test]
    fn unknown_method_is_method_not_found() {
        let d = dispatcher();
        let resp = d.dispatch(&req(Some(serde_json::json!(3)), "unknown/method", serde_json::json!({})));
        let err = resp.error.expect("error");
        assert_eq!(err.code, error_code::METHOD_NOT_FOUND);
    }

    #[test]
    fn parse_error_sentinel_becomes_dash_32700() {
        let d = dispatcher();
        let resp = d.dispatch(&req(
            None,
            protocol::INTERNAL_PARSE_ERROR_METHOD,
            serde_json::json!({"message": "unexpected token"}),
        ));
        let err = resp.error.expect("error");
        assert_eq!(err.code, error_code::PARSE_ERROR);
        assert!(resp.id.is_none());
    }

    #[test]
    fn echo_round_trips() {
        let d = dispatcher();
        let resp = d.dispatch(&req(
            Some(serde_json::json!(2)),
            "tools/call",
            serde_json::json!({"name": "echo", "arguments": {"text": "hi"}}),
        ));
        let result = resp.result.expect("result");
        assert_eq!(result["content"][0]["text"], "hi");
    }
}
