//! MCP server — `Content-Length`-framed JSON-RPC 2.0 over a byte-stream
//! pair. Owns the transport, the three registries, and the terminal
//! shutdown flag.
//!
//! Protocol flow:
//! 1. Client sends `initialize` → server responds with capabilities
//! 2. Client sends `tools/list` / `resources/list` / `prompts/list` as needed
//! 3. Client sends `tools/call` / `resources/read` / `prompts/get`
//! 4. Client sends `shutdown` → server responds, then exits
//! 5. Or: client closes its output stream → server exits on end-of-stream

use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;

use crate::dispatcher::MethodDispatcher;
use crate::error::McpResult;
use crate::protocol::JsonRpcRequest;
use crate::registry::resources::FileResourceProvider;
use crate::registry::{tools, prompts, PromptRegistry, ResourceRegistry, SystemClock, ToolContext, ToolRegistry};
use crate::sandbox::{Sandbox, DEFAULT_MAX_LIST};
use crate::transport::{Frame, FramedTransport};

/// Configuration for the MCP server.
#[derive(Debug, Clone, Default)]
pub struct McpServerConfig {
    /// Workspace root for the file resource provider. `None` falls back to
    /// `EVA_MCP_WORKSPACE`, then the process working directory.
    pub workspace: Option<PathBuf>,
    /// Hard cap on `file:///` listing entries. `None` falls back to
    /// `EVA_MCP_MAX_LIST`, then 1000.
    pub max_list: Option<usize>,
}

fn resolve_max_list(configured: Option<usize>) -> usize {
    configured
        .or_else(|| {
            std::env::var(crate::sandbox::MAX_LIST_ENV)
                .ok()
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(DEFAULT_MAX_LIST)
}

fn build_dispatcher(config: &McpServerConfig) -> McpResult<MethodDispatcher> {
    let sandbox = Sandbox::new(config.workspace.clone())?;
    let max_list = resolve_max_list(config.max_list);

    let mut tool_registry = ToolRegistry::new();
    tools::register_builtins(&mut tool_registry);

    let mut resource_registry = ResourceRegistry::new();
    resource_registry.register(
        FileResourceProvider::definition(),
        FileResourceProvider::new(sandbox, max_list),
    );

    let mut prompt_registry = PromptRegistry::new();
    prompts::register_builtins(&mut prompt_registry);

    let tool_ctx = ToolContext::new(Arc::new(SystemClock));

    Ok(MethodDispatcher::new(
        tool_registry,
        resource_registry,
        prompt_registry,
        tool_ctx,
    ))
}

/// Run the MCP server loop to completion: `read → dispatch → write`,
/// terminating on end-of-stream or a dispatched `shutdown`.
///
/// # Errors
///
/// Returns an error if the sandbox workspace cannot be resolved, or if
/// the input/output streams fail with a genuine I/O error.
pub fn run_mcp_server<R: Read, W: Write>(config: McpServerConfig, input: R, output: W) -> McpResult<()> {
    info!("eva-mcp server starting");
    let dispatcher = build_dispatcher(&config)?;
    let mut transport = FramedTransport::new(input, output);

    loop {
        let frame = transport
            .read()
            .map_err(|source| crate::error::McpError::Io { path: PathBuf::from("<stream>"), source })?;

        let request: JsonRpcRequest = match frame {
            Frame::EndOfStream => {
                info!("input stream ended, shutting down");
                break;
            }
            Frame::Skip => continue,
            Frame::Message(request) => request,
        };

        let should_respond = request.id.is_some() || request.method == crate::protocol::INTERNAL_PARSE_ERROR_METHOD;
        let response = dispatcher.dispatch(&request);

        if should_respond {
            transport
                .write(&response)
                .map_err(|source| crate::error::McpError::Io { path: PathBuf::from("<stream>"), source })?;
        }

        if dispatcher.is_shutting_down() {
            info!("shutdown acknowledged, stopping");
            break;
        }
    }

    info!("eva-mcp server stopped");
    Ok(())
}
