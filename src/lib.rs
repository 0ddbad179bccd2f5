//! `eva-mcp` — a Model Context Protocol server.
//!
//! Speaks JSON-RPC 2.0, `Content-Length`-framed, over a byte-stream pair
//! (stdio by default). Exposes three capability surfaces — tools,
//! resources, prompts — backed by in-memory registries, plus a sandboxed
//! workspace filesystem provider for the `file:` resource scheme.
//!
//! # Architecture
//!
//! ```text
//! stdin (Content-Length framed JSON-RPC) → FramedTransport → MethodDispatcher
//!                                                                  ↓
//!                                        ToolRegistry / ResourceRegistry / PromptRegistry
//!                                                                  ↓ (file:///)
//!                                                              Sandbox
//! stdout (Content-Length framed JSON-RPC) ←──────────────────────────┘
//! ```

pub mod dispatcher;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod sandbox;
pub mod server;
pub mod transport;

pub use error::{McpError, McpResult};
pub use server::{run_mcp_server, McpServerConfig};
