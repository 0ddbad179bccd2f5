//! Error types for the eva-mcp crate.

use std::path::PathBuf;

/// Core error types. Each variant maps to a JSON-RPC error at the
/// dispatcher boundary (see [`crate::dispatcher`]); none of them ever
/// escape the server loop unhandled.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// A resolved path fell outside the sandbox workspace root.
    #[error("path escapes workspace: {path}")]
    PathOutsideWorkspace { path: PathBuf },

    /// A sandboxed read targeted something other than a regular file.
    #[error("not a file: {path}")]
    NotAFile { path: PathBuf },

    /// No resource definition matched the requested URI.
    #[error("resource not found: {uri}")]
    ResourceNotFound { uri: String },

    /// No prompt definition matched the requested name.
    #[error("prompt not found: {name}")]
    PromptNotFound { name: String },

    /// A request parameter the handler requires was absent.
    #[error("{0} required")]
    MissingParam(&'static str),

    /// I/O error with the path that triggered it attached for logging.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encode/decode failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience result type for eva-mcp core operations.
pub type McpResult<T> = Result<T, McpError>;
