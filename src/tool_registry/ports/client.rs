//! Transport port for establishing and using MCP server connections.

use crate::tool_registry::domain::{McpServerSpec, McpToolDefinition};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Result type for MCP client operations.
pub type McpClientResult<T> = Result<T, McpClientError>;

/// Establishes connections to MCP servers.
///
/// `connect` covers process launch and the protocol handshake. A returned
/// client is ready for tool queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait McpClientConnector: Send + Sync {
    /// Launches the server and completes the handshake.
    async fn connect(&self, spec: &McpServerSpec) -> McpClientResult<Arc<dyn McpClient>>;
}

/// An established connection to one MCP server.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait McpClient: Send + Sync {
    /// Lists every tool the server exposes.
    async fn list_tools(&self) -> McpClientResult<Vec<McpToolDefinition>>;

    /// Terminates the connection and its server process.
    async fn close(&self) -> McpClientResult<()>;
}

/// Errors returned by MCP client adapters.
#[derive(Debug, Clone, Error)]
pub enum McpClientError {
    /// The server process could not be spawned.
    #[error("failed to spawn MCP server command '{command}': {source}")]
    Spawn {
        /// Command that failed to launch.
        command: String,
        /// Underlying I/O failure.
        source: Arc<std::io::Error>,
    },

    /// The server answered the handshake with something unusable.
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    /// A message violated the JSON-RPC or MCP protocol.
    #[error("MCP protocol error: {0}")]
    Protocol(String),

    /// The server returned a JSON-RPC error object.
    #[error("MCP server returned error {code}: {message}")]
    Remote {
        /// JSON-RPC error code.
        code: i64,
        /// Error message from the server.
        message: String,
    },

    /// An operation did not finish in time.
    #[error("MCP {operation} timed out after {after:?}")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
        /// Configured limit.
        after: Duration,
    },

    /// The server closed its output stream.
    #[error("MCP server closed the connection")]
    ConnectionClosed,

    /// Generic runtime failure.
    #[error("MCP client runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl McpClientError {
    /// Wraps a spawn failure for `command`.
    pub fn spawn(command: impl Into<String>, err: std::io::Error) -> Self {
        Self::Spawn {
            command: command.into(),
            source: Arc::new(err),
        }
    }

    /// Wraps a runtime error from the adapter.
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
