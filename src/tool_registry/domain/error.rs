//! Error types for tool registry domain validation and parsing.

use super::McpServerName;
use thiserror::Error;

/// Errors returned while constructing tool registry domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolRegistryDomainError {
    /// The server name is empty after trimming.
    #[error("MCP server name must not be empty")]
    EmptyServerName,

    /// The server name contains characters outside `[A-Za-z0-9_.-]`.
    #[error(
        "MCP server name '{0}' contains invalid characters (only alphanumeric, '_', '-' and '.' allowed)"
    )]
    InvalidServerName(String),

    /// The server name exceeds the 100-character limit.
    #[error("MCP server name exceeds 100 character limit: {0}")]
    ServerNameTooLong(String),

    /// Two configured servers share a name.
    #[error("duplicate MCP server name in configuration: {0}")]
    DuplicateServerName(McpServerName),

    /// The STDIO command is empty.
    #[error("STDIO command must not be empty")]
    EmptyStdioCommand,

    /// The STDIO working directory is empty after trimming.
    #[error("STDIO working directory must not be empty when provided")]
    EmptyWorkingDirectory,

    /// A tool definition name is empty after trimming.
    #[error("tool name must not be empty")]
    EmptyToolName,

    /// Two servers expose a tool with the same name under the `reject`
    /// collision policy.
    #[error("tool '{tool}' is exposed by both MCP server {existing_server} and {incoming_server}")]
    ToolNameCollision {
        /// Colliding tool name.
        tool: String,
        /// Server that registered the tool first.
        existing_server: McpServerName,
        /// Server whose registration collided.
        incoming_server: McpServerName,
    },

    /// Transitioning between two connection states is invalid.
    #[error("invalid connection transition for MCP server {server}: {from} -> {to}")]
    InvalidConnectionTransition {
        /// Server whose connection was being transitioned.
        server: McpServerName,
        /// Current connection state.
        from: String,
        /// Requested target connection state.
        to: String,
    },
}

/// Error returned while parsing a collision policy from its string form.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown tool collision policy: {0}")]
pub struct ParseToolCollisionPolicyError(pub String);
