//! Port contracts for MCP server connections.

mod client;

pub use client::{McpClient, McpClientConnector, McpClientError, McpClientResult};

#[cfg(test)]
pub use client::{MockMcpClient, MockMcpClientConnector};
