//! STDIO transport adapter: MCP servers as child processes speaking
//! newline-delimited JSON-RPC 2.0.

mod client;
mod connector;
mod jsonrpc;

pub use client::StdioMcpClient;
pub use connector::{DEFAULT_REQUEST_TIMEOUT, StdioMcpConnector};
