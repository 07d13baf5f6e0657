//! Adapter implementations for the MCP client ports.

pub mod stdio;

mod runtime;

pub use runtime::{InMemoryMcpClient, InMemoryMcpConnector};
