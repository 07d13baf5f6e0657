//! Domain model for MCP server connections and tool aggregation.
//!
//! The tool registry domain models MCP server identity, launch
//! configuration, per-connection lifecycle states, discovered tool metadata
//! and the merged registry snapshot. Process and transport concerns remain
//! outside this boundary.

mod connection;
mod error;
mod ids;
mod registry;
mod server;
mod tool;
mod transport;

pub use connection::{ConnectionLifecycle, ConnectionSnapshot, ConnectionState};
pub use error::{ParseToolCollisionPolicyError, ToolRegistryDomainError};
pub use ids::{ConnectionSlot, McpServerName};
pub use registry::{NAMESPACE_SEPARATOR, ToolCollisionPolicy, ToolRegistry, ToolRegistryBuilder};
pub use server::{McpServerSpec, McpServersConfig};
pub use tool::{McpToolDefinition, RegisteredTool};
pub use transport::StdioTransportConfig;
