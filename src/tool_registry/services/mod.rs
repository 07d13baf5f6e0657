//! Application services for MCP connection management and tool aggregation.

mod error;
mod manager;

#[cfg(test)]
mod manager_tests;

pub use error::{
    AggregationError, CloseError, CloseFailure, ConnectionEstablishmentError,
    McpConnectionManagerError, ProviderFailure,
};
pub use manager::{McpConnectionManager, McpConnectionManagerResult, ToolAggregation};
