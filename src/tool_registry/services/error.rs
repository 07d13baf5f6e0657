//! Errors surfaced by the connection manager.

use crate::tool_registry::{
    domain::{McpServerName, ToolRegistryDomainError},
    ports::McpClientError,
};
use thiserror::Error;

/// A server whose process launch or handshake failed.
#[derive(Debug, Clone, Error)]
#[error("failed to connect to MCP server {server}: {source}")]
pub struct ConnectionEstablishmentError {
    /// Server that failed to connect.
    pub server: McpServerName,
    /// Transport failure.
    pub source: McpClientError,
}

/// Why one server contributed no tools to an aggregation.
#[derive(Debug, Clone, Error)]
pub enum ProviderFailure {
    /// The connection was never established.
    #[error(transparent)]
    Establish(#[from] ConnectionEstablishmentError),

    /// The server was connected but listing its tools failed.
    #[error("failed to list tools of MCP server {server}: {source}")]
    ListTools {
        /// Server whose query failed.
        server: McpServerName,
        /// Transport failure.
        source: McpClientError,
    },
}

impl ProviderFailure {
    /// Returns the server the failure belongs to.
    #[must_use]
    pub const fn server(&self) -> &McpServerName {
        match self {
            Self::Establish(error) => &error.server,
            Self::ListTools { server, .. } => server,
        }
    }
}

/// Aggregation aborted because at least one server failed.
#[derive(Debug, Clone, Error)]
#[error("tool aggregation failed for MCP servers: {}", join_servers(.failures.iter().map(ProviderFailure::server)))]
pub struct AggregationError {
    /// Every failure observed, in configuration order.
    pub failures: Vec<ProviderFailure>,
}

/// One server whose close operation failed.
#[derive(Debug, Clone, Error)]
#[error("failed to close MCP server {server}: {source}")]
pub struct CloseFailure {
    /// Server that failed to close cleanly.
    pub server: McpServerName,
    /// Transport failure.
    pub source: McpClientError,
}

/// Closing the manager finished, but some connections did not close cleanly.
///
/// Every other connection was still closed.
#[derive(Debug, Clone, Error)]
#[error("failed to close MCP servers: {}", join_servers(.failures.iter().map(|failure| &failure.server)))]
pub struct CloseError {
    /// Every close failure, in configuration order.
    pub failures: Vec<CloseFailure>,
}

impl CloseError {
    /// Returns the names of servers that failed to close.
    #[must_use]
    pub fn servers(&self) -> Vec<&McpServerName> {
        self.failures.iter().map(|failure| &failure.server).collect()
    }
}

/// Errors returned by tool aggregation.
#[derive(Debug, Clone, Error)]
pub enum McpConnectionManagerError {
    /// One or more servers failed; no registry was produced.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    /// Merging catalogs violated the collision policy.
    #[error(transparent)]
    Registry(#[from] ToolRegistryDomainError),
}

fn join_servers<'a>(servers: impl Iterator<Item = &'a McpServerName>) -> String {
    servers
        .map(McpServerName::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(raw: &str) -> McpServerName {
        McpServerName::new(raw).expect("valid server name")
    }

    #[test]
    fn aggregation_error_lists_servers() {
        let error = AggregationError {
            failures: vec![
                ConnectionEstablishmentError {
                    server: name("filesystem"),
                    source: McpClientError::ConnectionClosed,
                }
                .into(),
                ProviderFailure::ListTools {
                    server: name("search"),
                    source: McpClientError::Protocol("bad page".to_owned()),
                },
            ],
        };

        assert_eq!(
            error.to_string(),
            "tool aggregation failed for MCP servers: filesystem, search"
        );
    }

    #[test]
    fn close_error_names_failed_servers() {
        let error = CloseError {
            failures: vec![CloseFailure {
                server: name("filesystem"),
                source: McpClientError::ConnectionClosed,
            }],
        };

        assert_eq!(error.servers(), [&name("filesystem")]);
        assert_eq!(error.to_string(), "failed to close MCP servers: filesystem");
    }
}
