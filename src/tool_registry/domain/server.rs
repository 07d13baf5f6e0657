//! MCP server specifications and the ordered set handed to a manager.

use super::{McpServerName, StdioTransportConfig, ToolRegistryDomainError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Immutable launch specification for one configured MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerSpec {
    name: McpServerName,
    transport: StdioTransportConfig,
}

impl McpServerSpec {
    /// Creates a server specification.
    #[must_use]
    pub const fn new(name: McpServerName, transport: StdioTransportConfig) -> Self {
        Self { name, transport }
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &McpServerName {
        &self.name
    }

    /// Returns the process launch settings.
    #[must_use]
    pub const fn transport(&self) -> &StdioTransportConfig {
        &self.transport
    }
}

/// Ordered collection of server specifications with unique names.
///
/// Iteration order is insertion order. It decides which server wins when two
/// servers expose a tool with the same name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpServersConfig {
    servers: Vec<McpServerSpec>,
}

impl McpServersConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            servers: Vec::new(),
        }
    }

    /// Builds a configuration from specifications in order.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::DuplicateServerName`] when two
    /// specifications share a name.
    pub fn from_specs(
        specs: impl IntoIterator<Item = McpServerSpec>,
    ) -> Result<Self, ToolRegistryDomainError> {
        let mut config = Self::new();
        for spec in specs {
            config.push(spec)?;
        }
        Ok(config)
    }

    /// Appends a specification.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::DuplicateServerName`] when a server
    /// with the same name is already present.
    pub fn push(&mut self, spec: McpServerSpec) -> Result<(), ToolRegistryDomainError> {
        if self.get(spec.name()).is_some() {
            return Err(ToolRegistryDomainError::DuplicateServerName(
                spec.name().clone(),
            ));
        }
        self.servers.push(spec);
        Ok(())
    }

    /// Finds a specification by name.
    #[must_use]
    pub fn get(&self, name: &McpServerName) -> Option<&McpServerSpec> {
        self.servers.iter().find(|spec| spec.name() == name)
    }

    /// Returns the number of configured servers.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.servers.len()
    }

    /// Returns whether no servers are configured.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    /// Iterates specifications in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &McpServerSpec> {
        self.servers.iter()
    }

    /// Returns the server names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<McpServerName> {
        self.servers.iter().map(|spec| spec.name().clone()).collect()
    }

    pub(crate) fn has_unique_names(&self) -> bool {
        let mut seen = HashSet::new();
        self.servers.iter().all(|spec| seen.insert(spec.name()))
    }
}

impl IntoIterator for McpServersConfig {
    type Item = McpServerSpec;
    type IntoIter = std::vec::IntoIter<McpServerSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.servers.into_iter()
    }
}
