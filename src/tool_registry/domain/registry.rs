//! Aggregated tool registry snapshot and its merge rules.

use super::{
    McpServerName, McpToolDefinition, ParseToolCollisionPolicyError, RegisteredTool,
    ToolRegistryDomainError,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Separator between server and tool name under
/// [`ToolCollisionPolicy::NamespacePrefix`].
pub const NAMESPACE_SEPARATOR: &str = "__";

/// How the registry resolves two servers exposing the same tool name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolCollisionPolicy {
    /// The server registered later replaces the earlier entry in place.
    #[default]
    LastWins,
    /// A collision fails the merge.
    Reject,
    /// Every tool is registered as `<server>__<tool>`.
    NamespacePrefix,
}

impl ToolCollisionPolicy {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LastWins => "last_wins",
            Self::Reject => "reject",
            Self::NamespacePrefix => "namespace_prefix",
        }
    }
}

impl fmt::Display for ToolCollisionPolicy {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ToolCollisionPolicy {
    type Error = ParseToolCollisionPolicyError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "last_wins" => Ok(Self::LastWins),
            "reject" => Ok(Self::Reject),
            "namespace_prefix" => Ok(Self::NamespacePrefix),
            _ => Err(ParseToolCollisionPolicyError(value.to_owned())),
        }
    }
}

/// Immutable snapshot mapping tool names to their definitions and servers.
///
/// Cloning is cheap; clones share the same storage. Iteration follows the
/// order in which names were first registered.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    inner: Arc<RegistryEntries>,
}

#[derive(Debug, Default)]
struct RegistryEntries {
    tools: Vec<RegisteredTool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Returns an empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Starts building a registry with the given collision policy.
    #[must_use]
    pub fn builder(policy: ToolCollisionPolicy) -> ToolRegistryBuilder {
        ToolRegistryBuilder::new(policy)
    }

    /// Looks up a tool by registered name.
    #[must_use]
    pub fn get(&self, tool_name: &str) -> Option<&RegisteredTool> {
        self.inner
            .index
            .get(tool_name)
            .and_then(|&position| self.inner.tools.get(position))
    }

    /// Returns whether a tool with the given name is registered.
    #[must_use]
    pub fn contains(&self, tool_name: &str) -> bool {
        self.inner.index.contains_key(tool_name)
    }

    /// Returns the server that provides the named tool.
    #[must_use]
    pub fn owning_server(&self, tool_name: &str) -> Option<&McpServerName> {
        self.get(tool_name).map(RegisteredTool::owning_server)
    }

    /// Returns the number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.tools.len()
    }

    /// Returns whether the registry holds no tools.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.tools.is_empty()
    }

    /// Iterates registered tools.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.inner.tools.iter()
    }

    /// Returns registered tool names in iteration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.inner.tools.iter().map(RegisteredTool::name).collect()
    }
}

/// Accumulates per-server tool catalogs into a [`ToolRegistry`].
#[derive(Debug)]
pub struct ToolRegistryBuilder {
    policy: ToolCollisionPolicy,
    entries: RegistryEntries,
}

impl ToolRegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(policy: ToolCollisionPolicy) -> Self {
        Self {
            policy,
            entries: RegistryEntries::default(),
        }
    }

    /// Registers every tool of one server's catalog.
    ///
    /// Catalogs must be registered in configuration order: under
    /// [`ToolCollisionPolicy::LastWins`] the later call replaces earlier
    /// entries of the same name.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::ToolNameCollision`] under
    /// [`ToolCollisionPolicy::Reject`] when a name is already registered, and
    /// under [`ToolCollisionPolicy::NamespacePrefix`] when two servers
    /// produce the same prefixed name (server `a` with tool `b__c` and
    /// server `a__b` with tool `c`).
    pub fn register_catalog(
        &mut self,
        server: &McpServerName,
        tools: impl IntoIterator<Item = McpToolDefinition>,
    ) -> Result<&mut Self, ToolRegistryDomainError> {
        for definition in tools {
            let registered = match self.policy {
                ToolCollisionPolicy::NamespacePrefix => {
                    let prefixed =
                        format!("{server}{NAMESPACE_SEPARATOR}{}", definition.name());
                    definition.renamed(prefixed)
                }
                ToolCollisionPolicy::LastWins | ToolCollisionPolicy::Reject => definition,
            };
            self.insert(RegisteredTool::new(registered, server.clone()))?;
        }
        Ok(self)
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            inner: Arc::new(self.entries),
        }
    }

    fn insert(&mut self, tool: RegisteredTool) -> Result<(), ToolRegistryDomainError> {
        let Some(&position) = self.entries.index.get(tool.name()) else {
            self.entries
                .index
                .insert(tool.name().to_owned(), self.entries.tools.len());
            self.entries.tools.push(tool);
            return Ok(());
        };
        let Some(previous) = self.entries.tools.get_mut(position) else {
            return Ok(());
        };

        let ambiguous_prefix = self.policy == ToolCollisionPolicy::NamespacePrefix
            && previous.owning_server() != tool.owning_server();
        if self.policy == ToolCollisionPolicy::Reject || ambiguous_prefix {
            return Err(ToolRegistryDomainError::ToolNameCollision {
                tool: tool.name().to_owned(),
                existing_server: previous.owning_server().clone(),
                incoming_server: tool.owning_server().clone(),
            });
        }

        tracing::debug!(
            tool = tool.name(),
            replaced_server = %previous.owning_server(),
            server = %tool.owning_server(),
            "tool name collision; later server wins"
        );
        *previous = tool;
        Ok(())
    }
}
