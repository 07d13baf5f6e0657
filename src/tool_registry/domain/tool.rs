//! MCP tool definition value objects.

use super::{McpServerName, ToolRegistryDomainError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Canonical metadata for a tool exposed by an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpToolDefinition {
    name: String,
    description: Option<String>,
    input_schema: Value,
    output_schema: Option<Value>,
}

impl McpToolDefinition {
    /// Creates a tool definition with required fields.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::EmptyToolName`] when the name is
    /// empty after trimming.
    pub fn new(name: impl Into<String>, input_schema: Value) -> Result<Self, ToolRegistryDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(ToolRegistryDomainError::EmptyToolName);
        }

        Ok(Self {
            name: normalized_name,
            description: None,
            input_schema,
            output_schema: None,
        })
    }

    /// Sets a human-readable description. Blank descriptions are dropped.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let normalized = description.into().trim().to_owned();
        self.description = (!normalized.is_empty()).then_some(normalized);
        self
    }

    /// Sets an optional output schema.
    #[must_use]
    pub fn with_output_schema(mut self, output_schema: Value) -> Self {
        self.output_schema = Some(output_schema);
        self
    }

    /// Returns a copy registered under a different name.
    #[must_use]
    pub(crate) fn renamed(&self, name: String) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the tool description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the input schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }

    /// Returns the optional output schema.
    #[must_use]
    pub const fn output_schema(&self) -> Option<&Value> {
        self.output_schema.as_ref()
    }
}

/// A tool definition together with the server that provides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredTool {
    definition: McpToolDefinition,
    owning_server: McpServerName,
}

impl RegisteredTool {
    /// Associates a tool definition with its server.
    #[must_use]
    pub const fn new(definition: McpToolDefinition, owning_server: McpServerName) -> Self {
        Self {
            definition,
            owning_server,
        }
    }

    /// Returns the registered tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    /// Returns the tool definition.
    #[must_use]
    pub const fn definition(&self) -> &McpToolDefinition {
        &self.definition
    }

    /// Returns the server that provides the tool.
    #[must_use]
    pub const fn owning_server(&self) -> &McpServerName {
        &self.owning_server
    }
}
