//! Authorization requests and decisions for tool calls.

use super::ToolInvocationRequest;
use crate::tool_registry::domain::McpServerName;
use serde_json::Value;

/// What the operator is asked to approve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    invocation: ToolInvocationRequest,
    owning_server: Option<McpServerName>,
}

impl AuthorizationRequest {
    /// Creates a request for an invocation.
    ///
    /// `owning_server` is `None` when the tool is not in the registry.
    #[must_use]
    pub const fn new(invocation: ToolInvocationRequest, owning_server: Option<McpServerName>) -> Self {
        Self {
            invocation,
            owning_server,
        }
    }

    /// Returns the tool name.
    #[must_use]
    pub fn tool_name(&self) -> &str {
        &self.invocation.tool_name
    }

    /// Returns the call identifier.
    #[must_use]
    pub fn call_id(&self) -> &str {
        &self.invocation.call_id
    }

    /// Returns the invocation arguments.
    #[must_use]
    pub const fn arguments(&self) -> &Value {
        &self.invocation.arguments
    }

    /// Returns the server that provides the tool, if known.
    #[must_use]
    pub const fn owning_server(&self) -> Option<&McpServerName> {
        self.owning_server.as_ref()
    }

    /// Returns the underlying invocation.
    #[must_use]
    pub const fn invocation(&self) -> &ToolInvocationRequest {
        &self.invocation
    }
}

/// The operator's answer to an [`AuthorizationRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorizationDecision {
    /// The tool call may proceed.
    Approved,
    /// The tool call must not run.
    Denied,
}

impl AuthorizationDecision {
    /// Returns whether the call was approved.
    #[must_use]
    pub const fn is_approved(self) -> bool {
        matches!(self, Self::Approved)
    }
}

impl From<bool> for AuthorizationDecision {
    fn from(approved: bool) -> Self {
        if approved { Self::Approved } else { Self::Denied }
    }
}
