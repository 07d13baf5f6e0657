//! Connection lifecycle state for a single MCP server.

use super::{McpServerName, ToolRegistryDomainError};
use chrono::{DateTime, Utc};
use mockable::Clock;
use std::fmt;

/// Lifecycle state of a connection to an MCP server.
///
/// `Pending` moves to `Ready` or `Failed` exactly once, and `Ready` moves to
/// `Closed` exactly once. `Failed` and `Closed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Process launch and handshake are in flight.
    Pending,
    /// Handshake completed; tools can be queried.
    Ready,
    /// Launch or handshake failed.
    Failed,
    /// Connection was closed.
    Closed,
}

impl ConnectionState {
    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Closed => "closed",
        }
    }

    /// Returns whether this state allows querying tools.
    #[must_use]
    pub const fn can_query_tools(self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Returns whether transition to `target` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Ready | Self::Failed) | (Self::Ready, Self::Closed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Mutable lifecycle record of one connection, owned by its manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionLifecycle {
    server: McpServerName,
    state: ConnectionState,
    failure: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConnectionLifecycle {
    /// Creates a lifecycle record in the `pending` state.
    #[must_use]
    pub fn pending(server: McpServerName, clock: &impl Clock) -> Self {
        let timestamp = clock.utc();
        Self {
            server,
            state: ConnectionState::Pending,
            failure: None,
            created_at: timestamp,
            updated_at: timestamp,
        }
    }

    /// Returns the server this lifecycle belongs to.
    #[must_use]
    pub const fn server(&self) -> &McpServerName {
        &self.server
    }

    /// Returns the current state.
    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Marks the handshake as complete.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidConnectionTransition`] when
    /// the connection is not pending.
    pub fn mark_ready(&mut self, clock: &impl Clock) -> Result<(), ToolRegistryDomainError> {
        self.transition_to(ConnectionState::Ready, clock)
    }

    /// Marks establishment as failed and records the reason.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidConnectionTransition`] when
    /// the connection is not pending.
    pub fn mark_failed(
        &mut self,
        reason: impl Into<String>,
        clock: &impl Clock,
    ) -> Result<(), ToolRegistryDomainError> {
        self.transition_to(ConnectionState::Failed, clock)?;
        self.failure = Some(reason.into());
        Ok(())
    }

    /// Marks the connection as closed.
    ///
    /// # Errors
    ///
    /// Returns [`ToolRegistryDomainError::InvalidConnectionTransition`] when
    /// the connection is not ready.
    pub fn mark_closed(&mut self, clock: &impl Clock) -> Result<(), ToolRegistryDomainError> {
        self.transition_to(ConnectionState::Closed, clock)
    }

    /// Returns an immutable snapshot for diagnostics.
    #[must_use]
    pub fn snapshot(&self) -> ConnectionSnapshot {
        ConnectionSnapshot {
            server: self.server.clone(),
            state: self.state,
            failure: self.failure.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    fn transition_to(
        &mut self,
        target_state: ConnectionState,
        clock: &impl Clock,
    ) -> Result<(), ToolRegistryDomainError> {
        if !self.state.can_transition_to(target_state) {
            return Err(ToolRegistryDomainError::InvalidConnectionTransition {
                server: self.server.clone(),
                from: self.state.as_str().to_owned(),
                to: target_state.as_str().to_owned(),
            });
        }

        self.state = target_state;
        self.updated_at = clock.utc();
        Ok(())
    }
}

/// Point-in-time view of a connection's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    /// Server name.
    pub server: McpServerName,
    /// Connection state at snapshot time.
    pub state: ConnectionState,
    /// Failure reason when establishment failed.
    pub failure: Option<String>,
    /// When the connection was first launched.
    pub created_at: DateTime<Utc>,
    /// When the state last changed.
    pub updated_at: DateTime<Utc>,
}
