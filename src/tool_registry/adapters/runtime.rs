//! In-memory connector adapter for connection manager tests.

use crate::tool_registry::{
    domain::{McpServerName, McpServerSpec, McpToolDefinition},
    ports::{McpClient, McpClientConnector, McpClientError, McpClientResult},
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

/// In-memory MCP connector.
///
/// This adapter models connection behaviour without spawning external
/// processes. Failures and delays can be injected per server name, and every
/// connect and close attempt is counted. It is suitable for unit and
/// integration tests and for deterministic local flows.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMcpConnector {
    state: Arc<RwLock<InMemoryConnectorState>>,
}

#[derive(Debug, Default)]
struct InMemoryConnectorState {
    tool_catalogs: HashMap<McpServerName, Vec<McpToolDefinition>>,
    connect_failures: HashMap<McpServerName, String>,
    list_failures: HashMap<McpServerName, String>,
    close_failures: HashMap<McpServerName, String>,
    connect_delays: HashMap<McpServerName, Duration>,
    connect_attempts: HashMap<McpServerName, usize>,
    close_attempts: HashMap<McpServerName, usize>,
    open_connections: HashSet<McpServerName>,
}

fn lock_error(message: String) -> McpClientError {
    McpClientError::runtime(std::io::Error::other(message))
}

impl InMemoryMcpConnector {
    /// Creates an empty in-memory connector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> McpClientResult<RwLockReadGuard<'_, InMemoryConnectorState>> {
        self.state.read().map_err(|err| lock_error(err.to_string()))
    }

    fn write_state(&self) -> McpClientResult<RwLockWriteGuard<'_, InMemoryConnectorState>> {
        self.state.write().map_err(|err| lock_error(err.to_string()))
    }

    /// Associates a tool catalog with a server name.
    ///
    /// Existing catalog entries are replaced.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn set_tool_catalog(
        &self,
        server_name: McpServerName,
        tools: Vec<McpToolDefinition>,
    ) -> McpClientResult<()> {
        self.write_state()?.tool_catalogs.insert(server_name, tools);
        Ok(())
    }

    /// Makes connection attempts to the named server fail.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn fail_connect(
        &self,
        server_name: McpServerName,
        message: impl Into<String>,
    ) -> McpClientResult<()> {
        self.write_state()?
            .connect_failures
            .insert(server_name, message.into());
        Ok(())
    }

    /// Makes tool listing on the named server fail.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn fail_list_tools(
        &self,
        server_name: McpServerName,
        message: impl Into<String>,
    ) -> McpClientResult<()> {
        self.write_state()?
            .list_failures
            .insert(server_name, message.into());
        Ok(())
    }

    /// Makes closing the named server fail.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn fail_close(
        &self,
        server_name: McpServerName,
        message: impl Into<String>,
    ) -> McpClientResult<()> {
        self.write_state()?
            .close_failures
            .insert(server_name, message.into());
        Ok(())
    }

    /// Delays establishment of the named server.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn delay_connect(&self, server_name: McpServerName, delay: Duration) -> McpClientResult<()> {
        self.write_state()?.connect_delays.insert(server_name, delay);
        Ok(())
    }

    /// Returns how many times a connection to the named server was attempted.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn connect_attempts(&self, server_name: &McpServerName) -> McpClientResult<usize> {
        Ok(self
            .read_state()?
            .connect_attempts
            .get(server_name)
            .copied()
            .unwrap_or_default())
    }

    /// Returns how many times closing the named server was attempted.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn close_attempts(&self, server_name: &McpServerName) -> McpClientResult<usize> {
        Ok(self
            .read_state()?
            .close_attempts
            .get(server_name)
            .copied()
            .unwrap_or_default())
    }

    /// Returns the total number of close attempts across all servers.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn total_close_attempts(&self) -> McpClientResult<usize> {
        Ok(self.read_state()?.close_attempts.values().sum())
    }

    /// Returns whether the named server has an open connection.
    ///
    /// # Errors
    ///
    /// Returns runtime errors when lock acquisition fails.
    pub fn is_open(&self, server_name: &McpServerName) -> McpClientResult<bool> {
        Ok(self.read_state()?.open_connections.contains(server_name))
    }
}

#[async_trait]
impl McpClientConnector for InMemoryMcpConnector {
    async fn connect(&self, spec: &McpServerSpec) -> McpClientResult<Arc<dyn McpClient>> {
        let delay = {
            let mut state = self.write_state()?;
            *state
                .connect_attempts
                .entry(spec.name().clone())
                .or_default() += 1;
            state.connect_delays.get(spec.name()).copied()
        };
        if let Some(duration) = delay {
            tokio::time::sleep(duration).await;
        }

        let mut state = self.write_state()?;
        if let Some(message) = state.connect_failures.get(spec.name()) {
            return Err(McpClientError::Handshake(message.clone()));
        }
        state.open_connections.insert(spec.name().clone());

        Ok(Arc::new(InMemoryMcpClient {
            server: spec.name().clone(),
            connector: self.clone(),
        }))
    }
}

/// Client handed out by [`InMemoryMcpConnector`].
#[derive(Debug, Clone)]
pub struct InMemoryMcpClient {
    server: McpServerName,
    connector: InMemoryMcpConnector,
}

#[async_trait]
impl McpClient for InMemoryMcpClient {
    async fn list_tools(&self) -> McpClientResult<Vec<McpToolDefinition>> {
        let state = self.connector.read_state()?;
        if !state.open_connections.contains(&self.server) {
            return Err(McpClientError::ConnectionClosed);
        }
        if let Some(message) = state.list_failures.get(&self.server) {
            return Err(McpClientError::Protocol(message.clone()));
        }

        Ok(state
            .tool_catalogs
            .get(&self.server)
            .cloned()
            .unwrap_or_default())
    }

    async fn close(&self) -> McpClientResult<()> {
        let mut state = self.connector.write_state()?;
        *state
            .close_attempts
            .entry(self.server.clone())
            .or_default() += 1;
        state.open_connections.remove(&self.server);

        match state.close_failures.get(&self.server) {
            Some(message) => Err(McpClientError::runtime(std::io::Error::other(
                message.clone(),
            ))),
            None => Ok(()),
        }
    }
}
