//! Connector that launches MCP servers as child processes.

use super::client::StdioMcpClient;
use crate::tool_registry::{
    domain::{McpServerName, McpServerSpec},
    ports::{McpClient, McpClientConnector, McpClientError, McpClientResult},
};
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, Command};
use tracing::{debug, info};

/// Default limit for the `initialize` exchange and for each request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches MCP servers over STDIO and performs the protocol handshake.
///
/// Child processes are killed when their client is dropped, so a manager
/// that is dropped without closing does not leak server processes.
#[derive(Debug, Clone)]
pub struct StdioMcpConnector {
    client_name: String,
    client_version: String,
    request_timeout: Duration,
}

impl Default for StdioMcpConnector {
    fn default() -> Self {
        Self {
            client_name: env!("CARGO_PKG_NAME").to_owned(),
            client_version: env!("CARGO_PKG_VERSION").to_owned(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl StdioMcpConnector {
    /// Creates a connector identifying itself with this crate's name.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the client identity sent during the handshake.
    #[must_use]
    pub fn with_client_info(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        self.client_name = name.into();
        self.client_version = version.into();
        self
    }

    /// Overrides the handshake and request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    fn command_for(spec: &McpServerSpec) -> Command {
        let transport = spec.transport();
        let mut command = Command::new(transport.command());
        command
            .args(transport.args())
            .envs(transport.env())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(directory) = transport.working_directory() {
            command.current_dir(directory);
        }
        command
    }
}

#[async_trait]
impl McpClientConnector for StdioMcpConnector {
    async fn connect(&self, spec: &McpServerSpec) -> McpClientResult<Arc<dyn McpClient>> {
        let transport = spec.transport();
        let mut child = Self::command_for(spec)
            .spawn()
            .map_err(|err| McpClientError::spawn(transport.command(), err))?;
        info!(
            server = %spec.name(),
            command = transport.command(),
            pid = child.id(),
            "MCP server process started"
        );

        let stdin = child.stdin.take().ok_or_else(|| {
            McpClientError::Handshake("failed to capture MCP server stdin".to_owned())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpClientError::Handshake("failed to capture MCP server stdout".to_owned())
        })?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(spec.name().clone(), stderr));
        }

        let client = StdioMcpClient::new(
            spec.name().clone(),
            child,
            stdin,
            stdout,
            self.request_timeout,
        );
        client
            .initialize(&self.client_name, &self.client_version)
            .await?;
        Ok(Arc::new(client))
    }
}

async fn forward_stderr(server: McpServerName, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!(server = %server, "{line}");
    }
}
