//! MCP client speaking newline-delimited JSON-RPC to a child process.

use super::jsonrpc::{
    Incoming, IncomingMessage, InitializeResult, ListToolsPage, OutgoingRequest,
    OutgoingResponse, initialize_params, tools_list_params,
};
use crate::tool_registry::{
    domain::{McpServerName, McpToolDefinition},
    ports::{McpClient, McpClientError, McpClientResult},
};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::sync::Mutex;
use tracing::{debug, info, trace, warn};

/// Request/response channel over the child's pipes.
///
/// Held under one lock so that a request and its response are never
/// interleaved with another request.
struct StdioChannel {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// Live connection to an MCP server process.
pub struct StdioMcpClient {
    server: McpServerName,
    child: Mutex<Child>,
    channel: Mutex<StdioChannel>,
    next_id: AtomicI64,
    request_timeout: Duration,
    shutdown_timeout: Duration,
}

impl StdioMcpClient {
    pub(super) fn new(
        server: McpServerName,
        child: Child,
        stdin: ChildStdin,
        stdout: ChildStdout,
        request_timeout: Duration,
    ) -> Self {
        Self {
            server,
            child: Mutex::new(child),
            channel: Mutex::new(StdioChannel {
                stdin,
                stdout: BufReader::new(stdout),
            }),
            next_id: AtomicI64::new(1),
            request_timeout,
            shutdown_timeout: request_timeout,
        }
    }

    /// Performs the `initialize` exchange and confirms it with
    /// `notifications/initialized`.
    pub(super) async fn initialize(
        &self,
        client_name: &str,
        client_version: &str,
    ) -> McpClientResult<()> {
        let result: InitializeResult = self
            .request(
                "initialize",
                Some(initialize_params(client_name, client_version)),
            )
            .await
            .map_err(|err| McpClientError::Handshake(err.to_string()))?;

        let (server_name, server_version) = result.server_info.map_or_else(
            || (String::from("unknown"), None),
            |info| (info.name, info.version),
        );
        info!(
            server = %self.server,
            protocol_version = %result.protocol_version,
            remote_name = %server_name,
            remote_version = server_version.as_deref().unwrap_or("unknown"),
            "MCP handshake completed"
        );

        let mut channel = self.channel.lock().await;
        write_line(
            &mut channel.stdin,
            &OutgoingRequest::notification("notifications/initialized"),
        )
        .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Option<Value>,
    ) -> McpClientResult<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let exchange = async {
            let mut channel = self.channel.lock().await;
            write_line(
                &mut channel.stdin,
                &OutgoingRequest::request(id, method, params),
            )
            .await?;
            self.read_response(&mut channel, id).await
        };

        let value = tokio::time::timeout(self.request_timeout, exchange)
            .await
            .map_err(|_| McpClientError::Timeout {
                operation: method,
                after: self.request_timeout,
            })??;

        serde_json::from_value(value)
            .map_err(|err| McpClientError::Protocol(format!("malformed {method} result: {err}")))
    }

    async fn read_response(&self, channel: &mut StdioChannel, id: i64) -> McpClientResult<Value> {
        let mut line = String::new();
        loop {
            line.clear();
            let bytes = channel
                .stdout
                .read_line(&mut line)
                .await
                .map_err(McpClientError::runtime)?;
            if bytes == 0 {
                return Err(McpClientError::ConnectionClosed);
            }

            let trimmed = line.trim();
            if !trimmed.starts_with('{') {
                trace!(server = %self.server, output = trimmed, "skipping non-JSON output");
                continue;
            }

            let message: IncomingMessage = serde_json::from_str(trimmed)
                .map_err(|err| McpClientError::Protocol(err.to_string()))?;
            match message.classify()? {
                Incoming::Response {
                    id: Some(response_id),
                    outcome,
                } if response_id == id => {
                    return outcome.map_err(|error| McpClientError::Remote {
                        code: error.code,
                        message: error.message,
                    });
                }
                Incoming::Response { id: other, .. } => {
                    debug!(server = %self.server, expected = id, received = ?other, "discarding unmatched response");
                }
                Incoming::ServerRequest {
                    id: request_id,
                    method,
                } => {
                    let reply = if method == "ping" {
                        OutgoingResponse::success(request_id, serde_json::json!({}))
                    } else {
                        OutgoingResponse::method_not_found(request_id, &method)
                    };
                    write_line(&mut channel.stdin, &reply).await?;
                }
                Incoming::Notification { method } => {
                    debug!(server = %self.server, %method, "ignoring server notification");
                }
            }
        }
    }
}

async fn write_line(stdin: &mut ChildStdin, message: &impl Serialize) -> McpClientResult<()> {
    let mut encoded =
        serde_json::to_vec(message).map_err(|err| McpClientError::Protocol(err.to_string()))?;
    encoded.push(b'\n');
    stdin
        .write_all(&encoded)
        .await
        .map_err(McpClientError::runtime)?;
    stdin.flush().await.map_err(McpClientError::runtime)
}

#[async_trait]
impl McpClient for StdioMcpClient {
    async fn list_tools(&self) -> McpClientResult<Vec<McpToolDefinition>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page: ListToolsPage = self
                .request("tools/list", tools_list_params(cursor.as_deref()))
                .await?;
            for wire in page.tools {
                tools.push(McpToolDefinition::try_from(wire)?);
            }
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        debug!(server = %self.server, count = tools.len(), "listed MCP tools");
        Ok(tools)
    }

    async fn close(&self) -> McpClientResult<()> {
        let mut child = self.child.lock().await;
        if let Some(status) = child.try_wait().map_err(McpClientError::runtime)? {
            info!(server = %self.server, %status, "MCP server process already exited");
            return Ok(());
        }

        if let Err(err) = child.start_kill() {
            warn!(server = %self.server, error = %err, "failed to signal MCP server process");
        }
        let status = tokio::time::timeout(self.shutdown_timeout, child.wait())
            .await
            .map_err(|_| McpClientError::Timeout {
                operation: "shutdown",
                after: self.shutdown_timeout,
            })?
            .map_err(McpClientError::runtime)?;
        info!(server = %self.server, %status, "MCP server process terminated");
        Ok(())
    }
}
