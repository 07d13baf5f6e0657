//! JSON-RPC 2.0 and MCP message shapes used on the STDIO transport.

use crate::tool_registry::{
    domain::McpToolDefinition,
    ports::{McpClientError, McpClientResult},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub(super) const JSONRPC_VERSION: &str = "2.0";
pub(super) const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
pub(super) const METHOD_NOT_FOUND: i64 = -32601;

/// Outgoing request or notification.
#[derive(Debug, Clone, Serialize)]
pub(super) struct OutgoingRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<i64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> OutgoingRequest<'a> {
    pub(super) const fn request(id: i64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            method,
            params,
        }
    }

    pub(super) const fn notification(method: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: None,
            method,
            params: None,
        }
    }
}

/// Outgoing reply to a request initiated by the server.
#[derive(Debug, Clone, Serialize)]
pub(super) struct OutgoingResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcErrorObject>,
}

impl OutgoingResponse {
    pub(super) const fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub(super) fn method_not_found(id: Value, method: &str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(RpcErrorObject {
                code: METHOD_NOT_FOUND,
                message: format!("method not supported by client: {method}"),
            }),
        }
    }
}

/// JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(super) struct RpcErrorObject {
    pub(super) code: i64,
    pub(super) message: String,
}

/// Any message read from the server.
///
/// Responses carry `id` and one of `result`/`error`; server requests carry
/// `id` and `method`; notifications carry only `method`.
#[derive(Debug, Clone, Deserialize)]
pub(super) struct IncomingMessage {
    #[serde(default)]
    pub(super) id: Option<Value>,
    #[serde(default)]
    pub(super) method: Option<String>,
    #[serde(default)]
    pub(super) result: Option<Value>,
    #[serde(default)]
    pub(super) error: Option<RpcErrorObject>,
}

/// Classified incoming message.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Incoming {
    Response {
        id: Option<i64>,
        outcome: Result<Value, RpcErrorObject>,
    },
    ServerRequest {
        id: Value,
        method: String,
    },
    Notification {
        method: String,
    },
}

impl IncomingMessage {
    pub(super) fn classify(self) -> McpClientResult<Incoming> {
        match (self.id, self.method) {
            (Some(id), Some(method)) => Ok(Incoming::ServerRequest { id, method }),
            (None, Some(method)) => Ok(Incoming::Notification { method }),
            (id, None) => {
                let outcome = match (self.result, self.error) {
                    (_, Some(error)) => Err(error),
                    (Some(result), None) => Ok(result),
                    (None, None) => {
                        return Err(McpClientError::Protocol(
                            "response carries neither result nor error".to_owned(),
                        ));
                    }
                };
                Ok(Incoming::Response {
                    id: id.as_ref().and_then(Value::as_i64),
                    outcome,
                })
            }
        }
    }
}

/// Parameters of the `initialize` request.
pub(super) fn initialize_params(client_name: &str, client_version: &str) -> Value {
    serde_json::json!({
        "protocolVersion": MCP_PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": client_name,
            "version": client_version,
        },
    })
}

/// Result of the `initialize` request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct InitializeResult {
    pub(super) protocol_version: String,
    #[serde(default)]
    pub(super) server_info: Option<ServerInfo>,
}

#[derive(Debug, Clone, Deserialize)]
pub(super) struct ServerInfo {
    pub(super) name: String,
    #[serde(default)]
    pub(super) version: Option<String>,
}

/// One page of a `tools/list` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListToolsPage {
    #[serde(default)]
    pub(super) tools: Vec<WireTool>,
    #[serde(default)]
    pub(super) next_cursor: Option<String>,
}

/// Tool entry as sent by the server.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "empty_object_schema")]
    input_schema: Value,
    #[serde(default)]
    output_schema: Option<Value>,
}

fn empty_object_schema() -> Value {
    serde_json::json!({"type": "object"})
}

impl TryFrom<WireTool> for McpToolDefinition {
    type Error = McpClientError;

    fn try_from(wire: WireTool) -> Result<Self, Self::Error> {
        let definition = Self::new(wire.name, wire.input_schema)
            .map_err(|err| McpClientError::Protocol(err.to_string()))?;
        let described = match wire.description {
            Some(description) => definition.with_description(description),
            None => definition,
        };
        Ok(match wire.output_schema {
            Some(schema) => described.with_output_schema(schema),
            None => described,
        })
    }
}

pub(super) fn tools_list_params(cursor: Option<&str>) -> Option<Value> {
    cursor.map(|value| serde_json::json!({ "cursor": value }))
}
