//! Fragments of a streamed agent response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation the model wants to perform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationRequest {
    /// Identifier correlating the call with its result.
    pub call_id: String,
    /// Registry name of the tool to invoke.
    pub tool_name: String,
    /// Arguments for the tool, as produced by the model.
    #[serde(default)]
    pub arguments: Value,
}

impl ToolInvocationRequest {
    /// Creates a tool invocation request.
    #[must_use]
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// The outcome of a tool invocation reported back through the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInvocationResult {
    /// Identifier of the call this result answers.
    pub call_id: String,
    /// Registry name of the invoked tool.
    pub tool_name: String,
    /// Tool output.
    #[serde(default)]
    pub output: Value,
}

impl ToolInvocationResult {
    /// Creates a tool invocation result.
    #[must_use]
    pub fn new(call_id: impl Into<String>, tool_name: impl Into<String>, output: Value) -> Self {
        Self {
            call_id: call_id.into(),
            tool_name: tool_name.into(),
            output,
        }
    }
}

/// One element of a streamed response.
///
/// The serialized form uses a `type` tag, so a recorded response can be
/// replayed from JSON lines such as
/// `{"type":"tool-call","callId":"1","toolName":"read_file","arguments":{}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ResponseFragment {
    /// Incremental model text.
    TextDelta {
        /// Text appended by this fragment.
        text: String,
    },
    /// The model requests a tool invocation.
    ToolCall(ToolInvocationRequest),
    /// A tool invocation completed.
    ToolResult(ToolInvocationResult),
    /// The response is complete.
    Finished,
}

impl ResponseFragment {
    /// Creates a text fragment.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Returns a short label for the fragment kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TextDelta { .. } => "text-delta",
            Self::ToolCall(_) => "tool-call",
            Self::ToolResult(_) => "tool-result",
            Self::Finished => "finished",
        }
    }
}
