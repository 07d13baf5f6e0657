//! Observer that reports fragments through `tracing`.

use crate::execution::{domain::ResponseFragment, ports::FragmentObserver};
use tracing::{debug, info};

/// Logs every processed fragment.
///
/// Text deltas are logged at debug level; tool activity at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingFragmentObserver;

impl FragmentObserver for TracingFragmentObserver {
    fn observe(&self, fragment: &ResponseFragment) {
        match fragment {
            ResponseFragment::TextDelta { text } => debug!(text = %text, "text delta"),
            ResponseFragment::ToolCall(call) => info!(
                call_id = %call.call_id,
                tool = %call.tool_name,
                arguments = %call.arguments,
                "tool call approved"
            ),
            ResponseFragment::ToolResult(result) => info!(
                call_id = %result.call_id,
                tool = %result.tool_name,
                output = %result.output,
                "tool result"
            ),
            ResponseFragment::Finished => info!("response finished"),
        }
    }
}
