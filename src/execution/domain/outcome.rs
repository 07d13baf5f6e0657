//! How a run of the execution loop ended.

use std::fmt;

/// Why the loop stopped consuming fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoopOutcome {
    /// The stream delivered its finish fragment.
    Finished,
    /// The stream ended without a finish fragment.
    Drained,
    /// The operator denied a tool call and generation was cancelled.
    Denied {
        /// Tool whose invocation was denied.
        tool_name: String,
    },
    /// More tool calls were requested than the configured limit allows.
    StepLimitReached {
        /// The configured limit.
        limit: usize,
    },
}

impl LoopOutcome {
    /// Returns whether the loop stopped before the stream was exhausted.
    #[must_use]
    pub const fn stopped_early(&self) -> bool {
        matches!(self, Self::Denied { .. } | Self::StepLimitReached { .. })
    }
}

impl fmt::Display for LoopOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finished => f.write_str("finished"),
            Self::Drained => f.write_str("stream drained"),
            Self::Denied { tool_name } => write!(f, "tool call {tool_name} denied"),
            Self::StepLimitReached { limit } => write!(f, "tool call limit of {limit} reached"),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the run ended.
    pub outcome: LoopOutcome,
    /// Fragments taken from the stream, including the one that stopped the run.
    pub fragments_processed: usize,
    /// Tool calls the operator approved.
    pub tool_calls_approved: usize,
}
