//! Domain model for confirmation-gated execution.

mod authorization;
mod error;
mod fragment;
mod outcome;

pub use authorization::{AuthorizationDecision, AuthorizationRequest};
pub use error::{ExecutionLoopError, StreamError};
pub use fragment::{ResponseFragment, ToolInvocationRequest, ToolInvocationResult};
pub use outcome::{LoopOutcome, RunSummary};
