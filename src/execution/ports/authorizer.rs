//! Port for asking the operator to approve tool calls.

use crate::execution::domain::{AuthorizationDecision, AuthorizationRequest};
use async_trait::async_trait;

/// Decides whether a requested tool call may proceed.
///
/// Implementations that cannot obtain an answer must return
/// [`AuthorizationDecision::Denied`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolCallAuthorizer: Send + Sync {
    /// Asks for a decision on one tool call.
    async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationDecision;
}
