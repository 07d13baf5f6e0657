//! Port for releasing the resources a run depends on.

use crate::tool_registry::services::CloseError;
use async_trait::async_trait;

/// Releases the session resources once a run ends.
///
/// The execution loop calls [`SessionTeardown::close`] exactly once per run.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionTeardown: Send + Sync {
    /// Closes every resource held by the session.
    async fn close(&self) -> Result<(), CloseError>;
}
