//! Binds the connection manager to the session teardown port.

use crate::execution::ports::SessionTeardown;
use crate::tool_registry::services::{CloseError, McpConnectionManager};
use async_trait::async_trait;
use mockable::Clock;

#[async_trait]
impl<C> SessionTeardown for McpConnectionManager<C>
where
    C: Clock + Send + Sync + 'static,
{
    async fn close(&self) -> Result<(), CloseError> {
        Self::close(self).await
    }
}
