//! The confirmation-gated execution loop.

use crate::execution::{
    domain::{
        AuthorizationDecision, AuthorizationRequest, ExecutionLoopError, LoopOutcome,
        ResponseFragment, RunSummary, StreamError, ToolInvocationRequest,
    },
    ports::{FragmentObserver, SessionTeardown, ToolCallAuthorizer},
};
use crate::tool_registry::domain::ToolRegistry;
use futures::{Stream, StreamExt};
use std::pin::pin;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Walks a streamed response and gates every tool call on authorization.
///
/// Fragments are handled strictly in stream order. A tool call is only
/// passed to the observer after the authorizer approves it. The first denial
/// triggers the cancellation token and stops consumption, so no later
/// fragment is read. Whatever way a run ends, the session teardown is
/// invoked exactly once before [`ConfirmationGatedLoop::run`] returns.
pub struct ConfirmationGatedLoop<A, O>
where
    A: ToolCallAuthorizer + ?Sized,
    O: FragmentObserver + ?Sized,
{
    registry: ToolRegistry,
    authorizer: Arc<A>,
    observer: Arc<O>,
    max_tool_calls: Option<usize>,
}

struct Progress {
    fragments_processed: usize,
    tool_calls_requested: usize,
    tool_calls_approved: usize,
}

impl Progress {
    const fn finish(self, outcome: LoopOutcome) -> RunSummary {
        RunSummary {
            outcome,
            fragments_processed: self.fragments_processed,
            tool_calls_approved: self.tool_calls_approved,
        }
    }
}

impl<A, O> ConfirmationGatedLoop<A, O>
where
    A: ToolCallAuthorizer + ?Sized,
    O: FragmentObserver + ?Sized,
{
    /// Creates a loop over the tools of an aggregated registry.
    #[must_use]
    pub const fn new(registry: ToolRegistry, authorizer: Arc<A>, observer: Arc<O>) -> Self {
        Self {
            registry,
            authorizer,
            observer,
            max_tool_calls: None,
        }
    }

    /// Stops the run once more than `limit` tool calls have been requested.
    ///
    /// Reaching the limit cancels generation the same way a denial does.
    #[must_use]
    pub const fn with_max_tool_calls(mut self, limit: usize) -> Self {
        self.max_tool_calls = Some(limit);
        self
    }

    /// Returns the registry used to resolve tool owners.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Consumes `fragments` until the response ends or a tool call is refused,
    /// then closes `teardown`.
    ///
    /// `cancel` is triggered when a tool call is denied or the tool call
    /// limit is exceeded. The producer of `fragments` is expected to stop
    /// generating once it observes the cancellation.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionLoopError::Stream`] when the stream yields an error,
    /// and [`ExecutionLoopError::Close`] when the run itself succeeded but
    /// closing the session failed. Teardown has run in both cases.
    pub async fn run<S, T>(
        &self,
        fragments: S,
        teardown: &T,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, ExecutionLoopError>
    where
        S: Stream<Item = Result<ResponseFragment, StreamError>>,
        T: SessionTeardown + ?Sized,
    {
        let driven = self.drive(fragments, cancel).await;
        let closed = teardown.close().await;

        match (driven, closed) {
            (Ok(summary), Ok(())) => {
                info!(
                    outcome = %summary.outcome,
                    fragments = summary.fragments_processed,
                    approved = summary.tool_calls_approved,
                    "execution loop completed"
                );
                Ok(summary)
            }
            (Ok(summary), Err(source)) => Err(ExecutionLoopError::Close { summary, source }),
            (Err(source), closed) => {
                warn!(error = %source, "response stream failed");
                Err(ExecutionLoopError::Stream {
                    source,
                    close_error: closed.err(),
                })
            }
        }
    }

    async fn drive<S>(
        &self,
        fragments: S,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, StreamError>
    where
        S: Stream<Item = Result<ResponseFragment, StreamError>>,
    {
        let mut fragments = pin!(fragments);
        let mut progress = Progress {
            fragments_processed: 0,
            tool_calls_requested: 0,
            tool_calls_approved: 0,
        };

        while let Some(next) = fragments.next().await {
            let fragment = next?;
            progress.fragments_processed += 1;

            let ResponseFragment::ToolCall(call) = &fragment else {
                self.observer.observe(&fragment);
                if matches!(fragment, ResponseFragment::Finished) {
                    return Ok(progress.finish(LoopOutcome::Finished));
                }
                continue;
            };

            progress.tool_calls_requested += 1;
            if let Some(limit) = self.exceeded_limit(progress.tool_calls_requested) {
                warn!(tool = %call.tool_name, limit, "tool call limit reached, cancelling generation");
                cancel.cancel();
                return Ok(progress.finish(LoopOutcome::StepLimitReached { limit }));
            }

            match self.authorizer.authorize(&self.request_for(call)).await {
                AuthorizationDecision::Approved => {
                    progress.tool_calls_approved += 1;
                    self.observer.observe(&fragment);
                }
                AuthorizationDecision::Denied => {
                    info!(call_id = %call.call_id, tool = %call.tool_name, "tool call denied, cancelling generation");
                    cancel.cancel();
                    return Ok(progress.finish(LoopOutcome::Denied {
                        tool_name: call.tool_name.clone(),
                    }));
                }
            }
        }

        Ok(progress.finish(LoopOutcome::Drained))
    }

    fn exceeded_limit(&self, requested: usize) -> Option<usize> {
        self.max_tool_calls.filter(|limit| requested > *limit)
    }

    fn request_for(&self, call: &ToolInvocationRequest) -> AuthorizationRequest {
        let owning_server = self.registry.owning_server(&call.tool_name).cloned();
        if owning_server.is_none() {
            warn!(tool = %call.tool_name, "tool call names a tool outside the registry");
        }
        AuthorizationRequest::new(call.clone(), owning_server)
    }
}
