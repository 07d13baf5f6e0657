//! Errors raised by the execution loop.

use super::RunSummary;
use crate::tool_registry::services::CloseError;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A failure reported by the fragment stream.
#[derive(Debug, Clone)]
pub struct StreamError(Arc<dyn StdError + Send + Sync>);

impl StreamError {
    /// Wraps an underlying stream failure.
    #[must_use]
    pub fn new(err: impl StdError + Send + Sync + 'static) -> Self {
        Self(Arc::new(err))
    }

    /// Creates a stream error from a message.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(std::io::Error::other(message.into()))
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl StdError for StreamError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.0.source()
    }
}

/// Errors returned by [`crate::execution::services::ConfirmationGatedLoop::run`].
///
/// The connection manager has been closed by the time either variant is
/// returned.
#[derive(Debug, Clone, Error)]
pub enum ExecutionLoopError {
    /// The fragment stream failed.
    #[error("response stream failed: {source}")]
    Stream {
        /// Stream failure.
        source: StreamError,
        /// Close failure observed during teardown, if any.
        close_error: Option<CloseError>,
    },

    /// The run completed but closing the connection manager failed.
    #[error("run ended ({}) but teardown failed: {source}", .summary.outcome)]
    Close {
        /// Summary of the completed run.
        summary: RunSummary,
        /// Close failure.
        source: CloseError,
    },
}
