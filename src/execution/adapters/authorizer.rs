//! Authorizers backed by a terminal prompt or a fixed answer.

use crate::execution::{
    domain::{AuthorizationDecision, AuthorizationRequest},
    ports::ToolCallAuthorizer,
};
use async_trait::async_trait;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Answers every request with the same decision.
#[derive(Debug, Clone, Copy)]
pub struct StaticAuthorizer {
    decision: AuthorizationDecision,
}

impl StaticAuthorizer {
    /// Approves every tool call.
    #[must_use]
    pub const fn approve_all() -> Self {
        Self {
            decision: AuthorizationDecision::Approved,
        }
    }

    /// Denies every tool call.
    #[must_use]
    pub const fn deny_all() -> Self {
        Self {
            decision: AuthorizationDecision::Denied,
        }
    }
}

#[async_trait]
impl ToolCallAuthorizer for StaticAuthorizer {
    async fn authorize(&self, _request: &AuthorizationRequest) -> AuthorizationDecision {
        self.decision
    }
}

/// Asks the operator on a line-oriented prompt.
///
/// The prompt reads `Tool call: <name> (<server>) <arguments>` and accepts
/// `y` or `yes` in any case. Anything else, end of input, or an I/O failure
/// denies the call.
#[derive(Debug)]
pub struct PromptAuthorizer<R, W> {
    io: Mutex<PromptIo<R, W>>,
}

#[derive(Debug)]
struct PromptIo<R, W> {
    input: BufReader<R>,
    output: W,
}

impl PromptAuthorizer<Stdin, Stdout> {
    /// Prompts on the process's standard streams.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> PromptAuthorizer<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Prompts on the given streams.
    #[must_use]
    pub fn new(input: R, output: W) -> Self {
        Self {
            io: Mutex::new(PromptIo {
                input: BufReader::new(input),
                output,
            }),
        }
    }

    /// Returns the output stream, consuming the authorizer.
    #[must_use]
    pub fn into_output(self) -> W {
        self.io.into_inner().output
    }

    async fn ask(io: &mut PromptIo<R, W>, request: &AuthorizationRequest) -> std::io::Result<bool> {
        io.output.write_all(prompt_for(request).as_bytes()).await?;
        io.output.flush().await?;

        let mut answer = String::new();
        io.input.read_line(&mut answer).await?;
        Ok(is_affirmative(&answer))
    }
}

#[async_trait]
impl<R, W> ToolCallAuthorizer for PromptAuthorizer<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationDecision {
        let mut io = self.io.lock().await;
        match Self::ask(&mut io, request).await {
            Ok(approved) => approved.into(),
            Err(err) => {
                warn!(tool = request.tool_name(), error = %err, "authorization prompt failed");
                AuthorizationDecision::Denied
            }
        }
    }
}

fn prompt_for(request: &AuthorizationRequest) -> String {
    let server = request
        .owning_server()
        .map_or_else(|| "unknown server".to_owned(), ToString::to_string);
    format!(
        "Tool call: {} ({server}) {}\nAllow? [y/N] ",
        request.tool_name(),
        request.arguments()
    )
}

fn is_affirmative(answer: &str) -> bool {
    let trimmed = answer.trim();
    trimmed.eq_ignore_ascii_case("y") || trimmed.eq_ignore_ascii_case("yes")
}
