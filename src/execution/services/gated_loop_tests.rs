//! Unit tests for the confirmation-gated execution loop.

use super::ConfirmationGatedLoop;
use crate::execution::{
    adapters::StaticAuthorizer,
    domain::{
        AuthorizationDecision, ExecutionLoopError, LoopOutcome, ResponseFragment, StreamError,
        ToolInvocationRequest, ToolInvocationResult,
    },
    ports::{FragmentObserver, MockSessionTeardown, MockToolCallAuthorizer, ToolCallAuthorizer},
};
use crate::tool_registry::{
    domain::{McpServerName, McpToolDefinition, ToolCollisionPolicy, ToolRegistry},
    services::{CloseError, CloseFailure},
    ports::McpClientError,
};
use futures::{StreamExt, stream};
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct RecordingObserver {
    seen: Mutex<Vec<ResponseFragment>>,
}

impl RecordingObserver {
    fn kinds(&self) -> Vec<&'static str> {
        self.seen
            .lock()
            .expect("observer lock")
            .iter()
            .map(ResponseFragment::kind)
            .collect()
    }
}

impl FragmentObserver for RecordingObserver {
    fn observe(&self, fragment: &ResponseFragment) {
        self.seen.lock().expect("observer lock").push(fragment.clone());
    }
}

fn registry() -> ToolRegistry {
    let mut builder = ToolRegistry::builder(ToolCollisionPolicy::LastWins);
    builder
        .register_catalog(
            &McpServerName::new("filesystem").expect("valid server name"),
            vec![McpToolDefinition::new("read_file", json!({"type": "object"})).expect("valid tool")],
        )
        .expect("registration");
    builder.build()
}

fn call(id: &str) -> ResponseFragment {
    ResponseFragment::ToolCall(ToolInvocationRequest::new(
        id,
        "read_file",
        json!({"path": "notes.txt"}),
    ))
}

fn result(id: &str) -> ResponseFragment {
    ResponseFragment::ToolResult(ToolInvocationResult::new(id, "read_file", json!("contents")))
}

fn ok_fragments(
    fragments: Vec<ResponseFragment>,
) -> impl futures::Stream<Item = Result<ResponseFragment, StreamError>> {
    stream::iter(fragments.into_iter().map(Ok))
}

fn closing_once() -> MockSessionTeardown {
    let mut teardown = MockSessionTeardown::new();
    teardown.expect_close().times(1).returning(|| Ok(()));
    teardown
}

fn close_error() -> CloseError {
    CloseError {
        failures: vec![CloseFailure {
            server: McpServerName::new("filesystem").expect("valid server name"),
            source: McpClientError::ConnectionClosed,
        }],
    }
}

#[fixture]
fn observer() -> Arc<RecordingObserver> {
    Arc::new(RecordingObserver::default())
}

fn gated<A>(authorizer: A, observer: &Arc<RecordingObserver>) -> ConfirmationGatedLoop<A, RecordingObserver>
where
    A: ToolCallAuthorizer,
{
    ConfirmationGatedLoop::new(registry(), Arc::new(authorizer), Arc::clone(observer))
}

#[rstest]
#[tokio::test]
async fn approved_calls_process_every_fragment(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer);
    let cancel = CancellationToken::new();
    let fragments = vec![
        ResponseFragment::text("Reading the file."),
        call("c1"),
        result("c1"),
        ResponseFragment::Finished,
    ];

    let summary = gated_loop
        .run(ok_fragments(fragments), &closing_once(), &cancel)
        .await
        .expect("run should succeed");

    assert_eq!(summary.outcome, LoopOutcome::Finished);
    assert_eq!(summary.fragments_processed, 4);
    assert_eq!(summary.tool_calls_approved, 1);
    assert_eq!(observer.kinds(), ["text-delta", "tool-call", "tool-result", "finished"]);
    assert!(!cancel.is_cancelled());
}

#[rstest]
#[tokio::test]
async fn denial_cancels_and_stops_consuming(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::deny_all(), &observer);
    let cancel = CancellationToken::new();
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&pulled);
    let fragments = ok_fragments(vec![
        ResponseFragment::text("Let me look."),
        call("c1"),
        ResponseFragment::text("never read"),
        ResponseFragment::Finished,
    ])
    .inspect(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let summary = gated_loop
        .run(fragments, &closing_once(), &cancel)
        .await
        .expect("run should succeed");

    assert_eq!(
        summary.outcome,
        LoopOutcome::Denied {
            tool_name: "read_file".to_owned()
        }
    );
    assert!(cancel.is_cancelled());
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
    assert_eq!(observer.kinds(), ["text-delta"]);
}

#[rstest]
#[tokio::test]
async fn authorizer_sees_owning_server(observer: Arc<RecordingObserver>) {
    let mut authorizer = MockToolCallAuthorizer::new();
    authorizer
        .expect_authorize()
        .withf(|request| {
            request.tool_name() == "read_file"
                && request.owning_server().map(McpServerName::as_str) == Some("filesystem")
        })
        .times(1)
        .returning(|_| AuthorizationDecision::Approved);
    let gated_loop = gated(authorizer, &observer);

    let summary = gated_loop
        .run(
            ok_fragments(vec![call("c1")]),
            &closing_once(),
            &CancellationToken::new(),
        )
        .await
        .expect("run should succeed");

    assert_eq!(summary.outcome, LoopOutcome::Drained);
}

#[rstest]
#[tokio::test]
async fn unknown_tool_is_still_gated(observer: Arc<RecordingObserver>) {
    let mut authorizer = MockToolCallAuthorizer::new();
    authorizer
        .expect_authorize()
        .withf(|request| request.owning_server().is_none())
        .times(1)
        .returning(|_| AuthorizationDecision::Denied);
    let gated_loop = gated(authorizer, &observer);
    let unknown = ResponseFragment::ToolCall(ToolInvocationRequest::new(
        "c9",
        "delete_everything",
        json!({}),
    ));

    let summary = gated_loop
        .run(
            ok_fragments(vec![unknown]),
            &closing_once(),
            &CancellationToken::new(),
        )
        .await
        .expect("run should succeed");

    assert!(summary.outcome.stopped_early());
}

#[rstest]
#[tokio::test]
async fn stream_error_still_closes_session(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer);
    let fragments = stream::iter(vec![
        Ok(ResponseFragment::text("partial")),
        Err(StreamError::message("connection reset")),
        Ok(ResponseFragment::Finished),
    ]);

    let error = gated_loop
        .run(fragments, &closing_once(), &CancellationToken::new())
        .await
        .expect_err("stream failure should surface");

    assert!(matches!(
        error,
        ExecutionLoopError::Stream { close_error: None, .. }
    ));
    assert_eq!(observer.kinds(), ["text-delta"]);
}

#[rstest]
#[tokio::test]
async fn stream_error_carries_close_failure(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer);
    let mut teardown = MockSessionTeardown::new();
    teardown
        .expect_close()
        .times(1)
        .returning(|| Err(close_error()));
    let fragments = stream::iter(vec![Err(StreamError::message("engine crashed"))]);

    let error = gated_loop
        .run(fragments, &teardown, &CancellationToken::new())
        .await
        .expect_err("stream failure should surface");

    assert!(matches!(
        error,
        ExecutionLoopError::Stream { close_error: Some(_), .. }
    ));
}

#[rstest]
#[tokio::test]
async fn close_failure_after_clean_run_is_reported(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer);
    let mut teardown = MockSessionTeardown::new();
    teardown
        .expect_close()
        .times(1)
        .returning(|| Err(close_error()));

    let error = gated_loop
        .run(
            ok_fragments(vec![ResponseFragment::Finished]),
            &teardown,
            &CancellationToken::new(),
        )
        .await
        .expect_err("close failure should surface");

    let ExecutionLoopError::Close { summary, source } = error else {
        panic!("expected close error");
    };
    assert_eq!(summary.outcome, LoopOutcome::Finished);
    assert_eq!(source.failures.len(), 1);
}

#[rstest]
#[tokio::test]
async fn empty_stream_drains_and_closes(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::deny_all(), &observer);

    let summary = gated_loop
        .run(ok_fragments(Vec::new()), &closing_once(), &CancellationToken::new())
        .await
        .expect("run should succeed");

    assert_eq!(summary.outcome, LoopOutcome::Drained);
    assert_eq!(summary.fragments_processed, 0);
}

#[rstest]
#[tokio::test]
async fn tool_call_limit_cancels_generation(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer).with_max_tool_calls(1);
    let cancel = CancellationToken::new();

    let summary = gated_loop
        .run(
            ok_fragments(vec![call("c1"), result("c1"), call("c2"), ResponseFragment::Finished]),
            &closing_once(),
            &cancel,
        )
        .await
        .expect("run should succeed");

    assert_eq!(summary.outcome, LoopOutcome::StepLimitReached { limit: 1 });
    assert_eq!(summary.tool_calls_approved, 1);
    assert_eq!(summary.fragments_processed, 3);
    assert!(cancel.is_cancelled());
}

#[rstest]
#[tokio::test]
async fn fragments_after_finish_are_not_read(observer: Arc<RecordingObserver>) {
    let gated_loop = gated(StaticAuthorizer::approve_all(), &observer);

    let summary = gated_loop
        .run(
            ok_fragments(vec![ResponseFragment::Finished, ResponseFragment::text("late")]),
            &closing_once(),
            &CancellationToken::new(),
        )
        .await
        .expect("run should succeed");

    assert_eq!(summary.fragments_processed, 1);
    assert_eq!(observer.kinds(), ["finished"]);
}
