//! Unit tests for the MCP connection manager.

use super::{McpConnectionManager, McpConnectionManagerError, ProviderFailure};
use crate::tool_registry::{
    adapters::InMemoryMcpConnector,
    domain::{
        ConnectionSlot, ConnectionState, McpServerName, McpServerSpec, McpServersConfig,
        McpToolDefinition, StdioTransportConfig, ToolCollisionPolicy, ToolRegistryDomainError,
    },
    ports::{McpClient, McpClientError, McpClientResult, MockMcpClient, MockMcpClientConnector},
};
use async_trait::async_trait;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

type TestManager = McpConnectionManager<DefaultClock>;

fn name(raw: &str) -> McpServerName {
    McpServerName::new(raw).expect("valid server name")
}

fn config(names: &[&str]) -> McpServersConfig {
    McpServersConfig::from_specs(names.iter().map(|raw| {
        McpServerSpec::new(
            name(raw),
            StdioTransportConfig::new("mcp-server").expect("valid transport"),
        )
    }))
    .expect("unique server names")
}

fn tool(tool_name: &str) -> McpToolDefinition {
    McpToolDefinition::new(tool_name, json!({"type": "object"})).expect("valid tool")
}

#[fixture]
fn connector() -> Arc<InMemoryMcpConnector> {
    Arc::new(InMemoryMcpConnector::new())
}

fn build_manager(names: &[&str], connector: &Arc<InMemoryMcpConnector>) -> TestManager {
    McpConnectionManager::connect(config(names), Arc::clone(connector), Arc::new(DefaultClock))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn close_without_aggregation_closes_every_ready_connection(
    connector: Arc<InMemoryMcpConnector>,
) {
    let manager = build_manager(&["filesystem", "search"], &connector);

    manager.close().await.expect("close should succeed");

    for snapshot in manager.connection_states() {
        assert_eq!(snapshot.state, ConnectionState::Closed);
    }
    assert_eq!(connector.total_close_attempts().expect("counter"), 2);
    assert!(!connector.is_open(&name("filesystem")).expect("state"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn later_server_wins_tool_name_collision(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("alpha"), vec![tool("search"), tool("read")])
        .expect("catalog setup");
    connector
        .set_tool_catalog(name("beta"), vec![tool("search")])
        .expect("catalog setup");
    let manager = build_manager(&["alpha", "beta"], &connector);

    let registry = manager.aggregate_tools().await.expect("aggregation");

    assert_eq!(registry.len(), 2);
    assert_eq!(
        registry.owning_server("search").map(McpServerName::as_str),
        Some("beta")
    );
    manager.close().await.expect("close should succeed");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn collision_winner_follows_configuration_order(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("alpha"), vec![tool("search")])
        .expect("catalog setup");
    connector
        .set_tool_catalog(name("beta"), vec![tool("search")])
        .expect("catalog setup");
    connector
        .delay_connect(name("alpha"), Duration::from_millis(50))
        .expect("delay setup");
    let manager = build_manager(&["beta", "alpha"], &connector);

    let registry = manager.aggregate_tools().await.expect("aggregation");

    assert_eq!(
        registry.owning_server("search").map(McpServerName::as_str),
        Some("alpha")
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn one_failed_server_fails_whole_aggregation(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("healthy"), vec![tool("search")])
        .expect("catalog setup");
    connector
        .fail_connect(name("broken"), "command not found")
        .expect("failure setup");
    let manager = build_manager(&["healthy", "broken"], &connector);

    let result = manager.aggregate_tools().await;

    let Err(McpConnectionManagerError::Aggregation(error)) = result else {
        panic!("expected aggregation error");
    };
    let failed: Vec<&str> = error
        .failures
        .iter()
        .map(|failure| failure.server().as_str())
        .collect();
    assert_eq!(failed, ["broken"]);
    assert!(matches!(
        error.failures.first(),
        Some(ProviderFailure::Establish(_))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn tool_listing_failure_fails_aggregation(connector: Arc<InMemoryMcpConnector>) {
    connector
        .fail_list_tools(name("flaky"), "malformed page")
        .expect("failure setup");
    let manager = build_manager(&["flaky"], &connector);

    let result = manager.aggregate_tools().await;

    assert!(matches!(
        result,
        Err(McpConnectionManagerError::Aggregation(error))
            if matches!(error.failures.as_slice(), [ProviderFailure::ListTools { .. }])
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn partial_aggregation_keeps_healthy_servers(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("healthy"), vec![tool("search")])
        .expect("catalog setup");
    connector
        .fail_connect(name("broken"), "handshake refused")
        .expect("failure setup");
    connector
        .fail_list_tools(name("flaky"), "malformed page")
        .expect("failure setup");
    let manager = build_manager(&["flaky", "healthy", "broken"], &connector);

    let aggregation = manager
        .aggregate_available_tools()
        .await
        .expect("partial aggregation");

    assert_eq!(aggregation.registry.names(), ["search"]);
    let failed: Vec<&str> = aggregation
        .failures
        .iter()
        .map(|failure| failure.server().as_str())
        .collect();
    assert_eq!(failed, ["flaky", "broken"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn reject_policy_surfaces_collision(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("alpha"), vec![tool("search")])
        .expect("catalog setup");
    connector
        .set_tool_catalog(name("beta"), vec![tool("search")])
        .expect("catalog setup");
    let manager =
        build_manager(&["alpha", "beta"], &connector).with_collision_policy(ToolCollisionPolicy::Reject);

    let result = manager.aggregate_tools().await;

    assert!(matches!(
        result,
        Err(McpConnectionManagerError::Registry(
            ToolRegistryDomainError::ToolNameCollision { .. }
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn second_close_makes_no_further_attempts(connector: Arc<InMemoryMcpConnector>) {
    let manager = build_manager(&["filesystem", "search"], &connector);

    manager.close().await.expect("first close");
    manager.close().await.expect("second close");

    assert_eq!(connector.close_attempts(&name("filesystem")).expect("counter"), 1);
    assert_eq!(connector.close_attempts(&name("search")).expect("counter"), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_closes_attempt_each_connection_once(connector: Arc<InMemoryMcpConnector>) {
    let manager = build_manager(&["filesystem", "search"], &connector);

    let (first, second) = tokio::join!(manager.close(), manager.close());

    assert!(first.is_ok());
    assert!(second.is_ok());
    assert_eq!(connector.total_close_attempts().expect("counter"), 2);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn close_failure_does_not_stop_other_closes(connector: Arc<InMemoryMcpConnector>) {
    connector
        .fail_close(name("stubborn"), "process ignored signal")
        .expect("failure setup");
    let manager = build_manager(&["stubborn", "filesystem", "search"], &connector);

    let error = manager.close().await.expect_err("close should report failure");

    assert_eq!(error.servers(), [&name("stubborn")]);
    assert_eq!(connector.total_close_attempts().expect("counter"), 3);
    assert!(manager.close().await.is_ok());
    assert_eq!(connector.total_close_attempts().expect("counter"), 3);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_connections_are_not_closed(connector: Arc<InMemoryMcpConnector>) {
    connector
        .fail_connect(name("broken"), "spawn failed")
        .expect("failure setup");
    let manager = build_manager(&["broken", "filesystem"], &connector);

    manager.close().await.expect("close should succeed");

    assert_eq!(connector.close_attempts(&name("broken")).expect("counter"), 0);
    let states: Vec<ConnectionState> = manager
        .connection_states()
        .into_iter()
        .map(|snapshot| snapshot.state)
        .collect();
    assert_eq!(states, [ConnectionState::Failed, ConnectionState::Closed]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn zero_servers_yield_empty_registry(connector: Arc<InMemoryMcpConnector>) {
    let manager = build_manager(&[], &connector);

    let registry = manager.aggregate_tools().await.expect("aggregation");

    assert!(manager.is_empty());
    assert!(registry.is_empty());
    manager.close().await.expect("close should succeed");
    assert_eq!(connector.total_close_attempts().expect("counter"), 0);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn connections_are_established_once(connector: Arc<InMemoryMcpConnector>) {
    let manager = build_manager(&["filesystem"], &connector);

    manager.aggregate_tools().await.expect("first aggregation");
    manager.aggregate_tools().await.expect("second aggregation");
    manager.close().await.expect("close");

    assert_eq!(
        connector.connect_attempts(&name("filesystem")).expect("counter"),
        1
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn construction_does_not_wait_for_establishment(connector: Arc<InMemoryMcpConnector>) {
    connector
        .delay_connect(name("slow"), Duration::from_millis(200))
        .expect("delay setup");
    let manager = build_manager(&["slow"], &connector);

    let snapshot = manager
        .connection_state(ConnectionSlot::new(0))
        .expect("slot should exist");
    assert_eq!(snapshot.state, ConnectionState::Pending);

    manager.close().await.expect("close");
    assert_eq!(
        manager
            .connection_state(ConnectionSlot::new(0))
            .map(|current| current.state),
        Some(ConnectionState::Closed)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn aggregation_after_close_is_empty(connector: Arc<InMemoryMcpConnector>) {
    connector
        .set_tool_catalog(name("filesystem"), vec![tool("read_file")])
        .expect("catalog setup");
    let manager = build_manager(&["filesystem"], &connector);

    manager.close().await.expect("close");
    let registry = manager.aggregate_tools().await.expect("aggregation");

    assert!(registry.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn mocked_client_close_error_is_reported() {
    let mut client = MockMcpClient::new();
    client.expect_list_tools().never();
    client
        .expect_close()
        .times(1)
        .returning(|| Err(McpClientError::ConnectionClosed));
    let client: Arc<dyn McpClient> = Arc::new(client);

    let mut connector = MockMcpClientConnector::new();
    connector
        .expect_connect()
        .times(1)
        .returning(move |_| Ok(Arc::clone(&client)));

    let manager: TestManager = McpConnectionManager::connect(
        config(&["filesystem"]),
        Arc::new(connector),
        Arc::new(DefaultClock),
    );

    let error = manager.close().await.expect_err("close should fail");
    assert_eq!(error.servers(), [&name("filesystem")]);
    assert!(manager.close().await.is_ok());
}

/// Client whose close takes a while and then fails.
struct SlowFailingClient {
    close_finished: Arc<AtomicBool>,
}

#[async_trait]
impl McpClient for SlowFailingClient {
    async fn list_tools(&self) -> McpClientResult<Vec<McpToolDefinition>> {
        Ok(Vec::new())
    }

    async fn close(&self) -> McpClientResult<()> {
        tokio::time::sleep(Duration::from_millis(300)).await;
        self.close_finished.store(true, Ordering::SeqCst);
        Err(McpClientError::ConnectionClosed)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn overlapping_close_waits_for_and_shares_first_result() {
    let close_finished = Arc::new(AtomicBool::new(false));
    let client: Arc<dyn McpClient> = Arc::new(SlowFailingClient {
        close_finished: Arc::clone(&close_finished),
    });
    let mut connector = MockMcpClientConnector::new();
    connector
        .expect_connect()
        .times(1)
        .returning(move |_| Ok(Arc::clone(&client)));
    let manager: TestManager = McpConnectionManager::connect(
        config(&["filesystem"]),
        Arc::new(connector),
        Arc::new(DefaultClock),
    );

    let (first, (second, finished_before_second_returned)) = tokio::join!(manager.close(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        let outcome = manager.close().await;
        (outcome, close_finished.load(Ordering::SeqCst))
    });

    let first_error = first.expect_err("first close should report failure");
    let second_error = second.expect_err("overlapping close should share the failure");
    assert_eq!(first_error.servers(), [&name("filesystem")]);
    assert_eq!(second_error.servers(), [&name("filesystem")]);
    assert!(finished_before_second_returned);
    assert!(manager.close().await.is_ok());
}
