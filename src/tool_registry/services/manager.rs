//! Connection manager owning every configured MCP server connection.

use super::error::{
    AggregationError, CloseError, CloseFailure, ConnectionEstablishmentError,
    McpConnectionManagerError, ProviderFailure,
};
use crate::tool_registry::{
    domain::{
        ConnectionLifecycle, ConnectionSlot, ConnectionSnapshot, McpServerName,
        McpServerSpec, McpServersConfig, McpToolDefinition, ToolCollisionPolicy, ToolRegistry,
    },
    ports::{McpClient, McpClientConnector, McpClientError, McpClientResult},
};
use futures::future::{BoxFuture, FutureExt, Shared, join_all};
use mockable::Clock;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Result type for connection manager operations.
pub type McpConnectionManagerResult<T> = Result<T, McpConnectionManagerError>;

type EstablishmentOutcome = McpClientResult<Arc<dyn McpClient>>;
type Establishment = Shared<BoxFuture<'static, EstablishmentOutcome>>;

/// Registry built from the healthy servers plus the failures of the rest.
#[derive(Debug, Clone)]
pub struct ToolAggregation {
    /// Tools of every server that connected and answered.
    pub registry: ToolRegistry,
    /// Servers that contributed nothing, in configuration order.
    pub failures: Vec<ProviderFailure>,
}

struct ConnectionRecord {
    slot: ConnectionSlot,
    server: McpServerName,
    lifecycle: Arc<Mutex<ConnectionLifecycle>>,
    establishment: Establishment,
}

impl ConnectionRecord {
    fn lifecycle(&self) -> MutexGuard<'_, ConnectionLifecycle> {
        lock(&self.lifecycle)
    }
}

fn lock(lifecycle: &Mutex<ConnectionLifecycle>) -> MutexGuard<'_, ConnectionLifecycle> {
    lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owns a fixed set of MCP server connections.
///
/// Connections start establishing as soon as the manager is created, one
/// Tokio task per server. Each outcome is memoized, so aggregation and close
/// observe the same client without relaunching the server. Records live in
/// an arena indexed by [`ConnectionSlot`] in configuration order.
pub struct McpConnectionManager<C>
where
    C: Clock + Send + Sync + 'static,
{
    records: Vec<ConnectionRecord>,
    clock: Arc<C>,
    collision_policy: ToolCollisionPolicy,
    closed: OnceCell<Result<(), CloseError>>,
}

impl<C> McpConnectionManager<C>
where
    C: Clock + Send + Sync + 'static,
{
    /// Starts connecting to every configured server and returns
    /// immediately.
    ///
    /// Establishment failures are recorded per connection and surface from
    /// [`Self::aggregate_tools`] or in connection snapshots; they never fail
    /// construction.
    ///
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    #[must_use]
    pub fn connect<T>(config: McpServersConfig, connector: Arc<T>, clock: Arc<C>) -> Self
    where
        T: McpClientConnector + ?Sized + 'static,
    {
        debug_assert!(config.has_unique_names(), "server names must be unique");
        let records = config
            .into_iter()
            .enumerate()
            .map(|(index, spec)| {
                spawn_establishment(ConnectionSlot::new(index), spec, &connector, &clock)
            })
            .collect::<Vec<_>>();
        info!(servers = records.len(), "initiated MCP server connections");

        Self {
            records,
            clock,
            collision_policy: ToolCollisionPolicy::default(),
            closed: OnceCell::new(),
        }
    }

    /// Sets how tool name collisions are resolved during aggregation.
    #[must_use]
    pub const fn with_collision_policy(mut self, policy: ToolCollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    /// Returns the active collision policy.
    #[must_use]
    pub const fn collision_policy(&self) -> ToolCollisionPolicy {
        self.collision_policy
    }

    /// Returns the configured server names in configuration order.
    #[must_use]
    pub fn server_names(&self) -> Vec<McpServerName> {
        self.records
            .iter()
            .map(|record| record.server.clone())
            .collect()
    }

    /// Returns the number of tracked connections.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns whether the manager tracks no connections.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the current lifecycle of every connection without waiting.
    #[must_use]
    pub fn connection_states(&self) -> Vec<ConnectionSnapshot> {
        self.records
            .iter()
            .map(|record| record.lifecycle().snapshot())
            .collect()
    }

    /// Returns the current lifecycle of one connection.
    #[must_use]
    pub fn connection_state(&self, slot: ConnectionSlot) -> Option<ConnectionSnapshot> {
        self.records
            .get(slot.index())
            .map(|record| record.lifecycle().snapshot())
    }

    /// Waits for every connection and merges all tools into one registry.
    ///
    /// Aggregation is all-or-nothing: if any server failed to connect, or a
    /// connected server fails to list its tools, no registry is returned.
    /// Catalogs merge in configuration order under the manager's collision
    /// policy. Connections already closed contribute nothing.
    ///
    /// # Errors
    ///
    /// Returns [`McpConnectionManagerError::Aggregation`] naming every failed
    /// server, or [`McpConnectionManagerError::Registry`] when the
    /// collision policy rejects a duplicate tool name.
    pub async fn aggregate_tools(&self) -> McpConnectionManagerResult<ToolRegistry> {
        let (ready, failures) = self.settle().await;
        if !failures.is_empty() {
            warn!(failed = failures.len(), "MCP servers failed to connect; aggregation aborted");
            return Err(AggregationError { failures }.into());
        }

        let (catalogs, query_failures) = Self::query_catalogs(ready).await;
        if !query_failures.is_empty() {
            return Err(AggregationError {
                failures: query_failures,
            }
            .into());
        }

        self.merge(catalogs)
    }

    /// Waits for every connection and merges the tools of the healthy ones.
    ///
    /// Servers that failed to connect or to list tools are reported in
    /// [`ToolAggregation::failures`] instead of failing the call.
    ///
    /// # Errors
    ///
    /// Returns [`McpConnectionManagerError::Registry`] when the collision
    /// policy rejects a duplicate tool name.
    pub async fn aggregate_available_tools(&self) -> McpConnectionManagerResult<ToolAggregation> {
        let (ready, mut failures) = self.settle().await;
        let (catalogs, query_failures) = Self::query_catalogs(ready).await;
        failures.extend(query_failures);
        failures.sort_by_key(|failure| self.slot_of(failure.server()));

        Ok(ToolAggregation {
            registry: self.merge(catalogs)?,
            failures,
        })
    }

    /// Closes every connection that reached `ready`.
    ///
    /// Waits for pending connections to settle first, then closes all ready
    /// connections concurrently and waits for every close to finish. A
    /// failing close does not stop the others. Connections that failed to
    /// connect need no closing.
    ///
    /// The first call performs the close. Calls made while it is running wait
    /// for it and share its result. Calls made after it finished return
    /// `Ok(())` without further close attempts.
    ///
    /// # Errors
    ///
    /// Returns [`CloseError`] naming every server whose close failed.
    pub async fn close(&self) -> Result<(), CloseError> {
        if self.closed.initialized() {
            return Ok(());
        }
        self.closed
            .get_or_init(|| self.close_connections())
            .await
            .clone()
    }

    async fn close_connections(&self) -> Result<(), CloseError> {
        let (ready, _) = self.settle().await;
        let closing = ready
            .into_iter()
            .filter(|(record, _)| self.begin_close(record))
            .map(|(record, client)| async move {
                let outcome = client.close().await;
                match &outcome {
                    Ok(()) => debug!(server = %record.server, "MCP connection closed"),
                    Err(err) => {
                        warn!(server = %record.server, error = %err, "MCP connection failed to close cleanly");
                    }
                }
                (record, outcome)
            });
        let results = join_all(closing).await;

        let attempted = results.len();
        let failures: Vec<CloseFailure> = results
            .into_iter()
            .filter_map(|(record, outcome)| {
                outcome.err().map(|source| CloseFailure {
                    server: record.server.clone(),
                    source,
                })
            })
            .collect();

        if failures.is_empty() {
            info!(closed = attempted, "MCP connection manager closed");
            Ok(())
        } else {
            Err(CloseError { failures })
        }
    }

    /// Waits for every establishment and splits ready clients from failures.
    ///
    /// Only connections in the `ready` state are returned as ready; closed
    /// connections are skipped.
    async fn settle(&self) -> (Vec<(&ConnectionRecord, Arc<dyn McpClient>)>, Vec<ProviderFailure>) {
        let outcomes = join_all(self.records.iter().map(|record| {
            let establishment = record.establishment.clone();
            async move { (record, establishment.await) }
        }))
        .await;

        let mut ready = Vec::new();
        let mut failures = Vec::new();
        for (record, outcome) in outcomes {
            match outcome {
                Ok(client) if record.lifecycle().state().can_query_tools() => {
                    ready.push((record, client));
                }
                Ok(_) => {}
                Err(source) => failures.push(
                    ConnectionEstablishmentError {
                        server: record.server.clone(),
                        source,
                    }
                    .into(),
                ),
            }
        }
        (ready, failures)
    }

    async fn query_catalogs(
        ready: Vec<(&ConnectionRecord, Arc<dyn McpClient>)>,
    ) -> (Vec<(&McpServerName, Vec<McpToolDefinition>)>, Vec<ProviderFailure>) {
        let results = join_all(ready.into_iter().map(|(record, client)| async move {
            (record, client.list_tools().await)
        }))
        .await;

        let mut catalogs = Vec::new();
        let mut failures = Vec::new();
        for (record, outcome) in results {
            match outcome {
                Ok(tools) => catalogs.push((&record.server, tools)),
                Err(source) => {
                    warn!(server = %record.server, error = %source, "failed to list MCP tools");
                    failures.push(ProviderFailure::ListTools {
                        server: record.server.clone(),
                        source,
                    });
                }
            }
        }
        (catalogs, failures)
    }

    fn merge(
        &self,
        catalogs: Vec<(&McpServerName, Vec<McpToolDefinition>)>,
    ) -> McpConnectionManagerResult<ToolRegistry> {
        let mut builder = ToolRegistry::builder(self.collision_policy);
        for (server, tools) in catalogs {
            builder.register_catalog(server, tools)?;
        }
        let registry = builder.build();
        info!(
            tools = registry.len(),
            policy = %self.collision_policy,
            "aggregated MCP tool registry"
        );
        Ok(registry)
    }

    /// Moves a ready connection to `closed`; returns `false` when another
    /// caller already did.
    fn begin_close(&self, record: &ConnectionRecord) -> bool {
        record.lifecycle().mark_closed(&*self.clock).is_ok()
    }

    fn slot_of(&self, server: &McpServerName) -> Option<ConnectionSlot> {
        self.records
            .iter()
            .find(|record| &record.server == server)
            .map(|record| record.slot)
    }
}

fn spawn_establishment<T, C>(
    slot: ConnectionSlot,
    spec: McpServerSpec,
    connector: &Arc<T>,
    clock: &Arc<C>,
) -> ConnectionRecord
where
    T: McpClientConnector + ?Sized + 'static,
    C: Clock + Send + Sync + 'static,
{
    let server = spec.name().clone();
    let lifecycle = Arc::new(Mutex::new(ConnectionLifecycle::pending(
        server.clone(),
        &**clock,
    )));

    let task = tokio::spawn(establish(
        spec,
        Arc::clone(connector),
        Arc::clone(&lifecycle),
        Arc::clone(clock),
    ));
    let task_lifecycle = Arc::clone(&lifecycle);
    let task_clock = Arc::clone(clock);
    let establishment = async move {
        match task.await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                let error = McpClientError::runtime(join_error);
                record_outcome(&task_lifecycle, &Err(error.clone()), &*task_clock);
                Err(error)
            }
        }
    }
    .boxed()
    .shared();

    debug!(server = %server, %slot, "MCP connection launch initiated");
    ConnectionRecord {
        slot,
        server,
        lifecycle,
        establishment,
    }
}

async fn establish<T, C>(
    spec: McpServerSpec,
    connector: Arc<T>,
    lifecycle: Arc<Mutex<ConnectionLifecycle>>,
    clock: Arc<C>,
) -> EstablishmentOutcome
where
    T: McpClientConnector + ?Sized,
    C: Clock + Send + Sync,
{
    let outcome = connector.connect(&spec).await;
    record_outcome(&lifecycle, &outcome, &*clock);
    outcome
}

fn record_outcome(
    lifecycle: &Mutex<ConnectionLifecycle>,
    outcome: &EstablishmentOutcome,
    clock: &impl Clock,
) {
    let mut record = lock(lifecycle);
    let server = record.server().clone();
    let transition = match outcome {
        Ok(_) => {
            info!(server = %server, "MCP connection ready");
            record.mark_ready(clock)
        }
        Err(err) => {
            warn!(server = %server, error = %err, "MCP connection failed");
            record.mark_failed(err.to_string(), clock)
        }
    };
    if let Err(err) = transition {
        warn!(server = %server, error = %err, "ignored MCP connection transition");
    }
}
