//! Connects the configured MCP servers and gates a replayed response.
//!
//! Usage:
//!
//! ```text
//! mcp_agent [--settings <settings.json>] [--fragments <fragments.jsonl>]
//!           [--approve-all] [--max-tool-calls <n>]
//! ```
//!
//! Without `--settings` the default `filesystem` server is launched. The
//! aggregated tool list is printed to standard output. With `--fragments`
//! the JSON-lines script is replayed through the confirmation-gated loop and
//! every tool call is confirmed on the terminal unless `--approve-all` is
//! given. Logs go to standard error and honour `RUST_LOG`.

use clap::Parser;
use eyre::WrapErr;
use mcp_agent::config::McpAgentSettings;
use mcp_agent::execution::{
    adapters::{PromptAuthorizer, StaticAuthorizer, TracingFragmentObserver, fragment_script},
    ports::ToolCallAuthorizer,
    services::ConfirmationGatedLoop,
};
use mcp_agent::tool_registry::{
    adapters::stdio::StdioMcpConnector, domain::ToolRegistry, services::McpConnectionManager,
};
use mockable::DefaultClock;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(version, about = "Run MCP tools behind operator confirmation")]
struct Cli {
    /// JSON settings file with an `mcpServers` map.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// JSON-lines response fragments to replay.
    #[arg(long)]
    fragments: Option<PathBuf>,

    /// Approve every tool call without prompting.
    #[arg(long)]
    approve_all: bool,

    /// Stop after this many tool calls; overrides the settings file.
    #[arg(long)]
    max_tool_calls: Option<usize>,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = match &cli.settings {
        Some(path) => McpAgentSettings::load(path)
            .wrap_err_with(|| format!("loading settings from {}", path.display()))?,
        None => McpAgentSettings::default(),
    };

    let connector =
        StdioMcpConnector::new().with_request_timeout(settings.request_timeout());
    let manager = McpConnectionManager::connect(
        settings.servers().clone(),
        Arc::new(connector),
        Arc::new(DefaultClock),
    )
    .with_collision_policy(settings.collision_policy());
    info!(servers = manager.len(), "connecting MCP servers");

    let registry = match manager.aggregate_tools().await {
        Ok(registry) => registry,
        Err(err) => {
            if let Err(close_err) = manager.close().await {
                warn!(error = %close_err, "teardown after failed aggregation");
            }
            return Err(err).wrap_err("aggregating MCP tools");
        }
    };
    if let Err(err) = print_tools(&registry) {
        if let Err(close_err) = manager.close().await {
            warn!(error = %close_err, "teardown after failed tool listing");
        }
        return Err(err.wrap_err("printing aggregated tools"));
    }

    let Some(fragments_path) = &cli.fragments else {
        manager.close().await.wrap_err("closing MCP servers")?;
        return Ok(());
    };

    let authorizer: Arc<dyn ToolCallAuthorizer> = if cli.approve_all {
        Arc::new(StaticAuthorizer::approve_all())
    } else {
        Arc::new(PromptAuthorizer::stdio())
    };
    let mut gated_loop =
        ConfirmationGatedLoop::new(registry, authorizer, Arc::new(TracingFragmentObserver));
    if let Some(limit) = cli.max_tool_calls.or_else(|| settings.max_tool_calls()) {
        gated_loop = gated_loop.with_max_tool_calls(limit);
    }

    let cancel = CancellationToken::new();
    let script = match tokio::fs::File::open(fragments_path).await {
        Ok(file) => file,
        Err(err) => {
            if let Err(close_err) = manager.close().await {
                warn!(error = %close_err, "teardown after unreadable script");
            }
            return Err(err)
                .wrap_err_with(|| format!("opening {}", fragments_path.display()));
        }
    };
    let summary = gated_loop
        .run(fragment_script(script), &manager, &cancel)
        .await
        .wrap_err("running confirmation-gated loop")?;
    info!(
        outcome = %summary.outcome,
        fragments = summary.fragments_processed,
        approved = summary.tool_calls_approved,
        "run complete"
    );
    Ok(())
}

fn print_tools(registry: &ToolRegistry) -> eyre::Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Tools ({}):", registry.len())?;
    for tool in registry.iter() {
        let description = tool.definition().description().unwrap_or_default();
        writeln!(stdout, "  {} [{}] {description}", tool.name(), tool.owning_server())?;
    }
    Ok(())
}
