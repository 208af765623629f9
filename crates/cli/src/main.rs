use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use multibeacon_core::{
    config::{AppConfig, UpstreamProvider},
    upstream::{DispatchMode, RequestContext},
    MultiClient,
};
use std::time::Duration;
use tokio::{signal, sync::broadcast, task::JoinHandle};
use tracing::{debug, info, warn};

mod commands;
mod logging;

use commands::{
    handle_config_command, handle_query_command, utils::parse_upstream, ConfigCommands,
    QueryCommands,
};

#[derive(Parser)]
#[command(name = "multibeacon")]
#[command(about = "Query beacon chain data across several beacon nodes with failover")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(
        short,
        long,
        global = true,
        env = "MULTIBEACON_CONFIG",
        default_value = "config/config.toml"
    )]
    config: String,

    /// Beacon node as name=url, replacing the configured nodes (repeatable)
    #[arg(short, long = "upstream", global = true, value_parser = parse_upstream)]
    upstreams: Vec<UpstreamProvider>,

    /// Race nodes in parallel instead of trying them one at a time
    #[arg(long, global = true)]
    parallel: bool,

    /// Per-request timeout in seconds
    #[arg(short, long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Query(QueryCommands),

    /// Configuration Management
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Loads the config file and applies command line overrides.
fn load_config(path: &str, upstreams: Vec<UpstreamProvider>, parallel: bool) -> Result<AppConfig> {
    let mut config = AppConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {path}"))?;

    if !upstreams.is_empty() {
        config.upstreams.providers = upstreams;
    }
    if parallel {
        config.dispatch.mode = DispatchMode::Parallel;
    }

    config.validate().map_err(|e| anyhow!("invalid configuration: {e}"))?;
    Ok(config)
}

/// Cancels `ctx` on Ctrl+C.
fn cancel_on_interrupt(ctx: &RequestContext) {
    let ctx = ctx.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling request");
            ctx.cancel();
        }
    });
}

/// Signals the health monitor to stop and waits for it. Returns `false` if the monitor
/// task panicked or was aborted.
async fn stop_health_monitor(
    shutdown: &broadcast::Sender<()>,
    handle: Option<JoinHandle<()>>,
) -> bool {
    let _ = shutdown.send(());
    let Some(handle) = handle else {
        return true;
    };
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "health monitor task failed");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let query = match cli.command {
        Commands::Config(command) => return handle_config_command(command, &cli.config),
        Commands::Query(query) => query,
    };

    let config = load_config(&cli.config, cli.upstreams, cli.parallel)?;
    logging::init_logging(&config.logging);

    let client = MultiClient::builder().from_config(&config).build()?;
    info!(
        nodes = client.pool().len(),
        mode = %config.dispatch.mode,
        "multibeacon client ready"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let health_handle = config.health_check.enabled.then(|| {
        client
            .health_monitor(config.health_check_interval(), config.probe_timeout())
            .start_with_shutdown(shutdown_tx.subscribe())
    });

    let ctx = RequestContext::new();
    cancel_on_interrupt(&ctx);

    let timeout = cli.timeout.map(Duration::from_secs);
    let result = handle_query_command(query, &client, &ctx, timeout).await;

    stop_health_monitor(&shutdown_tx, health_handle).await;

    result
}
