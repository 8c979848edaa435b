//! aerodeck - cluster admin backend
//!
//! Serves a JSON REST API for browsing namespaces and sets, reading and
//! writing records, and scanning or searching keys on a cluster.

use aerodeck_cluster::MemoryCluster;
use aerodeck_core::ConnectionManager;
use aerodeck_server::config::CONFIG_ENV;
use aerodeck_server::{run_metrics_server, ApiHandler, Config, Metrics, Server, ServerConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aerodeck")]
#[command(about = "Admin backend for key-value database clusters")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, env = CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Address to serve the REST API on (overrides the configuration)
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match Config::load_from(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };
    if let Some(bind) = cli.bind {
        config.http.bind_addr = bind;
    }
    if let Some(ref path) = cli.config {
        tracing::info!("Loaded config from {}", path.display());
    }

    tracing::info!("Starting aerodeck");
    tracing::info!("  Bind address: {}", config.http.bind_addr);
    tracing::info!("  API prefix: {:?}", config.http.api_prefix);
    tracing::info!(
        "  Default cluster: {}:{} (timeout {}s, send_key={})",
        config.cluster.default_host,
        config.cluster.default_port,
        config.cluster.connect_timeout_secs,
        config.cluster.send_key
    );
    tracing::info!(
        "  Memory cluster: {} node(s), {} namespace(s), seeds {:?}",
        config.memory.nodes.len(),
        config.memory.namespaces.len(),
        config.memory.seeds
    );

    let cluster = Arc::new(MemoryCluster::new(config.memory.clone()));
    let connections = Arc::new(
        ConnectionManager::new(cluster).with_settings(config.cluster.connection_settings()),
    );
    let handler = ApiHandler::new(connections.clone())
        .with_api_prefix(config.http.api_prefix.clone())
        .with_send_key(config.cluster.send_key);

    let mut server_config =
        ServerConfig::new(config.http.bind_addr).with_max_body_bytes(config.http.max_body_bytes);

    let metrics_handle = if config.metrics.enabled {
        let metrics = Arc::new(Metrics::new()?);
        server_config = server_config.with_metrics(metrics.clone());
        tracing::info!("  Metrics: enabled on {}", config.metrics.bind_addr);
        Some((metrics, config.metrics.bind_addr))
    } else {
        tracing::info!("  Metrics: disabled");
        None
    };

    let server = Arc::new(Server::new(server_config, handler));

    let metrics_task = metrics_handle.map(|(metrics, addr)| {
        let shutdown = server.subscribe_shutdown();
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(addr, metrics, shutdown).await {
                tracing::error!("Metrics server error: {}", e);
            }
        })
    });

    let shutdown_server = server.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        shutdown_server.shutdown();
    });

    // Blocks until shutdown
    server.run().await?;

    if let Some(task) = metrics_task {
        let _ = task.await;
    }

    connections.disconnect();
    tracing::info!("Server stopped");
    Ok(())
}
