//! Docker Stats Exporter
//!
//! Samples per-container resource usage and liveness from the Docker Engine
//! and publishes derived metrics to CloudWatch via Embedded Metric Format.
//! Runs either once (cron style) or on a fixed interval.

use anyhow::{Context, Result};
use clap::Parser;
use exporter_lib::{
    collector::{CollectionCycleBuilder, CollectionLoop, ContainerRuntime, DockerClient, LoopConfig},
    emitter::{EmfSink, EmfTransport, EmissionBatcher, EmitterConfig},
    observability::StructuredLogger,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const EXPORTER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Publish Docker container stats as CloudWatch metrics
#[derive(Parser, Debug)]
#[command(name = "docker-stats-exporter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long, short, env = "EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Run a single collection cycle and exit
    #[arg(long)]
    once: bool,

    /// Substring selecting containers for status reporting
    #[arg(long)]
    selector: Option<String>,

    /// Host name reported as the HostName dimension
    #[arg(long)]
    host_name: Option<String>,
}

fn init_tracing(format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match format {
        "pretty" => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
        _ => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = config::Overrides {
        run_once: cli.once,
        status_selector: cli.selector,
        host_name: cli.host_name,
    };
    let config = config::ExporterConfig::load(cli.config.as_deref(), &overrides)?;

    // Logs go to stderr so stdout stays clean for the EMF stdout sink
    init_tracing(&config.log_format);

    let logger = StructuredLogger::new(&config.host_name);
    logger.log_startup(EXPORTER_VERSION, &config.namespace, &config.status_selector);

    // Collaborators; any failure here is fatal
    let runtime = DockerClient::new(
        &config.docker_endpoint,
        config.docker_timeout(),
        config.include_stopped,
    )?;
    runtime
        .ping()
        .await
        .with_context(|| format!("Docker Engine not reachable at {}", config.docker_endpoint))?;
    info!(endpoint = %config.docker_endpoint, "Connected to Docker Engine");

    let transport = EmfTransport::parse(&config.sink_endpoint)?;
    let sink = Arc::new(EmfSink::new(transport));

    let batcher = EmissionBatcher::new(
        sink,
        EmitterConfig {
            namespace: config.namespace.clone(),
            timeout: config.sink_timeout(),
            max_retries: config.sink_max_retries,
            retry_backoff: config.sink_retry_backoff(),
        },
        logger.clone(),
    );

    let cycle = CollectionCycleBuilder::new()
        .runtime(Arc::new(runtime))
        .batcher(Arc::new(batcher))
        .host_name(config.host_name.clone())
        .status_selector(config.status_selector.clone())
        .concurrency(config.concurrency)
        .build()?;

    let collection_loop = CollectionLoop::new(
        cycle,
        LoopConfig {
            interval: config.interval(),
            jitter: config.jitter(),
        },
    );

    if config.run_once {
        collection_loop.run_cycle().await;
        logger.log_shutdown("single cycle complete");
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(collection_loop.run(shutdown_rx));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    let _ = shutdown_tx.send(());

    let cycles = loop_handle.await?;
    info!(cycles = cycles, "Shutting down");

    Ok(())
}
