use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};

use stream_outputs::{
    serve_metrics, Config, ConfigStore, HostCatalog, LoadOutcome, LoggingObserver,
    LoopbackTransportHost, OutputRegistry, PrometheusReporter,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();
    config.validate()?;

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    info!("Starting stream outputs");
    info!("  Config file: {}", config.config_file.display());
    info!("  Metrics port: {}", config.metrics_port);

    // Load the shared store before any output exists
    let mut store = ConfigStore::new(Box::new(config.to_backend()));
    match store.load() {
        LoadOutcome::Loaded => info!("Loaded outputs from {}", store.location()),
        LoadOutcome::Initialized => info!("No saved outputs, starting fresh"),
        LoadOutcome::Reset => error!("Saved outputs unreadable, starting from defaults"),
    }

    // Create infrastructure implementations (dependency injection)
    let host = Arc::new(LoopbackTransportHost::new(config.connect_delay()));
    info!("  Video encoders: {}", host.video_encoders().join(", "));
    info!("  Audio encoders: {}", host.audio_encoders().join(", "));
    let observer = Arc::new(LoggingObserver::new());
    let metrics_reporter = Arc::new(PrometheusReporter::new());

    // Create application service
    let mut registry = OutputRegistry::new(store, host, observer, metrics_reporter);
    let running = registry.running_flag();
    let commands = registry.command_sender();

    for output in registry.outputs() {
        info!("  {} [{}]: {}", output.name(), output.service().kind(), output.state());
    }

    for name in &config.start {
        commands.request_start(name.clone());
    }

    // Set up graceful shutdown
    let running_for_signal = running.clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let shutdown_tx = Arc::new(tokio::sync::Mutex::new(Some(shutdown_tx)));

    // Handle Ctrl+C
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return;
        }
        info!("Received shutdown signal");
        running_for_signal.store(false, Ordering::SeqCst);
        if let Some(tx) = shutdown_tx_clone.lock().await.take() {
            let _ = tx.send(());
        }
    });

    // Start metrics server
    let (addr, server) = serve_metrics(config.metrics_port, async {
        shutdown_rx.await.ok();
    });
    info!("Metrics server listening on http://{}", addr);
    let metrics_server = tokio::spawn(server);

    // The registry owns all output state and drains signals on this thread
    let registry_handle = tokio::task::spawn_blocking(move || {
        if let Err(e) = registry.run() {
            error!("Registry error: {}", e);
        }
    });

    registry_handle.await?;

    // Signal shutdown to metrics server
    if let Some(tx) = shutdown_tx.lock().await.take() {
        let _ = tx.send(());
    }

    metrics_server.await?;

    info!("Stream outputs shutdown complete");
    Ok(())
}
