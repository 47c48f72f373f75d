// pace-pro-sw - offline caching worker for the PACE PRO web app

use anyhow::{Context, Result};
use clap::Parser;
use pace_pro_sw::cache::storage_from_config;
use pace_pro_sw::cli::Args;
use pace_pro_sw::config::AppConfig;
use pace_pro_sw::host::LocalHost;
use pace_pro_sw::network::HttpNetwork;
use pace_pro_sw::server::create_router;
use pace_pro_sw::utils::logging;
use pace_pro_sw::worker::ServiceWorker;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};

fn main() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Phase 1: Load configuration
    let mut config = AppConfig::load(args.config.as_deref())?;
    args.apply(&mut config);
    config.validate()?;

    if args.print_config {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Phase 2: Initialize logging
    logging::init(&config.logging)?;
    info!("Starting pace-pro-sw v{}", env!("CARGO_PKG_VERSION"));
    pace_pro_sw::metrics::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.workers.max(1))
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;

    runtime.block_on(run(config))
}

async fn run(config: AppConfig) -> Result<()> {
    // Phase 3: Wire host capabilities
    let storage = storage_from_config(&config.cache)?;
    info!("Cache storage: {} backend", storage.backend());
    let network = Arc::new(HttpNetwork::new(&config.network)?);
    let host = Arc::new(LocalHost::new(&config.host));

    let worker = Arc::new(ServiceWorker::from_config(&config, storage, network, host)?);

    // Phase 4: Install and activate this version
    info!(
        "Registering worker for {} (precache {})",
        config.worker.app_origin,
        config.worker.precache_name()
    );
    if let Err(e) = worker.start().await {
        warn!("Worker did not activate, requests will pass through: {}", e);
    }

    // Phase 5: Build and start HTTP server
    let app = create_router(config.clone(), worker.clone())?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Phase 6: Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Waiting for pending cache writes");
    worker.manager().wait_for_background_tasks().await;

    info!("Server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}
