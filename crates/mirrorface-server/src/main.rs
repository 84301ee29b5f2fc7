//! mirrorface-cache server — a read-through caching mirror for a model hub.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Result;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::Config;
use mirrorface_api::{create_router, metrics_routes, AppState};
use mirrorface_proxy::UpstreamProxy;

const BIND_ADDR: &str = "0.0.0.0:8000";

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    info!("starting mirrorface-cache v{}", env!("CARGO_PKG_VERSION"));

    tokio::fs::create_dir_all(&config.local_directory).await?;
    info!(store_root = %config.local_directory, "using local content-addressed store");
    info!(upstream = %config.upstream_url, "upstream hub configured");

    let state = AppState::new(
        PathBuf::from(&config.local_directory),
        config.upstream_url.clone(),
        UpstreamProxy::new().with_chunk_size(config.chunk_size),
    );

    let metrics_handle = init_metrics();

    let app = create_router(state)
        .merge(metrics_routes(std::sync::Arc::new(metrics_handle)))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = BIND_ADDR.parse()?;
    info!(addr = %addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn init_metrics() -> mirrorface_api::MetricsHandle {
    use metrics_exporter_prometheus::PrometheusBuilder;

    mirrorface_api::metrics_counters::describe();

    PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install the prometheus recorder")
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C handler");
    info!("shutdown signal received");
}
