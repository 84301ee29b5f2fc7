//! Application state

use std::path::PathBuf;
use std::sync::Arc;

use mirrorface_proxy::UpstreamProxy;

/// Type alias for the Prometheus metrics handle
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// State shared across every handler.
#[derive(Clone)]
pub struct AppState {
    /// Root of the local content-addressed store.
    pub store_root: Arc<PathBuf>,
    /// Base URL of the upstream hub, e.g. `https://huggingface.co`.
    pub upstream_url: Arc<String>,
    pub upstream: Arc<UpstreamProxy>,
}

impl AppState {
    pub fn new(store_root: PathBuf, upstream_url: String, upstream: UpstreamProxy) -> Self {
        Self {
            store_root: Arc::new(store_root),
            upstream_url: Arc::new(upstream_url),
            upstream: Arc::new(upstream),
        }
    }
}
