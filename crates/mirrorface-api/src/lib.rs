//! The mirrorface-cache HTTP gateway: health, metrics, and the `/mirror`
//! read-through caching endpoint.

pub mod error;
pub mod metrics_counters;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, metrics_routes};
pub use state::{AppState, MetricsHandle};
