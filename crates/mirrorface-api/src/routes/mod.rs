//! API routes

mod health;
mod mirror;
mod metrics;

use axum::Router;

use crate::state::AppState;

/// Create the main router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(mirror::routes())
        .with_state(state)
}

pub use metrics::routes as metrics_routes;
