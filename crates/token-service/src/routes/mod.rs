//! HTTP routes for the Token Issuer.

use crate::config::Config;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub use crate::observability::init_metrics_recorder;

/// Application state shared across all handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,
}

/// Build the application routes.
///
/// - `POST /api/token` - issue a room token (any other method: 405)
/// - `GET /health` - liveness
/// - `GET /ready` - readiness
/// - `GET /metrics` - Prometheus scrape
///
/// Layers, innermost first: 30 second timeout, request tracing, HTTP metrics.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route(
            "/api/token",
            post(handlers::handle_issue_token).fallback(handlers::method_not_allowed),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    api_routes
        .merge(metrics_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
