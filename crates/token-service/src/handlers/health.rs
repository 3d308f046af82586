//! Health check handlers.
//!
//! - `/health`: liveness, always OK while the process serves requests
//! - `/ready`: readiness, OK only when tokens can actually be issued

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 503 while any room service value is unset. The response does not
/// say which one; that detail is logged server-side.
#[tracing::instrument(skip_all, name = "token.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.config.room_service() {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                error: None,
            }),
        ),
        Err(report) => {
            tracing::warn!(
                target: "token.health",
                report = ?report,
                "Readiness check failed: room service configuration incomplete"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    error: Some("Service configuration incomplete".to_string()),
                }),
            )
        }
    }
}
