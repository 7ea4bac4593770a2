//! Health check endpoint.
//!
//! Returns 200 OK when the cache backend is reachable,
//! 503 Service Unavailable otherwise.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    redis: bool,
    cache_entries: u64,
}

/// Health check handler.
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let redis = state.redis_healthy().await;

    let (status, status_code) = if redis {
        ("healthy", StatusCode::OK)
    } else {
        ("unhealthy", StatusCode::SERVICE_UNAVAILABLE)
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            redis,
            cache_entries: state.cache().stats().l1_entry_count,
        }),
    )
}

/// Create the health check router.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
