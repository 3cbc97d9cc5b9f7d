use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::info;

use crate::state::AppState;

/// Health check endpoint
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let store_healthy = state.pipeline.store().is_healthy().await;
    let metrics = state.limiter.metrics();

    // A dead store degrades auditing only; analyses still succeed
    let status = if store_healthy { "healthy" } else { "degraded" };

    info!(
        status = status,
        store_healthy = store_healthy,
        "Health check completed"
    );

    Json(json!({
        "status": status,
        "timestamp": Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "completion_model": state.pipeline.completion().model(),
            "result_store": store_healthy
        },
        "rate_limiting": metrics
    }))
}

/// Readiness check: ready while the limiter still has free permits.
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if state.limiter.has_capacity() {
        StatusCode::OK
    } else {
        info!("Readiness check failed - request limiter saturated");
        StatusCode::SERVICE_UNAVAILABLE
    }
}
