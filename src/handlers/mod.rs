pub mod analyze;
pub mod health;

pub use analyze::*;
pub use health::*;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{logging_middleware, rate_limit_middleware};
use crate::state::AppState;

/// Builds the full application router. Only the analysis route is subject to
/// the concurrency limit.
pub fn create_router(state: AppState) -> Router {
    let analysis = Router::new()
        .route("/api/analyze", post(analyze_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            state.limiter.clone(),
            rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .merge(analysis)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(logging_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
                .layer(DefaultBodyLimit::max(state.body_limit_bytes())),
        )
        .with_state(state)
}
