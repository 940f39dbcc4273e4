//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{admission, health, metrics};
use crate::state::WebhookState;

/// Path the API server posts pod admission reviews to.
pub const ADD_POD_SCHEDULING_GATE_PATH: &str = "/add-pod-scheduling-gate";

/// Create the webhook router with all routes and middleware.
///
/// # Routes
///
/// - `POST /add-pod-scheduling-gate` - Pod admission review
/// - `GET /health` - Health check
/// - `GET /metrics` - Prometheus metrics
pub fn create_router(state: WebhookState) -> Router {
    let max_body_bytes = state.config.max_body_bytes;

    Router::new()
        .route(
            ADD_POD_SCHEDULING_GATE_PATH,
            post(admission::add_pod_scheduling_gate),
        )
        .route("/health", get(health::health))
        .route("/metrics", get(metrics::metrics))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
