use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;

use crate::handlers;
use crate::middleware::timing;
use crate::AppState;

/// Builds the full Axum `Router` with all routes and middleware.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Landing page ────────────────────────────────────────
        .route("/", get(handlers::status::landing))
        // ── Prometheus pull endpoint ────────────────────────────
        .route("/metrics", get(handlers::metrics::get_metrics))
        // ── Exporter status ─────────────────────────────────────
        .route("/api/status", get(handlers::status::get_status))
        // ── Provide shared state to all routes above ────────────
        .with_state(state)
        // ── Global middleware ───────────────────────────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
}
