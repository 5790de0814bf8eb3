use axum::{extract::State, response::Html, Json};
use std::sync::Arc;

use crate::metrics::StatusSnapshot;
use crate::AppState;

const LANDING_PAGE: &str = r#"<html>
<head><title>Aerospike exporter</title></head>
<body>
<h1>Aerospike exporter</h1>
<p><a href="/metrics">Metrics</a></p>
<p><a href="/api/status">Status</a></p>
</body>
</html>"#;

// ─── GET / ───────────────────────────────────────────────────────

pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

// ─── GET /api/status ─────────────────────────────────────────────
/// JSON summary of the exporter's own scrapes, for curl and debugging.

pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusSnapshot> {
    Json(state.stats.snapshot())
}
