use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::info;

use crate::metrics::{exposition, ScrapeRecord};
use crate::scrape;
use crate::AppState;

use super::AppError;

// ─── GET /metrics ────────────────────────────────────────────────
/// Runs one poll cycle against the node and returns the exposition text.

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let outcome = state.scraper.scrape().await;

    state.stats.record(ScrapeRecord {
        duration: outcome.duration,
        up: outcome.up,
        report_errors: outcome.errors.iter().map(ToString::to_string).collect(),
    });
    info!(
        node = state.scraper.node(),
        up = outcome.up,
        samples = outcome.samples.len(),
        errors = outcome.errors.len(),
        elapsed_ms = outcome.duration.as_millis() as u64,
        "scrape finished"
    );

    let mut samples = outcome.samples;
    samples.extend(scrape::self_samples(outcome.up, state.stats.total_scrapes()));
    let body = exposition::render(&samples)?;

    Ok(([(header::CONTENT_TYPE, exposition::content_type())], body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::info::client::tests::spawn_fake_node;
    use crate::scrape::ReportKind;
    use crate::test_state;
    use std::collections::HashMap;

    async fn body_text(resp: Response) -> String {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let addr = spawn_fake_node(HashMap::from([
            ("statistics".to_string(), "cluster_size=3".to_string()),
            (
                "latency:".to_string(),
                "error-no-data-yet-or-back-too-small;{sys}-read:15:26:23-GMT,ops/sec,>1ms,>8ms,>64ms;15:26:33,54.4,1.10,0.55,0.00"
                    .to_string(),
            ),
        ]))
        .await;
        let state = test_state(&addr, &[ReportKind::Stats, ReportKind::Latency]);

        let resp = get_metrics(State(state.clone())).await.unwrap();
        assert!(resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/plain"));

        let text = body_text(resp).await;
        assert!(text.contains("aerospike_node_cluster_size 3"));
        assert!(text.contains("aerospike_node_up 1"));
        assert!(text.contains("aerospike_node_scrapes_total 1"));
        assert!(text.contains(r#"aerospike_latency_read{namespace="sys",threshold=">8ms"} 0.55"#));
        assert!(text.contains(r#"aerospike_latency_hist_read_bucket{le="+Inf",namespace="sys"} 54.4"#));
        assert!(text.contains(r#"aerospike_ops_read{namespace="sys"} 54.4"#));

        assert_eq!(state.stats.snapshot().total_scrapes, 1);
    }

    #[tokio::test]
    async fn test_metrics_when_node_down() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        let state = test_state(&addr, &[]);

        let text = body_text(get_metrics(State(state.clone())).await.unwrap()).await;
        assert!(text.contains("aerospike_node_up 0"));
        assert_eq!(state.stats.snapshot().failed_scrapes, 1);
    }
}
