use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// GET /metrics — Prometheus text exposition of the recognition and
/// rendering counters.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Register descriptions for every metric the services record.
pub fn describe_metrics() {
    metrics::describe_counter!(
        "recognition_tier_total",
        "Recognition outcomes by the cascade tier that produced them"
    );
    metrics::describe_counter!(
        "recognition_fallback_total",
        "Recognition tiers skipped because they were unavailable"
    );
    metrics::describe_counter!(
        "batch_items_total",
        "Batch items processed, labelled by result"
    );
    metrics::describe_histogram!(
        "document_render_seconds",
        "Time to decode, lay out and encode one document"
    );
}
