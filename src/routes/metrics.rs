use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

/// Prometheus scrape endpoint, text exposition format.
pub async fn prometheus_metrics(State(handle): State<Arc<PrometheusHandle>>) -> impl IntoResponse {
    handle.render()
}

/// Registers descriptions for every metric the API and worker emit.
pub fn describe() {
    metrics::describe_counter!("orders_created_total", "Orders created, by payment status");
    metrics::describe_counter!("otp_requests_total", "Login codes issued");
    metrics::describe_counter!(
        "payment_verifications_total",
        "Client payment verifications, by outcome"
    );
    metrics::describe_counter!(
        "webhooks_received_total",
        "Razorpay webhook deliveries, by outcome"
    );
    metrics::describe_counter!("rate_limited_total", "Requests rejected by rate limiting");
    metrics::describe_histogram!(
        "checkout_seconds",
        metrics::Unit::Seconds,
        "Time to place a single-jar checkout order"
    );
}
