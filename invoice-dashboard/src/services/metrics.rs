//! Prometheus metrics for invoice-dashboard.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

/// Handle to the recorder behind the HTTP request metrics.
pub static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Invoice mutations by operation and outcome.
pub static INVOICE_MUTATIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_invoice_mutations_total",
        "Total number of invoice mutations",
        &["operation", "outcome"] // create|update|delete, ok|invalid|failed
    )
    .expect("Failed to register invoice_mutations_total")
});

/// Sign-in attempts by outcome.
pub static SIGN_IN_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_sign_in_attempts_total",
        "Total number of sign-in attempts",
        &["outcome"]
    )
    .expect("Failed to register sign_in_attempts_total")
});

/// View cache lookups by result.
pub static VIEW_CACHE_LOOKUPS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dashboard_view_cache_lookups_total",
        "Total number of rendered-view cache lookups",
        &["result"]
    )
    .expect("Failed to register view_cache_lookups_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dashboard_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register db_query_duration")
});

/// Install the HTTP metrics recorder and force the domain metrics.
pub fn init_metrics() -> Result<(), anyhow::Error> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;

    if METRICS_HANDLE.set(handle).is_err() {
        return Err(anyhow::anyhow!("Metrics recorder already initialized"));
    }

    Lazy::force(&INVOICE_MUTATIONS_TOTAL);
    Lazy::force(&SIGN_IN_ATTEMPTS_TOTAL);
    Lazy::force(&VIEW_CACHE_LOOKUPS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
    Ok(())
}

pub fn record_mutation(operation: &str, outcome: &str) {
    INVOICE_MUTATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
}

pub fn record_sign_in(outcome: &str) {
    SIGN_IN_ATTEMPTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn record_cache_lookup(hit: bool) {
    VIEW_CACHE_LOOKUPS_TOTAL
        .with_label_values(&[if hit { "hit" } else { "miss" }])
        .inc();
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let mut output = METRICS_HANDLE
        .get()
        .map(|handle| handle.render())
        .unwrap_or_default();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    output.push_str(&encoder.encode_to_string(&metric_families).unwrap_or_default());
    output
}
