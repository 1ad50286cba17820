use crate::api::RequestMetricsSnapshot;
use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();

    let _ = TRACING_INIT.set(());
}

/// Logs a one-line summary of the portal requests issued during a run.
pub fn log_request_metrics(snapshot: &RequestMetricsSnapshot) {
    tracing::info!(
        target: "claimbatch::metrics",
        requests = snapshot.total_requests,
        errors = snapshot.total_errors,
        missing_token = snapshot.missing_token,
        average_latency_ms = format!("{:.2}", snapshot.average_latency_ms),
        error_rate = format!("{:.2}", snapshot.error_rate),
        "portal request metrics"
    );
}
