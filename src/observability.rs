use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

// ── Lifecycle ───────────────────────────────────────────────────

/// Counter: committed transitions. Labels: action, status.
pub const TRANSITIONS_TOTAL: &str = "slotkeep_transitions_total";

/// Counter: create/reschedule attempts rejected because the slot was taken or closed.
pub const SLOT_CONFLICTS_TOTAL: &str = "slotkeep_slot_conflicts_total";

/// Counter: notifications that failed or timed out after a commit.
pub const NOTIFY_FAILURES_TOTAL: &str = "slotkeep_notify_failures_total";

/// Counter: bookings completed by the background sweeper.
pub const COMPLETIONS_SWEPT_TOTAL: &str = "slotkeep_completions_swept_total";

// ── Availability ────────────────────────────────────────────────

/// Counter: availability queries. Labels: query (day, check, range).
pub const SLOT_QUERIES_TOTAL: &str = "slotkeep_slot_queries_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(port: Option<u16>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Global subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
