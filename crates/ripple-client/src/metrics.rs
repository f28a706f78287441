//! Metrics collection and export for Ripple.
//!
//! Uses the `metrics` crate for instrumentation and exports
//! to Prometheus format.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::info;

use crate::supervisor::ConnectionState;

/// Metric names.
pub mod names {
    pub const EVENTS_RECEIVED: &str = "ripple_events_received_total";
    pub const EVENTS_ACCEPTED: &str = "ripple_events_accepted_total";
    pub const EVENTS_DROPPED: &str = "ripple_events_dropped_total";
    pub const EVENTS_HIDDEN: &str = "ripple_events_hidden_total";
    pub const CONNECTION_ATTEMPTS: &str = "ripple_connection_attempts_total";
    pub const CONNECTION_STATE: &str = "ripple_connection_state";
    pub const BACKOFF_SECONDS: &str = "ripple_backoff_seconds";
    pub const PUBLISH_TOTAL: &str = "ripple_publish_total";
    pub const ERRORS_TOTAL: &str = "ripple_errors_total";
}

/// Initialize the metrics system.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::EVENTS_RECEIVED,
        "Events received from the transport, before deduplication"
    );
    metrics::describe_counter!(names::EVENTS_ACCEPTED, "Events accepted by the cursor tracker");
    metrics::describe_counter!(
        names::EVENTS_DROPPED,
        "Redelivered or stale events discarded by the cursor tracker"
    );
    metrics::describe_counter!(
        names::EVENTS_HIDDEN,
        "Subscriber deliveries suppressed by visibility"
    );
    metrics::describe_counter!(names::CONNECTION_ATTEMPTS, "Transport open attempts");
    metrics::describe_gauge!(
        names::CONNECTION_STATE,
        "Connection state (0 idle, 1 connecting, 2 open, 3 reconnecting, 4 failed)"
    );
    metrics::describe_histogram!(names::BACKOFF_SECONDS, "Scheduled reconnect delays in seconds");
    metrics::describe_counter!(names::PUBLISH_TOTAL, "Outbound publish attempts by outcome");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the server cannot be started.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a delivery batch as seen by the tracker.
pub fn record_batch(received: usize, accepted: usize) {
    counter!(names::EVENTS_RECEIVED).increment(received as u64);
    counter!(names::EVENTS_ACCEPTED).increment(accepted as u64);
    counter!(names::EVENTS_DROPPED).increment(received.saturating_sub(accepted) as u64);
}

/// Record subscriber deliveries suppressed by visibility.
pub fn record_hidden(count: usize) {
    if count > 0 {
        counter!(names::EVENTS_HIDDEN).increment(count as u64);
    }
}

/// Record a transport open attempt.
pub fn record_attempt() {
    counter!(names::CONNECTION_ATTEMPTS).increment(1);
}

/// Update the connection state gauge.
pub fn set_connection_state(state: ConnectionState) {
    gauge!(names::CONNECTION_STATE).set(state.as_gauge());
}

/// Record a scheduled reconnect delay.
pub fn record_backoff(delay: Duration) {
    histogram!(names::BACKOFF_SECONDS).record(delay.as_secs_f64());
}

/// Record a publish outcome.
pub fn record_publish(outcome: &str) {
    counter!(names::PUBLISH_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

/// Record an error.
pub fn record_error(error_type: &str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder() {
        // No recorder installed: every call is a no-op.
        record_batch(3, 1);
        record_hidden(2);
        set_connection_state(ConnectionState::Open);
        record_backoff(Duration::from_secs(1));
    }
}
