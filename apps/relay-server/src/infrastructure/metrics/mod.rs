//! Prometheus Metrics Module
//!
//! Exposes relay metrics in Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Connections**: opened/closed counts per endpoint, live gauges
//! - **Messages**: inbound messages and read errors per endpoint
//! - **Fan-out**: broadcast deliveries, failures, and latency
//! - **Ticker**: ticks written
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the relay port. Recording calls
//! are no-ops until `init_metrics` installs the recorder.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle created by the first one.
///
/// # Panics
///
/// Panics if another global recorder was installed first.
#[allow(clippy::expect_used)]
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "relay_connections_opened_total",
        "Total WebSocket connections accepted"
    );
    describe_counter!(
        "relay_connections_closed_total",
        "Total WebSocket connections torn down"
    );
    describe_gauge!(
        "relay_chat_connections",
        "Number of registered chat connections"
    );
    describe_gauge!(
        "relay_ticker_sessions",
        "Number of active ticker sessions"
    );

    describe_counter!(
        "relay_messages_received_total",
        "Total messages read from clients"
    );
    describe_counter!(
        "relay_read_errors_total",
        "Total non end-of-stream read errors"
    );

    describe_counter!(
        "relay_broadcast_deliveries_total",
        "Total successful broadcast writes"
    );
    describe_counter!(
        "relay_broadcast_failures_total",
        "Total failed broadcast writes"
    );
    describe_histogram!(
        "relay_broadcast_fanout_seconds",
        "Time to write one broadcast to every peer"
    );

    describe_counter!("relay_ticks_sent_total", "Total ticks written");
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Metric label for the endpoint a connection came in on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    /// Chat relay endpoint.
    Chat,
    /// Order book ticker endpoint.
    Ticker,
}

impl ConnectionKind {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Ticker => "ticker",
        }
    }
}

/// Record an accepted connection.
pub fn record_connection_opened(kind: ConnectionKind) {
    counter!("relay_connections_opened_total", "kind" => kind.as_str()).increment(1);
}

/// Record a torn-down connection.
pub fn record_connection_closed(kind: ConnectionKind) {
    counter!("relay_connections_closed_total", "kind" => kind.as_str()).increment(1);
}

/// Update the registered chat connection gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_chat_connections(count: usize) {
    gauge!("relay_chat_connections").set(count as f64);
}

/// Update the active ticker session gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_ticker_sessions(count: usize) {
    gauge!("relay_ticker_sessions").set(count as f64);
}

/// Record a message read from a client.
pub fn record_message_received(kind: ConnectionKind) {
    counter!("relay_messages_received_total", "kind" => kind.as_str()).increment(1);
}

/// Record a non end-of-stream read error.
pub fn record_read_error(kind: ConnectionKind) {
    counter!("relay_read_errors_total", "kind" => kind.as_str()).increment(1);
}

/// Record the outcome of one broadcast.
pub fn record_broadcast(delivered: u64, failed: u64, duration: Duration) {
    counter!("relay_broadcast_deliveries_total").increment(delivered);
    counter!("relay_broadcast_failures_total").increment(failed);
    histogram!("relay_broadcast_fanout_seconds").record(duration.as_secs_f64());
}

/// Record a tick written to a ticker client.
pub fn record_tick_sent() {
    counter!("relay_ticks_sent_total").increment(1);
}

// =============================================================================
// Tests
// =============================================================================
