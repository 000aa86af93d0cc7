//! Metrics collection and exposition.
//!
//! # Metrics
//! - `kws_connections_total` (counter): accepted websocket connections
//! - `kws_active_connections` (gauge): live websocket connections
//! - `kws_connections_closed_total` (counter): closed connections by `reason`
//! - `kws_messages_forwarded_total` (counter): frames written to clients
//! - `kws_encode_fallbacks_total` (counter): envelopes replaced by raw values
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is opt-in via `observability.metrics_enabled`

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics available at /metrics");
    Ok(())
}

pub fn connection_opened() {
    counter!("kws_connections_total").increment(1);
    gauge!("kws_active_connections").increment(1.0);
}

pub fn connection_released() {
    gauge!("kws_active_connections").decrement(1.0);
}

pub fn connection_closed(reason: &'static str) {
    counter!("kws_connections_closed_total", "reason" => reason).increment(1);
}

pub fn message_forwarded() {
    counter!("kws_messages_forwarded_total").increment(1);
}

pub fn record_encode_fallback() {
    counter!("kws_encode_fallbacks_total").increment(1);
}
