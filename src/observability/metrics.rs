//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_probes_total` (counter): probes by endpoint and result
//! - `bridge_probe_duration_seconds` (histogram): probe latency by endpoint
//! - `bridge_endpoint_up` (gauge): 1=up, 0=down
//! - `bridge_tickets_total` (counter): ticket attempts by kind and outcome
//! - `bridge_cycle_duration_seconds` (histogram): duration of a full polling cycle
//!
//! The `endpoint` label is the endpoint's store key (trimmed URL, no trailing `/`).
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder with an HTTP scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Prometheus metrics listener started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_probe(endpoint: &str, healthy: bool, start: Instant) {
    let result = if healthy { "healthy" } else { "unhealthy" };
    counter!("bridge_probes_total", "endpoint" => endpoint.to_string(), "result" => result)
        .increment(1);
    histogram!("bridge_probe_duration_seconds", "endpoint" => endpoint.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_endpoint_state(endpoint: &str, up: bool) {
    gauge!("bridge_endpoint_up", "endpoint" => endpoint.to_string()).set(if up { 1.0 } else { 0.0 });
}

pub fn record_ticket(kind: &'static str, success: bool) {
    let outcome = if success { "created" } else { "failed" };
    counter!("bridge_tickets_total", "kind" => kind, "outcome" => outcome).increment(1);
}

pub fn record_cycle(start: Instant) {
    histogram!("bridge_cycle_duration_seconds").record(start.elapsed().as_secs_f64());
}
