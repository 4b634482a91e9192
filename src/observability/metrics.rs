//! Metrics collection and exposition.
//!
//! # Metrics
//! - `auth_requests_total` (counter): authentication attempts by transport, outcome
//! - `echo_requests_total` (counter): echo calls by transport, status
//! - `echo_request_duration_seconds` (histogram): echo latency by transport

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::auth::Transport;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), metrics_exporter_prometheus::BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_auth(transport: Transport, success: bool) {
    let outcome = if success { "success" } else { "denied" };
    counter!(
        "auth_requests_total",
        "transport" => transport.as_str(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_echo(transport: Transport, status: &'static str, start: Instant) {
    counter!(
        "echo_requests_total",
        "transport" => transport.as_str(),
        "status" => status
    )
    .increment(1);
    histogram!(
        "echo_request_duration_seconds",
        "transport" => transport.as_str()
    )
    .record(start.elapsed().as_secs_f64());
}
