//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): proxy requests by outcome
//! - `proxy_request_duration_seconds` (histogram): proxy latency
//! - `relay_connections_active` (gauge): open relay connections
//! - `relay_rooms_active` (gauge): rooms with at least one member
//! - `relay_messages_total` (counter): inbound frames by sender role
//! - `relay_deliveries_total` (counter): frames handed to peer queues
//! - `relay_deliveries_dropped_total` (counter): frames skipped for full or closed peers
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::relay::message::Role;

/// Install the Prometheus recorder and its scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()
}

pub fn record_proxy(outcome: &'static str, start_time: Instant) {
    counter!("proxy_requests_total", "outcome" => outcome).increment(1);
    histogram!("proxy_request_duration_seconds").record(start_time.elapsed().as_secs_f64());
}

pub fn set_relay_connections(active: u64) {
    gauge!("relay_connections_active").set(active as f64);
}

pub fn set_relay_rooms(active: usize) {
    gauge!("relay_rooms_active").set(active as f64);
}

pub fn record_relay_message(sender: Role, delivered: usize, dropped: usize) {
    counter!("relay_messages_total", "role" => sender.as_str()).increment(1);
    counter!("relay_deliveries_total").increment(delivered as u64);
    if dropped > 0 {
        counter!("relay_deliveries_dropped_total").increment(dropped as u64);
    }
}
