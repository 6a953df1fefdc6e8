//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pipeline_renders_total` (counter): renders by status
//! - `pipeline_render_duration_seconds` (histogram): end-to-end render latency
//! - `pipeline_component_cache_total` (counter): component cache hits/misses
//! - `pipeline_rewrites_total` (counter): successful rewrites
//! - `pipeline_route_generation` (gauge): current route table generation
//! - `pipeline_routes` (gauge): routes in the current table
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations)
//! - Labels limited to status and outcome, never the raw pathname

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// One finished render.
pub fn record_render(status: u16, start: Instant) {
    counter!("pipeline_renders_total", "status" => status.to_string()).increment(1);
    histogram!("pipeline_render_duration_seconds").record(start.elapsed().as_secs_f64());
}

/// Component cache lookup outcome.
pub fn record_component_cache(hit: bool) {
    let outcome = if hit { "hit" } else { "miss" };
    counter!("pipeline_component_cache_total", "outcome" => outcome).increment(1);
}

pub fn record_rewrite() {
    counter!("pipeline_rewrites_total").increment(1);
}

/// A new route table went live.
pub fn record_route_generation(generation: u64, routes: usize) {
    gauge!("pipeline_route_generation").set(generation as f64);
    gauge!("pipeline_routes").set(routes as f64);
}
