//! Metrics collection and exposition.
//!
//! # Metrics
//! - `redirect_rules_dropped_total` (counter): rule lines dropped at
//!   compile time
//! - `redirect_matched_total` (counter): requests answered with a 307
//! - `redirect_rule_errors_total` (counter): per-rule faults treated
//!   as non-matches
//!
//! # Design Decisions
//! - Low-overhead updates (atomic increments via the `metrics` crate)
//! - Exposition is Prometheus scrape on a separate listener, enabled
//!   from config

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

pub use ::metrics::counter;

pub const RULES_DROPPED: &str = "redirect_rules_dropped_total";
pub const REDIRECTS_MATCHED: &str = "redirect_matched_total";
pub const RULE_ERRORS: &str = "redirect_rule_errors_total";

/// Install the Prometheus exporter and register metric descriptions.
/// Failure to bind the exporter is logged, not fatal; the counters
/// simply go unscraped.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => {
            ::metrics::describe_counter!(
                RULES_DROPPED,
                "Redirect rule lines dropped during compilation"
            );
            ::metrics::describe_counter!(
                REDIRECTS_MATCHED,
                "Requests answered with a redirect"
            );
            ::metrics::describe_counter!(
                RULE_ERRORS,
                "Per-rule faults treated as non-matches"
            );
            tracing::info!(address = %addr, "metrics exporter listening");
        }
        Err(error) => {
            tracing::error!(address = %addr, %error, "failed to install metrics exporter");
        }
    }
}
