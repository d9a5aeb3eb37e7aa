//! Metrics collection.
//!
//! Metrics go through the `metrics` facade; install any recorder (for
//! example a Prometheus exporter) to collect them. Without one every call is
//! a no-op.
//!
//! # Metrics
//! - `http_driver_requests_total` (counter): calls started, by method
//! - `http_driver_responses_total` (counter): terminal outcomes, by outcome
//!   (`ok`, `status`, `transport`, `validation`, `attachment`, `cancelled`)
//! - `http_driver_request_duration_seconds` (histogram): call latency

use std::time::Duration;

/// Recording switch owned by one driver and copied into its response streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriverMetrics {
    enabled: bool,
}

impl DriverMetrics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record_request_started(&self, method: &str) {
        if !self.enabled {
            return;
        }
        ::metrics::counter!("http_driver_requests_total", "method" => method.to_ascii_uppercase())
            .increment(1);
    }

    pub fn record_outcome(&self, outcome: &'static str, elapsed: Duration) {
        if !self.enabled {
            return;
        }
        ::metrics::counter!("http_driver_responses_total", "outcome" => outcome).increment(1);
        ::metrics::histogram!("http_driver_request_duration_seconds", "outcome" => outcome)
            .record(elapsed.as_secs_f64());
    }

    pub fn record_cancelled(&self) {
        if !self.enabled {
            return;
        }
        ::metrics::counter!("http_driver_responses_total", "outcome" => "cancelled").increment(1);
    }
}

impl Default for DriverMetrics {
    fn default() -> Self {
        Self::new(true)
    }
}
