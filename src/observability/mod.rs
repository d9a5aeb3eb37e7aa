//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! response streams and the driver produce:
//!     → logging.rs (structured tracing events: request_id, method, url, status, elapsed_ms)
//!     → metrics.rs (counters and a latency histogram via the metrics facade)
//! ```
//!
//! # Design Decisions
//! - Request ID (UUID v4 per response stream) appears in every event
//! - Each driver owns its metrics switch; streams carry a copy of it

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::DriverMetrics;
