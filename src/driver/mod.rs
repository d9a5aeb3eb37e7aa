//! Driver orchestration.
//!
//! # Data Flow
//! ```text
//! request stream (URLs, RequestOptions, JSON values)
//!     → drive task (spawned once per run, consumes the input exactly once)
//!     → ResponseStream::new per descriptor (held when eager)
//!     → Hold (replays the stream-of-streams to every subscriber)
//!     → ResponseStreams (scope-filtered views)
//! ```
//!
//! # Design Decisions
//! - The drive task never awaits a response; calls run on their own tasks
//! - Eager streams start at creation and survive subscriber drops
//! - Lazy streams start on first subscription

mod streams;

use std::path::Path;
use std::sync::Arc;

use futures_util::stream::Stream;
use futures_util::StreamExt;

use crate::config::{load_config, DriverConfig};
use crate::error::DriverError;
use crate::observability::DriverMetrics;
use crate::request::RequestDescriptor;
use crate::response::ResponseStream;
use crate::stream::Hold;
use crate::transport::{ReqwestTransport, Transport};

pub use streams::ResponseStreams;

/// Build a driver backed by reqwest.
pub fn make_http_driver(config: DriverConfig) -> Result<HttpDriver, DriverError> {
    HttpDriver::new(config)
}

/// Turns request streams into replaying streams of response streams.
///
/// Cloning is cheap; clones share the transport and its connection pool.
#[derive(Clone)]
pub struct HttpDriver {
    config: Arc<DriverConfig>,
    transport: Arc<dyn Transport>,
    metrics: DriverMetrics,
}

impl HttpDriver {
    pub fn new(config: DriverConfig) -> Result<Self, DriverError> {
        let transport = ReqwestTransport::new(config.transport.clone())?;
        Ok(Self::with_transport(config, transport))
    }

    /// Load, validate and apply a TOML configuration file.
    pub fn from_config_file(path: &Path) -> Result<Self, DriverError> {
        Self::new(load_config(path)?)
    }

    /// Use a custom transport, e.g. a test double.
    pub fn with_transport(config: DriverConfig, transport: impl Transport) -> Self {
        let metrics = DriverMetrics::new(config.observability.metrics_enabled);
        tracing::debug!(
            eager = config.eager,
            metrics_enabled = config.observability.metrics_enabled,
            "HTTP driver created"
        );
        Self {
            config: Arc::new(config),
            transport: Arc::new(transport),
            metrics,
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn is_eager(&self) -> bool {
        self.config.eager
    }

    pub fn metrics(&self) -> DriverMetrics {
        self.metrics
    }

    /// Consume `requests` on a spawned task, creating one response stream per
    /// descriptor.
    ///
    /// Must be called inside a tokio runtime.
    pub fn run<S>(&self, requests: S) -> ResponseStreams
    where
        S: Stream + Send + 'static,
        S::Item: Into<RequestDescriptor>,
    {
        let transport = Arc::clone(&self.transport);
        let eager = self.config.eager;
        let metrics = self.metrics;

        let responses = requests.map(move |request| {
            let request: RequestDescriptor = request.into();
            let held = eager || request.is_eager();
            let stream =
                ResponseStream::with_metrics(request, Arc::clone(&transport), held, metrics);
            tracing::debug!(
                request_id = %stream.id(),
                method = stream.request().method().unwrap_or("-"),
                url = stream.request().url().unwrap_or("-"),
                held,
                "Response stream created"
            );
            stream
        });

        ResponseStreams::new(Hold::from_stream(responses))
    }
}

impl std::fmt::Debug for HttpDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDriver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
