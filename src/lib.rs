//! Reactive HTTP driver.
//!
//! Feed the driver a stream of request descriptors (URL strings, option
//! records or raw JSON) and get back a replaying stream of response streams,
//! one per request. Each response stream performs its HTTP call at most once
//! and replays the outcome to every subscriber.
//!
//! # Architecture Overview
//!
//! ```text
//!   requests ──▶ isolation::isolate_sink ──▶ HttpDriver::run
//!                                               │ drive task
//!                                               ▼
//!                            ResponseStream per descriptor ──▶ Transport (reqwest)
//!                                               │
//!                                               ▼
//!                            Hold (multicast with replay)
//!                                               │
//!   responses ◀── ResponseStreams::isolate_source ◀┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use futures_util::{stream, StreamExt};
//! use http_driver::{make_http_driver, DriverConfig, RequestOptions};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = make_http_driver(DriverConfig::default())?;
//! let responses = driver.run(stream::iter(vec![
//!     RequestOptions::new("http://localhost:3000/pet")
//!         .method("POST")
//!         .send(serde_json::json!({"name": "Woof", "species": "Dog"})),
//! ]));
//!
//! let mut streams = responses.subscribe();
//! while let Some(response) = streams.next().await {
//!     println!("{}", response.response().await?.text);
//! }
//! # Ok(())
//! # }
//! ```

// Core
pub mod driver;
pub mod isolation;
pub mod request;
pub mod response;
pub mod stream;
pub mod transport;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod observability;

pub use config::{DriverConfig, TransportConfig};
pub use driver::{make_http_driver, HttpDriver, ResponseStreams};
pub use error::{DriverError, ResponseError, ValidationError};
pub use isolation::{isolate_sink, isolate_source};
pub use observability::DriverMetrics;
pub use request::{Attachment, RequestDescriptor, RequestOptions};
pub use response::{Response, ResponseState, ResponseStream};
pub use transport::{ReqwestTransport, Transport};
