//! HTTP execution capability.
//!
//! # Data Flow
//! ```text
//! HttpCall (from request::translate)
//!     → Transport::execute (boxed future, one per call)
//!     → Response | ResponseError
//! ```
//!
//! Dropping the returned future aborts the call. Response streams rely on
//! this for cancellation.

mod reqwest_transport;

use futures_util::future::BoxFuture;

use crate::error::ResponseError;
use crate::request::HttpCall;
use crate::response::Response;

pub use reqwest_transport::ReqwestTransport;

/// Executes resolved HTTP calls.
///
/// Implementations must map 4xx/5xx answers to [`ResponseError::Status`] and
/// connection-level failures to [`ResponseError::Transport`].
pub trait Transport: Send + Sync + 'static {
    fn execute(&self, call: HttpCall) -> BoxFuture<'static, Result<Response, ResponseError>>;
}
