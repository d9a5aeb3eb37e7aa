//! Scoped isolation.
//!
//! Independent components can share one driver: each tags what it sends with
//! a scope and only looks at response streams carrying that scope.
//!
//! ```text
//! component requests ──isolate_sink(scope)──▶ driver ──▶ ResponseStreams
//!                                                          │
//! component responses ◀──isolate_source(scope)─────────────┘
//! ```
//!
//! Scopes nest: a request crossing two boundaries carries both, in the order
//! its sinks applied them, and shows up in both views.

use futures_util::stream::Stream;
use futures_util::StreamExt;

use crate::driver::ResponseStreams;
use crate::request::RequestDescriptor;

/// Tag every outgoing request with `scope`.
pub fn isolate_sink<S>(requests: S, scope: impl Into<String>) -> impl Stream<Item = RequestDescriptor>
where
    S: Stream,
    S::Item: Into<RequestDescriptor>,
{
    let scope = scope.into();
    requests.map(move |request| {
        let request: RequestDescriptor = request.into();
        request.with_scope(scope.clone())
    })
}

/// Narrow `streams` to response streams whose request carries `scope`.
pub fn isolate_source(streams: &ResponseStreams, scope: impl Into<String>) -> ResponseStreams {
    streams.isolate_source(scope)
}
