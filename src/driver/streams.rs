//! The stream-of-streams returned by [`HttpDriver::run`](super::HttpDriver::run).

use std::sync::Arc;

use futures_util::future;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::error::ResponseError;
use crate::response::{Response, ResponseStream};
use crate::stream::Hold;

/// Replaying stream of [`ResponseStream`]s, optionally narrowed to scopes.
///
/// Every call to [`subscribe`](Self::subscribe) replays all response streams
/// created so far, in emission order, then follows new ones. Views created
/// with [`isolate_source`](Self::isolate_source) share the same buffer.
#[derive(Clone)]
pub struct ResponseStreams {
    hold: Hold<ResponseStream>,
    /// Every scope a response stream must carry to be visible here.
    scopes: Arc<Vec<String>>,
}

impl ResponseStreams {
    pub(crate) fn new(hold: Hold<ResponseStream>) -> Self {
        Self {
            hold,
            scopes: Arc::new(Vec::new()),
        }
    }

    /// Scopes this view is restricted to, in the order applied.
    pub fn scopes(&self) -> &[String] {
        &self.scopes
    }

    /// Subscribe to the response streams visible in this view.
    pub fn subscribe(&self) -> BoxStream<'static, ResponseStream> {
        let scopes = Arc::clone(&self.scopes);
        self.hold
            .subscribe()
            .filter(move |stream| future::ready(visible(&scopes, stream)))
            .boxed()
    }

    /// A view containing only response streams tagged with `scope`.
    pub fn isolate_source(&self, scope: impl Into<String>) -> Self {
        let mut scopes = self.scopes.as_ref().clone();
        scopes.push(scope.into());
        Self {
            hold: self.hold.clone(),
            scopes: Arc::new(scopes),
        }
    }

    /// Every outcome of every visible response stream, in completion order.
    ///
    /// Failures are yielded as items and never end the joined stream. It
    /// ends once the driver's input has ended and every call has settled.
    pub fn join(&self) -> BoxStream<'static, Result<Response, ResponseError>> {
        self.subscribe()
            .map(|stream| stream.subscribe())
            .flatten_unordered(None)
            .boxed()
    }

    /// Response streams visible in this view so far.
    pub fn snapshot(&self) -> Vec<ResponseStream> {
        self.hold
            .snapshot()
            .into_iter()
            .filter(|stream| visible(&self.scopes, stream))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the driver has consumed its whole input.
    pub fn is_complete(&self) -> bool {
        self.hold.is_complete()
    }
}

impl std::fmt::Debug for ResponseStreams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStreams")
            .field("scopes", &self.scopes)
            .field("buffered", &self.hold.len())
            .field("complete", &self.hold.is_complete())
            .finish()
    }
}

fn visible(scopes: &[String], stream: &ResponseStream) -> bool {
    scopes.iter().all(|scope| stream.request().in_scope(scope))
}
