//! Single-value response streams.
//!
//! # Responsibilities
//! - Run one HTTP call per stream, no matter how many subscribers
//! - Replay the outcome to subscribers that arrive after completion
//! - Abort the call when the stream is cancelled while pending
//!
//! # State Machine
//! ```text
//! Pending ──call ok──▶ Resolved(Response)
//!    │    ──call err─▶ Failed(ResponseError)
//!    └────cancel()───▶ Cancelled
//! ```
//! Exactly one transition out of `Pending` ever happens; every transition is
//! made under the watch channel's write lock after re-checking `Pending`.

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::future::{self, BoxFuture};
use futures_util::stream::{self, BoxStream, Stream};
use futures_util::{FutureExt, StreamExt};
use tokio::sync::watch;
use tokio::task::AbortHandle;
use uuid::Uuid;

use crate::error::{ResponseError, ValidationError};
use crate::observability::DriverMetrics;
use crate::request::{translate, RequestDescriptor};
use crate::response::Response;
use crate::transport::Transport;

type CallFuture = BoxFuture<'static, Result<Response, ResponseError>>;

/// Lifecycle of a response stream.
#[derive(Debug, Clone)]
pub enum ResponseState {
    Pending,
    Resolved(Response),
    Failed(ResponseError),
    Cancelled,
}

impl ResponseState {
    pub fn is_pending(&self) -> bool {
        matches!(self, ResponseState::Pending)
    }

    /// The replayable outcome; `None` while pending or after cancellation.
    pub fn outcome(&self) -> Option<Result<Response, ResponseError>> {
        match self {
            ResponseState::Resolved(response) => Some(Ok(response.clone())),
            ResponseState::Failed(err) => Some(Err(err.clone())),
            ResponseState::Pending | ResponseState::Cancelled => None,
        }
    }
}

struct Inner {
    id: Uuid,
    request: RequestDescriptor,
    /// Held streams are kept alive by the driver and ignore subscriber drops.
    held: bool,
    metrics: DriverMetrics,
    state: watch::Sender<ResponseState>,
    /// The call, until it is started or cancelled.
    call: Mutex<Option<CallFuture>>,
    /// Lock order: `task` before `call`.
    task: Mutex<Option<AbortHandle>>,
    subscribers: AtomicUsize,
}

impl Inner {
    fn method(&self) -> &str {
        self.request.method().unwrap_or("-")
    }

    fn url(&self) -> &str {
        self.request.url().unwrap_or("-")
    }

    fn start(self: &Arc<Self>) {
        let mut task = self.task.lock().expect("response task mutex poisoned");
        let Some(call) = self.call.lock().expect("response call mutex poisoned").take() else {
            return;
        };
        if !self.state.borrow().is_pending() {
            return;
        }

        tracing::debug!(
            request_id = %self.id,
            method = self.method(),
            url = self.url(),
            held = self.held,
            "Starting request"
        );
        self.metrics.record_request_started(self.method());

        let inner = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let started = Instant::now();
            let outcome = call.await;
            inner.settle(outcome, started);
        });
        *task = Some(handle.abort_handle());
    }

    fn settle(&self, outcome: Result<Response, ResponseError>, started: Instant) {
        let elapsed = started.elapsed();
        let label = match &outcome {
            Ok(_) => "ok",
            Err(err) => err.kind(),
        };
        match &outcome {
            Ok(response) => tracing::info!(
                request_id = %self.id,
                method = self.method(),
                url = self.url(),
                status = response.status,
                elapsed_ms = elapsed.as_millis() as u64,
                "Request completed"
            ),
            Err(err) => tracing::warn!(
                request_id = %self.id,
                method = self.method(),
                url = self.url(),
                status = ?err.status(),
                error = %err,
                elapsed_ms = elapsed.as_millis() as u64,
                "Request failed"
            ),
        }

        let next = match outcome {
            Ok(response) => ResponseState::Resolved(response),
            Err(err) => ResponseState::Failed(err),
        };
        let settled = self.state.send_if_modified(|state| {
            if state.is_pending() {
                *state = next;
                true
            } else {
                false
            }
        });
        if settled {
            self.metrics.record_outcome(label, elapsed);
        }
    }

    fn cancel(&self, reason: &'static str) -> bool {
        let cancelled = self.state.send_if_modified(|state| {
            if state.is_pending() {
                *state = ResponseState::Cancelled;
                true
            } else {
                false
            }
        });
        if cancelled {
            let task = self.task.lock().expect("response task mutex poisoned").take();
            if let Some(task) = task {
                task.abort();
            }
            self.call.lock().expect("response call mutex poisoned").take();
            tracing::debug!(
                request_id = %self.id,
                method = self.method(),
                url = self.url(),
                reason,
                "Request cancelled"
            );
            self.metrics.record_cancelled();
        }
        cancelled
    }

    fn release(&self) {
        let remaining = self.subscribers.fetch_sub(1, Ordering::SeqCst) - 1;
        if remaining == 0 && !self.held {
            self.cancel("last subscriber dropped");
        }
    }
}

/// One HTTP exchange as a replaying, cancellable single-value stream.
///
/// Cloning is cheap and every clone refers to the same exchange.
#[derive(Clone)]
pub struct ResponseStream {
    inner: Arc<Inner>,
}

impl ResponseStream {
    /// Create the stream for `request`.
    ///
    /// A held stream starts its call immediately and keeps it running until
    /// it completes or [`cancel`](Self::cancel) is called. Otherwise the call
    /// starts on the first [`subscribe`](Self::subscribe) and is cancelled
    /// when the last subscription is dropped before completion.
    ///
    /// Must be called inside a tokio runtime when `held` is true.
    pub fn new(request: RequestDescriptor, transport: Arc<dyn Transport>, held: bool) -> Self {
        Self::with_metrics(request, transport, held, DriverMetrics::default())
    }

    /// Like [`new`](Self::new), recording through `metrics`.
    pub fn with_metrics(
        request: RequestDescriptor,
        transport: Arc<dyn Transport>,
        held: bool,
        metrics: DriverMetrics,
    ) -> Self {
        let call = call_future(request.clone(), transport);
        let (state, _) = watch::channel(ResponseState::Pending);
        let inner = Arc::new(Inner {
            id: Uuid::new_v4(),
            request,
            held,
            metrics,
            state,
            call: Mutex::new(Some(call)),
            task: Mutex::new(None),
            subscribers: AtomicUsize::new(0),
        });
        if held {
            inner.start();
        }
        Self { inner }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// The descriptor this stream was created for, after isolation tagging.
    pub fn request(&self) -> &RequestDescriptor {
        &self.inner.request
    }

    pub fn is_held(&self) -> bool {
        self.inner.held
    }

    pub fn metrics(&self) -> DriverMetrics {
        self.inner.metrics
    }

    pub fn state(&self) -> ResponseState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to the outcome, starting the call if needed.
    ///
    /// The subscription yields the response or the error once, then ends.
    /// It ends without an item if the stream is cancelled.
    pub fn subscribe(&self) -> ResponseSubscription {
        self.inner.subscribers.fetch_add(1, Ordering::SeqCst);
        self.inner.start();
        ResponseSubscription::new(Arc::clone(&self.inner))
    }

    /// Wait for the outcome. A cancelled stream yields [`ResponseError::Cancelled`].
    pub async fn response(&self) -> Result<Response, ResponseError> {
        let mut subscription = self.subscribe();
        subscription.next().await.unwrap_or(Err(ResponseError::Cancelled))
    }

    /// Run the stream to termination, discarding the value.
    pub async fn drain(&self) -> Result<(), ResponseError> {
        match self.response().await {
            Ok(_) | Err(ResponseError::Cancelled) => Ok(()),
            Err(err) => Err(err),
        }
    }

    /// Abort the call if it is still pending. Returns whether anything changed.
    pub fn cancel(&self) -> bool {
        self.inner.cancel("cancelled by caller")
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("id", &self.inner.id)
            .field("request", &self.inner.request)
            .field("held", &self.inner.held)
            .field("state", &*self.inner.state.borrow())
            .finish()
    }
}

fn call_future(request: RequestDescriptor, transport: Arc<dyn Transport>) -> CallFuture {
    async move {
        if !request.is_supported() {
            return Err(ValidationError::UnsupportedDescriptor.into());
        }
        let call = translate(&request)?;
        transport.execute(call).await
    }
    .boxed()
}

/// A live subscription to a [`ResponseStream`].
pub struct ResponseSubscription {
    outcome: BoxStream<'static, Result<Response, ResponseError>>,
    _guard: SubscriberGuard,
}

impl ResponseSubscription {
    fn new(inner: Arc<Inner>) -> Self {
        let mut rx = inner.state.subscribe();
        let outcome = stream::once(async move {
            let state = rx
                .wait_for(|state| !state.is_pending())
                .await
                .ok()
                .map(|state| (*state).clone());
            state.and_then(|state| state.outcome())
        })
        .filter_map(future::ready)
        .boxed();

        Self {
            outcome,
            _guard: SubscriberGuard { inner },
        }
    }
}

impl Stream for ResponseSubscription {
    type Item = Result<Response, ResponseError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.outcome.poll_next_unpin(cx)
    }
}

/// Decrements the subscriber count when a subscription goes away.
struct SubscriberGuard {
    inner: Arc<Inner>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.inner.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Transport that answers 200 with the request path once released.
    struct GatedTransport {
        calls: AtomicU32,
        gate: Arc<Notify>,
        dropped: Arc<AtomicU32>,
    }

    impl GatedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicU32::new(0),
                gate: Arc::new(Notify::new()),
                dropped: Arc::new(AtomicU32::new(0)),
            })
        }
    }

    struct DropCounter(Arc<AtomicU32>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl Transport for GatedTransport {
        fn execute(&self, call: crate::request::HttpCall) -> CallFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = self.gate.clone();
            let counter = DropCounter(self.dropped.clone());
            async move {
                let _counter = counter;
                gate.notified().await;
                if call.url.path() == "/error" {
                    Err(ResponseError::Status {
                        status: 500,
                        message: "Internal Server Error".into(),
                        response: Response::new(500, "boom"),
                    })
                } else {
                    Ok(Response::new(200, call.url.path().to_string()))
                }
            }
            .boxed()
        }
    }

    fn stream(transport: &Arc<GatedTransport>, request: impl Into<RequestDescriptor>, held: bool) -> ResponseStream {
        ResponseStream::new(request.into(), transport.clone(), held)
    }

    #[tokio::test]
    async fn test_lazy_stream_starts_on_subscribe() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/hello", false);
        tokio::task::yield_now().await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);

        let pending = tokio::spawn({
            let rs = rs.clone();
            async move { rs.response().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        transport.gate.notify_one();
        let res = pending.await.unwrap().unwrap();
        assert_eq!(res.text, "/hello");
    }

    #[tokio::test]
    async fn test_held_stream_starts_immediately() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/hello", true);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert!(rs.state().is_pending());

        transport.gate.notify_one();
        assert_eq!(rs.response().await.unwrap().status, 200);
    }

    #[tokio::test]
    async fn test_subscribers_share_one_call_and_replay() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/delete", false);

        let first = tokio::spawn({
            let rs = rs.clone();
            async move { rs.response().await }
        });
        let second = tokio::spawn({
            let rs = rs.clone();
            async move { rs.response().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        transport.gate.notify_one();

        let a = first.await.unwrap().unwrap();
        let b = second.await.unwrap().unwrap();
        assert_eq!(a, b);

        tokio::time::sleep(Duration::from_millis(50)).await;
        let late = rs.response().await.unwrap();
        assert_eq!(late, a);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_replayed() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/error", true);
        tokio::time::sleep(Duration::from_millis(10)).await;
        transport.gate.notify_one();

        let err = rs.drain().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        let again = rs.response().await.unwrap_err();
        assert_eq!(again.message(), "Internal Server Error");
        assert!(matches!(rs.state(), ResponseState::Failed(_)));
    }

    #[tokio::test]
    async fn test_unsupported_descriptor_fails_stream() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, json!(123), false);
        let err = rs.response().await.unwrap_err();
        assert_eq!(
            err.message(),
            "Observable of requests given to HTTP Driver must emit either URL strings or objects with parameters."
        );
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_pending_call() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/slow", true);
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(rs.cancel());
        assert!(!rs.cancel());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.dropped.load(Ordering::SeqCst), 1);
        assert!(matches!(rs.state(), ResponseState::Cancelled));

        let mut sub = rs.subscribe();
        assert!(sub.next().await.is_none());
        assert!(rs.drain().await.is_ok());
        assert!(matches!(rs.response().await, Err(ResponseError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dropping_last_lazy_subscriber_cancels() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/slow", false);

        let sub = rs.subscribe();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        drop(sub);

        assert!(matches!(rs.state(), ResponseState::Cancelled));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(transport.dropped.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_held_stream_survives_subscriber_drop() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/hello", true);

        drop(rs.subscribe());
        assert!(rs.state().is_pending());

        tokio::time::sleep(Duration::from_millis(10)).await;
        transport.gate.notify_one();
        assert_eq!(rs.response().await.unwrap().text, "/hello");
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_noop() {
        let transport = GatedTransport::new();
        let rs = stream(&transport, "http://h/hello", true);
        tokio::time::sleep(Duration::from_millis(10)).await;
        transport.gate.notify_one();
        rs.drain().await.unwrap();

        assert!(!rs.cancel());
        assert!(matches!(rs.state(), ResponseState::Resolved(_)));
    }
}
