//! Multicast with replay.
//!
//! A [`Hold`] buffers every item its single [`HoldSink`] pushes. Each
//! subscription starts at the first buffered item, so a subscriber arriving
//! late sees exactly what an early one saw, then follows live items until the
//! sink completes.

use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};

use futures_util::stream::Stream;
use futures_util::StreamExt;

struct Shared<T> {
    items: Vec<T>,
    done: bool,
    wakers: Vec<Waker>,
}

impl<T> Shared<T> {
    fn take_wakers(&mut self) -> Vec<Waker> {
        std::mem::take(&mut self.wakers)
    }
}

fn lock<T>(shared: &Mutex<Shared<T>>) -> std::sync::MutexGuard<'_, Shared<T>> {
    shared.lock().expect("hold buffer mutex poisoned")
}

/// Read side of a replay buffer. Cloning shares the buffer.
pub struct Hold<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> Clone for Hold<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Clone> Hold<T> {
    /// Create an empty buffer and its producer.
    pub fn channel() -> (HoldSink<T>, Hold<T>) {
        let shared = Arc::new(Mutex::new(Shared {
            items: Vec::new(),
            done: false,
            wakers: Vec::new(),
        }));
        (
            HoldSink {
                shared: Arc::clone(&shared),
            },
            Hold { shared },
        )
    }

    /// Drive `stream` to completion on a spawned task, buffering every item.
    ///
    /// The source is polled exactly once, however many subscribers there are.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        T: Send + 'static,
    {
        let (sink, hold) = Self::channel();
        tokio::spawn(async move {
            let mut stream = std::pin::pin!(stream);
            while let Some(item) = stream.next().await {
                sink.push(item);
            }
            sink.complete();
        });
        hold
    }

    /// Replay from the first item, then follow live items.
    pub fn subscribe(&self) -> HoldSubscription<T> {
        HoldSubscription {
            shared: Arc::clone(&self.shared),
            cursor: 0,
        }
    }

    /// Items buffered so far.
    pub fn snapshot(&self) -> Vec<T> {
        lock(&self.shared).items.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.shared).items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the producer has finished.
    pub fn is_complete(&self) -> bool {
        lock(&self.shared).done
    }
}

/// The only producer of a [`Hold`]. Dropping it completes the buffer.
pub struct HoldSink<T> {
    shared: Arc<Mutex<Shared<T>>>,
}

impl<T> HoldSink<T> {
    pub fn push(&self, item: T) {
        let wakers = {
            let mut shared = lock(&self.shared);
            if shared.done {
                return;
            }
            shared.items.push(item);
            shared.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
    }

    pub fn complete(self) {
        // Drop does the work.
    }

    fn finish(&self) {
        let wakers = {
            let mut shared = lock(&self.shared);
            if shared.done {
                return;
            }
            shared.done = true;
            shared.take_wakers()
        };
        wakers.into_iter().for_each(Waker::wake);
    }
}

impl<T> Drop for HoldSink<T> {
    fn drop(&mut self) {
        self.finish();
    }
}

/// One subscriber's position in a [`Hold`].
pub struct HoldSubscription<T> {
    shared: Arc<Mutex<Shared<T>>>,
    cursor: usize,
}

impl<T: Clone> Stream for HoldSubscription<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let cursor = self.cursor;
        let next = {
            let mut shared = lock(&self.shared);
            if let Some(item) = shared.items.get(cursor) {
                Some(item.clone())
            } else if shared.done {
                return Poll::Ready(None);
            } else {
                if !shared.wakers.iter().any(|w| w.will_wake(cx.waker())) {
                    shared.wakers.push(cx.waker().clone());
                }
                None
            }
        };
        match next {
            Some(item) => {
                self.cursor += 1;
                Poll::Ready(Some(item))
            }
            None => Poll::Pending,
        }
    }
}
