//! # Queue Publisher
//!
//! The writing half of the ingestion queue.

use crate::Shared;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Returned by [`QueuePublisher::push`] when the queue no longer accepts
/// writes. Carries the rejected item back to the caller.
#[derive(Error, PartialEq, Eq)]
#[error("Ingestion queue closed")]
pub struct QueueClosed<T>(pub T);

impl<T> fmt::Debug for QueueClosed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("QueueClosed(..)")
    }
}

impl<T> QueueClosed<T> {
    /// Recover the rejected item.
    pub fn into_inner(self) -> T {
        self.0
    }
}

/// Writing half of the queue. Cheap to clone; every clone shares one
/// sender, so closing through any clone closes them all.
pub struct QueuePublisher<T> {
    sender: Arc<Mutex<Option<UnboundedSender<T>>>>,
    shared: Arc<Shared>,
}

impl<T> Clone for QueuePublisher<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> QueuePublisher<T> {
    pub(crate) fn new(sender: Arc<Mutex<Option<UnboundedSender<T>>>>, shared: Arc<Shared>) -> Self {
        Self { sender, shared }
    }

    /// Append an item without waiting on the consumer.
    ///
    /// # Errors
    ///
    /// `QueueClosed` if [`close`](Self::close) was called or the subscriber
    /// was dropped. The item is handed back untouched.
    pub fn push(&self, item: T) -> Result<(), QueueClosed<T>> {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            return Err(QueueClosed(item));
        };

        let depth = self.shared.depth.fetch_add(1, Ordering::AcqRel) + 1;
        if let Err(rejected) = sender.send(item) {
            self.shared.take_one();
            return Err(QueueClosed(rejected.0));
        }
        drop(guard);

        self.shared.pushed.fetch_add(1, Ordering::Relaxed);
        self.shared.peak_depth.fetch_max(depth, Ordering::Relaxed);
        if depth == self.shared.buffer_hint + 1 {
            debug!(depth, hint = self.shared.buffer_hint, "Ingestion queue backlog above buffer hint");
        }
        Ok(())
    }

    /// Stop accepting writes. Already-queued items remain readable.
    ///
    /// Idempotent. Returns `true` only for the call that closed the queue.
    pub fn close(&self) -> bool {
        let Some(sender) = self.sender.lock().take() else {
            return false;
        };
        drop(sender);
        self.shared.closed.store(true, Ordering::Release);
        debug!(remaining = self.shared.depth(), "Ingestion queue closed for writers");
        true
    }

    /// Whether writes are still accepted.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender
            .lock()
            .as_ref()
            .map_or(true, UnboundedSender::is_closed)
    }

    /// Number of items waiting to be consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.depth()
    }

    /// Whether the queue is currently empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total items accepted since creation.
    #[must_use]
    pub fn pushed_total(&self) -> u64 {
        self.shared.pushed.load(Ordering::Relaxed)
    }

    /// Largest depth observed since creation.
    #[must_use]
    pub fn peak_depth(&self) -> usize {
        self.shared.peak_depth.load(Ordering::Relaxed)
    }
}
