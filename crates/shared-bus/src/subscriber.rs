//! # Queue Subscriber
//!
//! The single reading half of the ingestion queue.

use crate::Shared;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_stream::Stream;
use tracing::debug;

/// Errors from non-blocking reads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The queue was closed and every item has been drained.
    #[error("Ingestion queue closed and drained")]
    Closed,
}

/// Reading half of the queue.
///
/// Not `Clone`: the queue has exactly one consumer.
pub struct QueueSubscriber<T> {
    receiver: UnboundedReceiver<T>,
    shared: Arc<Shared>,
}

impl<T> QueueSubscriber<T> {
    pub(crate) fn new(receiver: UnboundedReceiver<T>, shared: Arc<Shared>) -> Self {
        Self { receiver, shared }
    }

    /// Receive the next item in FIFO order.
    ///
    /// # Returns
    ///
    /// - `Some(item)` - The oldest queued item
    /// - `None` - The queue was closed and is now empty
    pub async fn recv(&mut self) -> Option<T> {
        let item = self.receiver.recv().await?;
        self.shared.take_one();
        Some(item)
    }

    /// Try to receive the next item without waiting.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(item))` - An item was available
    /// - `Ok(None)` - Nothing queued yet
    /// - `Err(SubscriptionError::Closed)` - Closed and drained
    pub fn try_recv(&mut self) -> Result<Option<T>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(item) => {
                self.shared.take_one();
                Ok(Some(item))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }

    /// Take every item queued right now, oldest first.
    pub fn drain_ready(&mut self) -> Vec<T> {
        let mut items = Vec::with_capacity(self.len());
        while let Ok(Some(item)) = self.try_recv() {
            items.push(item);
        }
        items
    }

    /// Number of items waiting.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.depth()
    }

    /// Whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether writers have been shut out.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Turn the subscriber into a stream that ends when the queue is closed
    /// and drained.
    pub fn into_stream(self) -> impl Stream<Item = T> {
        futures::stream::unfold(self, |mut subscriber| async move {
            subscriber.recv().await.map(|item| (item, subscriber))
        })
    }
}

impl<T> Drop for QueueSubscriber<T> {
    fn drop(&mut self) {
        self.receiver.close();
        let abandoned = self.drain_ready().len();
        if abandoned > 0 {
            debug!(abandoned, "Queue subscriber dropped with items pending");
        }
    }
}
