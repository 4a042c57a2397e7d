//! # Shared Bus - Ingestion Queue
//!
//! Unbounded FIFO that decouples the node's synchronous apply callback from
//! the asynchronous dispatch loop.
//!
//! ## Shape
//!
//! ```text
//! ┌──────────────┐                       ┌──────────────┐
//! │ apply thread │  push()               │  consumer    │
//! │ apply thread │ ──────┐               │    loop      │
//! │ apply thread │       │               └──────────────┘
//! └──────────────┘       ▼                      ↑
//!              ┌────────────────────┐  recv()   │
//!              │ mpsc::unbounded<T> │ ──────────┘
//!              └────────────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Non-blocking writes:** `push` is an unbounded `send` and never waits
//!   on the consumer. The channel grows instead.
//! - **FIFO, single consumer:** items come out in push order to exactly one
//!   `QueueSubscriber`.
//! - **Explicit close:** `QueuePublisher::close` drops the shared sender.
//!   Items already queued are still delivered; `recv` returns `None` once
//!   they are drained. Callers must make sure no writer is still racing when
//!   they close.
//! - **Observable depth:** both halves keep a depth counter next to the
//!   channel, since `UnboundedReceiver` does not expose its length.

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use publisher::{QueueClosed, QueuePublisher};
pub use subscriber::{QueueSubscriber, SubscriptionError};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Depth at which [`ingestion_queue`] starts reporting a backlog when no
/// hint is given.
pub const DEFAULT_MSG_BUFFER: usize = 500;

/// Create a new queue, returning its writer and reader halves.
///
/// `buffer_hint` is not a bound. Pushes that take the depth past it are
/// logged as a backlog; the queue keeps growing.
#[must_use]
pub fn ingestion_queue<T>(buffer_hint: usize) -> (QueuePublisher<T>, QueueSubscriber<T>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    let shared = Arc::new(Shared {
        buffer_hint,
        depth: AtomicUsize::new(0),
        pushed: AtomicU64::new(0),
        peak_depth: AtomicUsize::new(0),
        closed: AtomicBool::new(false),
    });
    (
        QueuePublisher::new(Arc::new(Mutex::new(Some(sender))), Arc::clone(&shared)),
        QueueSubscriber::new(receiver, shared),
    )
}

/// Bookkeeping shared by both halves.
pub(crate) struct Shared {
    pub(crate) buffer_hint: usize,
    /// Incremented before each send, decremented after each receive, so it
    /// never underflows.
    pub(crate) depth: AtomicUsize,
    pub(crate) pushed: AtomicU64,
    pub(crate) peak_depth: AtomicUsize,
    pub(crate) closed: AtomicBool,
}

impl Shared {
    pub(crate) fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub(crate) fn take_one(&self) {
        self.depth.fetch_sub(1, Ordering::AcqRel);
    }
}
