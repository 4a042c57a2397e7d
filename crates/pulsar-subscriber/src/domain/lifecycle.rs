//! # Dispatcher Lifecycle
//!
//! ```text
//! Running ──stop()──→ Stopping ──drain complete──→ Stopped
//! ```
//!
//! Transitions are monotonic. Ingress calls register as in-flight only while
//! `Running`; the stopper waits for that count to reach zero before it
//! closes the queue, so no admitted message can race a closed queue.

use parking_lot::Mutex;
use std::fmt;
use tokio::sync::{watch, Notify};

/// Dispatcher phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    /// Accepting messages.
    Running,
    /// Rejecting new messages, draining what is queued.
    Stopping,
    /// Drained; every admitted message has been dispatched.
    Stopped,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug)]
struct LifecycleState {
    phase: Phase,
    in_flight: usize,
}

/// Phase plus the in-flight ingress counter, guarded together.
pub struct Lifecycle {
    state: Mutex<LifecycleState>,
    idle: Notify,
    stopped_tx: watch::Sender<bool>,
}

impl Lifecycle {
    /// Start in [`Phase::Running`] with nothing in flight.
    pub fn new() -> Self {
        let (stopped_tx, _) = watch::channel(false);
        Self {
            state: Mutex::new(LifecycleState {
                phase: Phase::Running,
                in_flight: 0,
            }),
            idle: Notify::new(),
            stopped_tx,
        }
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    /// Ingress calls currently registered.
    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight
    }

    /// Register an ingress call.
    ///
    /// Returns `None` unless the phase is `Running`. The check and the
    /// increment happen under one lock.
    pub fn enter(&self) -> Option<InFlightGuard<'_>> {
        let mut state = self.state.lock();
        if state.phase != Phase::Running {
            return None;
        }
        state.in_flight += 1;
        Some(InFlightGuard { lifecycle: self })
    }

    /// Move `Running → Stopping`.
    ///
    /// Returns the phase observed before the call. Later phases are left
    /// untouched.
    pub fn begin_stop(&self) -> Phase {
        let mut state = self.state.lock();
        let previous = state.phase;
        if previous == Phase::Running {
            state.phase = Phase::Stopping;
        }
        previous
    }

    /// Wait until no ingress call is registered.
    ///
    /// Only meaningful once the phase has left `Running`; before that new
    /// calls may keep arriving.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.state.lock().in_flight == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Move to `Stopped` and wake every waiter. Called once by the consumer.
    pub fn mark_stopped(&self) {
        self.state.lock().phase = Phase::Stopped;
        self.stopped_tx.send_replace(true);
    }

    /// Resolve once the phase is `Stopped`.
    pub async fn wait_stopped(&self) {
        let mut rx = self.stopped_tx.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|stopped| *stopped).await;
    }

    fn exit(&self) {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        if state.in_flight == 0 && state.phase != Phase::Running {
            drop(state);
            self.idle.notify_waiters();
        }
    }
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Lifecycle")
            .field("phase", &state.phase)
            .field("in_flight", &state.in_flight)
            .finish()
    }
}

/// Registration of one ingress call; deregisters on drop.
#[must_use = "dropping the guard ends the in-flight registration"]
pub struct InFlightGuard<'a> {
    lifecycle: &'a Lifecycle,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.lifecycle.exit();
    }
}
