//! Shared test doubles and builders.

use async_trait::async_trait;
use parking_lot::Mutex;
use pulsar_subscriber::{
    AddresseeResolver, FlatMessage, IngestOutcome, InMemoryMessageLocker, LockError,
    MessageAppliedHandler, MessageLocker, Notifier, NotifyError, ResolveError, WatchList,
};
use shared_types::{Address, AppId, ApplyRet, Cid, ExecutionTrace, Message, TipSet};
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

// =============================================================================
// BUILDERS
// =============================================================================

/// Deterministic CID from a number.
pub fn cid(n: u64) -> Cid {
    let mut bytes = [0u8; 32];
    bytes[..8].copy_from_slice(&n.to_be_bytes());
    Cid::from_bytes(bytes)
}

/// Plain send between two addresses.
pub fn transfer(from: &str, to: &str, nonce: u64) -> Message {
    Message::new(from, to, nonce)
}

/// Trace with the top-level message only.
pub fn single_call(message: &Message) -> ApplyRet {
    ApplyRet::from_trace(ExecutionTrace::new(message.clone()))
}

/// root{M1, [ {M2}, {M3, [ {M4}, ]} ]}, every message sent to `to`.
pub fn four_message_trace(to: &str) -> (Message, ApplyRet) {
    let root = transfer("f01", to, 1);
    let trace = ExecutionTrace::new(root.clone()).with_subcalls(vec![
        ExecutionTrace::new(transfer("f02", to, 2)),
        ExecutionTrace::new(transfer("f03", to, 3))
            .with_subcall(ExecutionTrace::new(transfer("f04", to, 4))),
    ]);
    (root, ApplyRet::from_trace(trace))
}

/// Registry where each app watches the listed addresses.
pub fn watch_list(subs: &[(&str, &[&str])]) -> Arc<WatchList> {
    let watch = Arc::new(WatchList::new());
    for (app, addresses) in subs {
        watch.add_sub(
            &AppId::new(*app),
            addresses.iter().map(|a| Address::new(*a)),
        );
    }
    watch
}

/// Feed one applied message with a fresh cancellation token.
pub async fn apply(
    handler: &dyn MessageAppliedHandler,
    cid: Cid,
    message: Message,
    ret: ApplyRet,
) -> IngestOutcome {
    apply_with_cancel(handler, &CancellationToken::new(), cid, message, ret).await
}

/// Feed one applied message under the caller's cancellation token.
pub async fn apply_with_cancel(
    handler: &dyn MessageAppliedHandler,
    cancel: &CancellationToken,
    cid: Cid,
    message: Message,
    ret: ApplyRet,
) -> IngestOutcome {
    handler
        .message_applied(
            cancel,
            Arc::new(TipSet::new(100, vec![])),
            cid,
            message,
            ret,
            false,
        )
        .await
}

/// Feed a single-call transfer to `to` under CID `n`.
pub async fn apply_transfer(handler: &dyn MessageAppliedHandler, n: u64, to: &str) -> IngestOutcome {
    let message = transfer("f01", to, n);
    let ret = single_call(&message);
    apply(handler, cid(n), message, ret).await
}

// =============================================================================
// NOTIFIERS
// =============================================================================

/// One observed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub app_id: AppId,
    pub from: Address,
    pub to: Address,
    pub root_cid: Cid,
    pub index: usize,
    pub nonce: u64,
}

/// Records deliveries; optionally fails or panics for chosen applications
/// and waits on a gate before recording. Can also panic in `close`.
#[derive(Default)]
pub struct RecordingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
    fail_for: HashSet<AppId>,
    panic_for: HashSet<AppId>,
    delay: Option<Duration>,
    gate: Option<Semaphore>,
    attempts: AtomicUsize,
    closes: AtomicUsize,
    panic_on_close: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return an error for `app`.
    pub fn failing_for(mut self, app: &str) -> Self {
        self.fail_for.insert(AppId::new(app));
        self
    }

    /// Panic for `app`.
    pub fn panicking_for(mut self, app: &str) -> Self {
        self.panic_for.insert(AppId::new(app));
        self
    }

    /// Count the close, then panic inside it.
    pub fn panicking_on_close(mut self) -> Self {
        self.panic_on_close = true;
        self
    }

    /// Sleep before each delivery.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block every delivery until [`open_gate`](Self::open_gate).
    pub fn gated(mut self) -> Self {
        self.gate = Some(Semaphore::new(0));
        self
    }

    /// Let every pending and future delivery through.
    pub fn open_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.close();
        }
    }

    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().clone()
    }

    pub fn delivered_count(&self) -> usize {
        self.deliveries.lock().len()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        app_id: &AppId,
        from: &Address,
        to: &Address,
        message: &FlatMessage,
    ) -> Result<(), NotifyError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            // Closed gate means open: acquire fails once close() is called
            let _ = gate.acquire().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panic_for.contains(app_id) {
            panic!("notifier panicked for {}", app_id);
        }
        if self.fail_for.contains(app_id) {
            return Err(NotifyError::Transport(format!("{} unreachable", app_id)));
        }

        self.deliveries.lock().push(Delivery {
            app_id: app_id.clone(),
            from: from.clone(),
            to: to.clone(),
            root_cid: message.root_cid,
            index: message.index,
            nonce: message.message.nonce,
        });
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_close {
            panic!("notifier close panicked");
        }
    }
}

// =============================================================================
// LOCKERS AND RESOLVERS
// =============================================================================

/// Lock backend that always fails.
pub struct UnreachableLocker;

#[async_trait]
impl MessageLocker for UnreachableLocker {
    async fn acquire(&self, _key: &str) -> Result<bool, LockError> {
        Err(LockError::Unavailable("connection refused".into()))
    }

    fn ttl(&self) -> Duration {
        Duration::from_secs(20)
    }
}

/// In-memory locker behind an artificial round-trip delay.
pub struct DelayedLocker {
    pub delay: Duration,
    pub inner: InMemoryMessageLocker,
}

impl DelayedLocker {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InMemoryMessageLocker::new(),
        }
    }
}

#[async_trait]
impl MessageLocker for DelayedLocker {
    async fn acquire(&self, key: &str) -> Result<bool, LockError> {
        tokio::time::sleep(self.delay).await;
        self.inner.acquire(key).await
    }

    fn ttl(&self) -> Duration {
        self.inner.ttl()
    }
}

/// Resolver that fails for one address and defers to a watch list otherwise.
pub struct FlakyResolver {
    pub broken: Address,
    pub inner: Arc<WatchList>,
}

#[async_trait]
impl AddresseeResolver for FlakyResolver {
    async fn resolve(&self, address: &Address) -> Result<BTreeSet<AppId>, ResolveError> {
        if address == &self.broken {
            return Err(ResolveError::Store("subscription store timeout".into()));
        }
        self.inner.resolve(address).await
    }
}
