//! # Fan-out Dispatch
//!
//! The consumer loop and the bounded worker pool behind it.
//!
//! ```text
//! QueueSubscriber ──recv──→ flatten ──→ resolve(to ∪ from) ──→ PackedMessage
//!                                                                  │
//!                                              submit, in traversal order
//!                                                                  ↓
//!                                           Semaphore(work_pool_size) ──→ Notifier
//! ```
//!
//! Submission order is deterministic; completion order is not. Each
//! (message, application) pair runs in its own task, so a failure or panic
//! in one never reaches the others or the loop.

use crate::domain::{
    flatten_transaction, AppliedTransaction, DispatcherStats, FlatMessage, Lifecycle,
    PackedMessage, SubscriberMatch, MAX_WORK_POOL_SIZE,
};
use crate::ports::{AddresseeResolver, Notifier};
use futures::FutureExt;
use pulsar_telemetry::{
    log_delivery_event, log_msg_event, metric_inc, time_histogram, DISPATCH_DURATION,
    DISPATCH_WORKERS_BUSY, FLATTENED_MESSAGES, FLATTENED_NODES, NOTIFICATIONS, QUEUE_DEPTH,
    RESOLVE_FAILURES,
};
use shared_bus::QueueSubscriber;
use shared_types::AppId;
use std::any::Any;
use std::collections::BTreeSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};

/// Counters shared by the ingress path, the consumer and the workers.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) received: AtomicU64,
    pub(crate) admitted: AtomicU64,
    pub(crate) duplicates: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) notify_failures: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> DispatcherStats {
        DispatcherStats {
            received: self.received.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            notify_failures: self.notify_failures.load(Ordering::Relaxed),
        }
    }
}

/// Bounded pool of notification workers.
pub(crate) struct DispatchPool {
    permits: Arc<Semaphore>,
    size: u32,
    notifier: Arc<dyn Notifier>,
    counters: Arc<Counters>,
}

impl DispatchPool {
    /// `size` has already been validated against the ceiling.
    pub(crate) fn new(size: usize, notifier: Arc<dyn Notifier>, counters: Arc<Counters>) -> Self {
        let size = size.min(MAX_WORK_POOL_SIZE);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size: size as u32,
            notifier,
            counters,
        }
    }

    pub(crate) fn size(&self) -> u32 {
        self.size
    }

    /// Run one notification on the pool, waiting for a free slot first.
    pub(crate) async fn submit(&self, work: SubscriberMatch) {
        // The semaphore is never closed
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            return;
        };
        DISPATCH_WORKERS_BUSY.inc();

        let notifier = Arc::clone(&self.notifier);
        let counters = Arc::clone(&self.counters);
        tokio::spawn(async move {
            deliver(notifier.as_ref(), &counters, &work).await;
            DISPATCH_WORKERS_BUSY.dec();
            drop(permit);
        });
    }

    /// Wait until every submitted notification has finished.
    pub(crate) async fn join(&self) {
        if let Ok(all) = self.permits.acquire_many(self.size).await {
            drop(all);
        }
    }

    /// Release the notifier. Called once the pool is idle.
    ///
    /// A panicking close hook is logged and absorbed.
    pub(crate) async fn close(&self) {
        if let Err(panic) = AssertUnwindSafe(self.notifier.close()).catch_unwind().await {
            error!(panic = %panic_message(panic.as_ref()), "Notifier close panicked");
        }
    }
}

/// Marks the lifecycle stopped when the consumer exits, however it exits.
struct StopOnExit(Arc<Lifecycle>);

impl Drop for StopOnExit {
    fn drop(&mut self) {
        self.0.mark_stopped();
    }
}

/// Notify one application, absorbing failures and panics.
async fn deliver(notifier: &dyn Notifier, counters: &Counters, work: &SubscriberMatch) {
    let message = &work.message;
    let result = AssertUnwindSafe(notifier.notify(
        &work.app_id,
        message.from(),
        message.to(),
        message,
    ))
    .catch_unwind()
    .await;

    match result {
        Ok(Ok(())) => {
            Counters::bump(&counters.dispatched);
            metric_inc!(NOTIFICATIONS, &["delivered"]);
            log_delivery_event!(
                debug,
                "Notification delivered",
                message.root_cid,
                work.app_id,
                index = message.index
            );
        }
        Ok(Err(e)) => {
            Counters::bump(&counters.notify_failures);
            metric_inc!(NOTIFICATIONS, &["failed"]);
            log_delivery_event!(
                error,
                "Notification failed",
                message.root_cid,
                work.app_id,
                index = message.index,
                error = %e
            );
        }
        Err(panic) => {
            Counters::bump(&counters.notify_failures);
            metric_inc!(NOTIFICATIONS, &["panicked"]);
            log_delivery_event!(
                error,
                "Notifier panicked",
                message.root_cid,
                work.app_id,
                index = message.index,
                panic = %panic_message(panic.as_ref())
            );
        }
    }
}

/// Applications watching either endpoint of `message`, deduplicated.
///
/// A failed lookup for one endpoint is logged and contributes nothing.
pub(crate) async fn resolve_addressees(
    resolver: &dyn AddresseeResolver,
    message: &FlatMessage,
) -> Vec<AppId> {
    let mut endpoints = vec![message.to()];
    if message.from() != message.to() {
        endpoints.push(message.from());
    }

    let mut app_ids = BTreeSet::new();
    for address in endpoints {
        match resolver.resolve(address).await {
            Ok(apps) => app_ids.extend(apps),
            Err(e) => {
                RESOLVE_FAILURES.inc();
                log_msg_event!(
                    warn,
                    "Addressee lookup failed",
                    message.root_cid,
                    address = %address,
                    index = message.index,
                    error = %e
                );
            }
        }
    }
    app_ids.into_iter().collect()
}

/// Flatten one transaction and submit every match, in traversal order.
pub(crate) async fn dispatch_transaction(
    tx: &AppliedTransaction,
    resolver: &dyn AddresseeResolver,
    pool: &DispatchPool,
) {
    let (messages, visited) = flatten_transaction(tx);
    FLATTENED_NODES.inc_by(visited as f64);
    FLATTENED_MESSAGES.inc_by(messages.len() as f64);
    log_msg_event!(
        debug,
        "Trace flattened",
        tx.cid,
        messages = messages.len(),
        visited
    );

    for message in messages {
        let message = Arc::new(message);
        let app_ids = resolve_addressees(resolver, &message).await;
        if app_ids.is_empty() {
            continue;
        }

        let packed = PackedMessage::new(message, app_ids);
        for work in packed.matches() {
            pool.submit(work).await;
        }
    }
}

/// Drain the queue until it is closed and empty, then settle the pool and
/// mark the lifecycle stopped.
pub(crate) async fn run_consumer(
    mut queue: QueueSubscriber<AppliedTransaction>,
    resolver: Arc<dyn AddresseeResolver>,
    pool: DispatchPool,
    lifecycle: Arc<Lifecycle>,
) {
    let _stopped = StopOnExit(lifecycle);
    info!(workers = pool.size(), "Dispatch consumer started");

    while let Some(tx) = queue.recv().await {
        QUEUE_DEPTH.set(queue.len() as f64);

        let _timer = time_histogram!(DISPATCH_DURATION);
        let outcome = AssertUnwindSafe(dispatch_transaction(&tx, resolver.as_ref(), &pool))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            log_msg_event!(
                error,
                "Dispatch panicked, transaction skipped",
                tx.cid,
                panic = %panic_message(panic.as_ref())
            );
        }
    }

    QUEUE_DEPTH.set(0.0);
    pool.join().await;
    pool.close().await;
    info!("Dispatch consumer stopped");
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
