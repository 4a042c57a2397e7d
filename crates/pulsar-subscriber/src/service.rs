//! # Dispatcher Service
//!
//! Owns the pipeline: dedup gate, ingestion queue, consumer task and the
//! lifecycle that orders shutdown.
//!
//! ## Shutdown Ordering
//!
//! ```text
//! stop() ─→ phase = Stopping      (new calls rejected)
//!        ─→ wait in_flight == 0   (admitted calls finish their push)
//!        ─→ close queue writers
//!        ─→ consumer drains queue, joins pool, closes notifier
//!        ─→ phase = Stopped       (every stop() caller returns)
//! ```

use crate::adapters::InMemoryMessageLocker;
use crate::dedup::DedupGate;
use crate::dispatch::{panic_message, run_consumer, Counters, DispatchPool};
use crate::domain::{
    AppliedTransaction, DispatcherStats, DropReason, IngestOutcome, Lifecycle, Phase,
    SubscriberConfig, SubscriberError,
};
use crate::ports::{AddresseeResolver, MessageAppliedHandler, MessageLocker, Notifier};
use async_trait::async_trait;
use futures::FutureExt;
use pulsar_telemetry::{log_msg_event, metric_inc, INGRESS_MESSAGES, QUEUE_DEPTH};
use shared_bus::{ingestion_queue, QueuePublisher};
use shared_types::{ApplyRet, Cid, Message, TipSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// The message pipeline.
///
/// Cheap to clone; every clone drives the same pipeline. Construction starts
/// the consumer on the current Tokio runtime.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<Inner>,
}

struct Inner {
    config: SubscriberConfig,
    gate: DedupGate,
    publisher: QueuePublisher<AppliedTransaction>,
    lifecycle: Arc<Lifecycle>,
    counters: Arc<Counters>,
}

impl Dispatcher {
    /// Build a dispatcher deduplicating through an in-process locker.
    ///
    /// # Errors
    ///
    /// - `SubscriberError::Config` if `config` fails validation
    /// - `SubscriberError::NoRuntime` outside a Tokio runtime
    pub fn new(
        config: SubscriberConfig,
        resolver: Arc<dyn AddresseeResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SubscriberError> {
        let locker = Arc::new(InMemoryMessageLocker::from_config(&config));
        Self::with_locker(config, locker, resolver, notifier)
    }

    /// Build a dispatcher deduplicating through `locker`.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_locker(
        config: SubscriberConfig,
        locker: Arc<dyn MessageLocker>,
        resolver: Arc<dyn AddresseeResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, SubscriberError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| SubscriberError::NoRuntime)?;

        let (publisher, queue) = ingestion_queue(config.msg_buffer);
        let lifecycle = Arc::new(Lifecycle::new());
        let counters = Arc::new(Counters::default());
        let pool = DispatchPool::new(config.work_pool_size, notifier, Arc::clone(&counters));
        let gate = DedupGate::new(locker);

        runtime.spawn(run_consumer(queue, resolver, pool, Arc::clone(&lifecycle)));

        info!(
            work_pool_size = config.work_pool_size,
            msg_buffer = config.msg_buffer,
            dedup_ttl_secs = gate.ttl().as_secs(),
            "Dispatcher started"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                gate,
                publisher,
                lifecycle,
                counters,
            }),
        })
    }

    /// Stop accepting messages and drain everything already admitted.
    ///
    /// Returns once every queued transaction has been dispatched and every
    /// notification has finished. Safe to call repeatedly and concurrently;
    /// each call waits for the same completion.
    pub async fn stop(&self) {
        let lifecycle = &self.inner.lifecycle;
        let previous = lifecycle.begin_stop();

        if previous == Phase::Running {
            info!(in_flight = lifecycle.in_flight(), "Dispatcher stopping");
        }

        if previous != Phase::Stopped {
            lifecycle.wait_idle().await;
            if self.inner.publisher.close() {
                info!(
                    queued = self.inner.publisher.len(),
                    "Ingestion queue closed, draining"
                );
            }
        }

        lifecycle.wait_stopped().await;

        if previous == Phase::Running {
            let stats = self.stats();
            info!(
                admitted = stats.admitted,
                dispatched = stats.dispatched,
                notify_failures = stats.notify_failures,
                "Dispatcher stopped"
            );
        }
    }

    /// Resolve once the dispatcher has fully stopped, without requesting it.
    pub async fn wait_stopped(&self) {
        self.inner.lifecycle.wait_stopped().await;
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.inner.lifecycle.phase()
    }

    /// Transactions waiting in the ingestion queue.
    pub fn queue_depth(&self) -> usize {
        self.inner.publisher.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DispatcherStats {
        self.inner.counters.snapshot()
    }

    /// Configuration the dispatcher was built with.
    pub fn config(&self) -> &SubscriberConfig {
        &self.inner.config
    }

    async fn ingest(&self, cancel: &CancellationToken, tx: AppliedTransaction) -> IngestOutcome {
        let inner = &self.inner;

        // Held until the push completes; stop() waits for it
        let Some(_in_flight) = inner.lifecycle.enter() else {
            match inner.lifecycle.phase() {
                Phase::Stopped => {
                    log_msg_event!(debug, "Dispatcher stopped, message ignored", tx.cid)
                }
                phase => {
                    log_msg_event!(warn, "Dispatcher shutting down, message dropped", tx.cid, phase = %phase)
                }
            }
            return IngestOutcome::Dropped(DropReason::ShuttingDown);
        };

        let admitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log_msg_event!(info, "Ingress cancelled during dedup", tx.cid);
                return IngestOutcome::Dropped(DropReason::Cancelled);
            }
            result = inner.gate.try_admit(&tx.cid) => result,
        };

        match admitted {
            Ok(true) => {}
            Ok(false) => {
                log_msg_event!(debug, "Duplicate message skipped", tx.cid);
                return IngestOutcome::Duplicate;
            }
            Err(e) => {
                log_msg_event!(error, "Dedup lock failed, message dropped", tx.cid, error = %e);
                return IngestOutcome::Dropped(DropReason::LockUnavailable);
            }
        }

        if cancel.is_cancelled() {
            log_msg_event!(info, "Ingress cancelled before enqueue", tx.cid);
            return IngestOutcome::Dropped(DropReason::Cancelled);
        }

        let cid = tx.cid;
        match inner.publisher.push(tx) {
            Ok(()) => {
                let depth = inner.publisher.len();
                QUEUE_DEPTH.set(depth as f64);
                log_msg_event!(debug, "Message enqueued", cid, depth);
                IngestOutcome::Enqueued
            }
            Err(_) => {
                log_msg_event!(warn, "Ingestion queue closed, message dropped", cid);
                IngestOutcome::Dropped(DropReason::ShuttingDown)
            }
        }
    }

    fn record(&self, outcome: IngestOutcome) {
        let counters = &self.inner.counters;
        match outcome {
            IngestOutcome::Enqueued => Counters::bump(&counters.admitted),
            IngestOutcome::Duplicate => Counters::bump(&counters.duplicates),
            IngestOutcome::Dropped(_) => Counters::bump(&counters.dropped),
        }
        metric_inc!(INGRESS_MESSAGES, &[outcome.as_label()]);
    }
}

#[async_trait]
impl MessageAppliedHandler for Dispatcher {
    async fn message_applied(
        &self,
        cancel: &CancellationToken,
        tip_set: Arc<TipSet>,
        cid: Cid,
        message: Message,
        ret: ApplyRet,
        implicit: bool,
    ) -> IngestOutcome {
        Counters::bump(&self.inner.counters.received);
        log_msg_event!(
            debug,
            "Message applied",
            cid,
            from = %message.from,
            to = %message.to,
            implicit
        );

        let tx = AppliedTransaction::new(tip_set, cid, message, ret, implicit);
        let outcome = match AssertUnwindSafe(self.ingest(cancel, tx))
            .catch_unwind()
            .await
        {
            Ok(outcome) => outcome,
            Err(panic) => {
                error!(cid = %cid, panic = %panic_message(panic.as_ref()), "Ingress panicked, message dropped");
                IngestOutcome::Dropped(DropReason::Panicked)
            }
        };

        self.record(outcome);
        outcome
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("phase", &self.phase())
            .field("queue_depth", &self.queue_depth())
            .field("gate", &self.inner.gate)
            .finish()
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        // Last handle gone without stop(): let the consumer drain and exit
        self.publisher.close();
    }
}
