//! # Pipeline Entities
//!
//! Values that travel through the pipeline. None of them is persisted.
//!
//! ```text
//! AppliedTransaction ──flatten──→ FlatMessage* ──resolve──→ PackedMessage
//!                                                               │
//!                                                          matches()
//!                                                               ↓
//!                                                     SubscriberMatch*
//! ```

use shared_types::{Address, AppId, ApplyRet, Cid, ExecutionTrace, Message, MessageReceipt, TipSet};
use std::sync::Arc;

/// One message the node has applied, as handed to the ingress callback.
#[derive(Debug, Clone)]
pub struct AppliedTransaction {
    /// Tip-set the message was applied in.
    pub tip_set: Arc<TipSet>,
    /// Content identifier of the top-level message.
    pub cid: Cid,
    /// The top-level message.
    pub message: Message,
    /// Receipt and execution trace.
    pub ret: ApplyRet,
    /// System-generated rather than user-submitted.
    pub implicit: bool,
}

impl AppliedTransaction {
    /// Bundle the callback arguments.
    #[must_use]
    pub fn new(
        tip_set: Arc<TipSet>,
        cid: Cid,
        message: Message,
        ret: ApplyRet,
        implicit: bool,
    ) -> Self {
        Self {
            tip_set,
            cid,
            message,
            ret,
            implicit,
        }
    }

    /// Receipt of the top-level message.
    #[must_use]
    pub fn receipt(&self) -> &MessageReceipt {
        &self.ret.receipt
    }

    /// Root of the call tree.
    #[must_use]
    pub fn trace(&self) -> &ExecutionTrace {
        &self.ret.execution_trace
    }
}

/// A single message pulled out of a call tree, tagged with the transaction
/// it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatMessage {
    /// Tip-set of the originating transaction.
    pub tip_set: Arc<TipSet>,
    /// CID of the originating top-level message.
    pub root_cid: Cid,
    /// Implicit flag of the originating transaction.
    pub implicit: bool,
    /// Position in pre-order traversal; the root message is 0.
    pub index: usize,
    /// The message itself.
    pub message: Message,
}

impl FlatMessage {
    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &Address {
        &self.message.from
    }

    /// Recipient address.
    #[must_use]
    pub fn to(&self) -> &Address {
        &self.message.to
    }

    /// Whether this is the top-level message rather than an internal send.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.index == 0
    }
}

/// A message together with every application that watches one of its
/// endpoints.
#[derive(Debug, Clone)]
pub struct PackedMessage {
    /// The message to deliver.
    pub message: Arc<FlatMessage>,
    /// Interested applications, deduplicated and ordered.
    pub app_ids: Vec<AppId>,
}

impl PackedMessage {
    /// Pair a message with its addressees.
    #[must_use]
    pub fn new(message: Arc<FlatMessage>, app_ids: Vec<AppId>) -> Self {
        Self { message, app_ids }
    }

    /// One match per application, in `app_ids` order.
    pub fn matches(&self) -> impl Iterator<Item = SubscriberMatch> + '_ {
        self.app_ids.iter().map(|app_id| SubscriberMatch {
            app_id: app_id.clone(),
            message: Arc::clone(&self.message),
        })
    }
}

/// One unit of delivery work: notify `app_id` about `message`.
#[derive(Debug, Clone)]
pub struct SubscriberMatch {
    /// Receiving application.
    pub app_id: AppId,
    /// Message shared by every match derived from it.
    pub message: Arc<FlatMessage>,
}

/// What the ingress callback did with one applied message.
///
/// None of these is an error from the node's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Admitted by the dedup gate and queued for dispatch.
    Enqueued,
    /// Another caller already admitted this CID.
    Duplicate,
    /// Not queued.
    Dropped(DropReason),
}

impl IngestOutcome {
    /// Metric label for this outcome.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Duplicate => "duplicate",
            Self::Dropped(reason) => reason.as_label(),
        }
    }
}

/// Why an applied message was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The lock backend failed; fail closed rather than risk a double send.
    LockUnavailable,
    /// The caller's cancellation fired.
    Cancelled,
    /// The dispatcher is stopping or stopped.
    ShuttingDown,
    /// The ingress path panicked.
    Panicked,
}

impl DropReason {
    /// Metric label for this reason.
    #[must_use]
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::LockUnavailable => "lock_error",
            Self::Cancelled => "cancelled",
            Self::ShuttingDown => "stopped",
            Self::Panicked => "panicked",
        }
    }
}

/// Point-in-time counters of a dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherStats {
    /// Ingress callbacks received.
    pub received: u64,
    /// Applied messages queued.
    pub admitted: u64,
    /// Callbacks rejected as duplicates.
    pub duplicates: u64,
    /// Callbacks dropped for any [`DropReason`].
    pub dropped: u64,
    /// Notifications delivered.
    pub dispatched: u64,
    /// Notifications that failed or panicked.
    pub notify_failures: u64,
}
