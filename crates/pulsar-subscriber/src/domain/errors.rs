//! # Domain Errors
//!
//! Error types for the message subscription pipeline.
//!
//! Only [`SubscriberError`] ever reaches a caller, and only from
//! construction. Everything raised after that is logged and absorbed at the
//! layer where it happened.

use thiserror::Error;

/// Invalid pipeline configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The worker pool must have at least one slot.
    #[error("work_pool_size cannot be 0")]
    ZeroWorkPool,

    /// The worker pool exceeds the hard ceiling.
    #[error("work_pool_size {requested} exceeds the maximum of {max}")]
    WorkPoolAboveCeiling { requested: usize, max: usize },

    /// The queue buffer hint must be positive.
    #[error("msg_buffer cannot be 0")]
    ZeroBuffer,

    /// The dedup lock must expire eventually but not immediately.
    #[error("dedup_ttl cannot be 0")]
    ZeroTtl,
}

/// Failures constructing the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubscriberError {
    /// Configuration rejected.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The dispatcher spawns its consumer on the current Tokio runtime.
    #[error("Dispatcher must be created inside a Tokio runtime")]
    NoRuntime,
}

/// Lock backend failures. A lost race for the lock is not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The backend could not be reached.
    #[error("Lock backend unavailable: {0}")]
    Unavailable(String),

    /// The backend did not answer in time.
    #[error("Lock backend timed out after {millis}ms")]
    Timeout { millis: u64 },
}

/// Subscription lookup failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The subscription store failed.
    #[error("Subscription store error: {0}")]
    Store(String),
}

/// Delivery failure for one (message, application) pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    /// The application refused the notification.
    #[error("Application rejected notification: {reason}")]
    Rejected { reason: String },

    /// The transport failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Delivery did not complete in time.
    #[error("Notification timed out")]
    Timeout,
}
