//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the pipeline needs from the rest of the node.

use crate::domain::{FlatMessage, LockError, NotifyError, ResolveError};
use async_trait::async_trait;
use shared_types::{Address, AppId};
use std::collections::BTreeSet;
use std::time::Duration;

/// Distributed, expiring lock keyed by string.
///
/// Shared by every node instance that may process the same messages, so
/// exactly one of them wins each key per TTL window.
#[async_trait]
pub trait MessageLocker: Send + Sync {
    /// Try to take the lock for `key`.
    ///
    /// ## Returns
    ///
    /// - `Ok(true)`: This caller holds the lock until the TTL expires
    /// - `Ok(false)`: Someone else holds it
    /// - `Err(LockError)`: The backend failed
    async fn acquire(&self, key: &str) -> Result<bool, LockError>;

    /// Lock validity window.
    fn ttl(&self) -> Duration;
}

/// Maps an address to the applications subscribed to it.
#[async_trait]
pub trait AddresseeResolver: Send + Sync {
    /// Applications watching `address`. Empty when nobody does.
    async fn resolve(&self, address: &Address) -> Result<BTreeSet<AppId>, ResolveError>;
}

/// Delivers one notification to one application.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Notify `app_id` that `message` moved value or state between `from`
    /// and `to`.
    async fn notify(
        &self,
        app_id: &AppId,
        from: &Address,
        to: &Address,
        message: &FlatMessage,
    ) -> Result<(), NotifyError>;

    /// Release transport resources.
    ///
    /// Called once, after the last notification of a drained dispatcher.
    async fn close(&self) {}
}
