//! # Dedup Gate
//!
//! At-most-once admission of applied messages, keyed by CID.
//!
//! The gate is the only duplicate guard in the pipeline, so it runs before
//! enqueue. Losing the race is the normal dedup signal; a backend error is
//! reported separately and the caller must fail closed.

use crate::domain::LockError;
use crate::ports::MessageLocker;
use shared_types::Cid;
use std::sync::Arc;
use std::time::Duration;

/// Admission check in front of the ingestion queue.
#[derive(Clone)]
pub struct DedupGate {
    locker: Arc<dyn MessageLocker>,
}

impl DedupGate {
    /// Wrap a lock backend.
    pub fn new(locker: Arc<dyn MessageLocker>) -> Self {
        Self { locker }
    }

    /// Lock key of a CID: its lowercase hex rendering.
    #[must_use]
    pub fn key_for(cid: &Cid) -> String {
        cid.to_hex()
    }

    /// Try to admit `cid`.
    ///
    /// ## Returns
    ///
    /// - `Ok(true)`: First admission within the TTL window
    /// - `Ok(false)`: Already admitted here or by another instance
    /// - `Err(LockError)`: Backend failure; the message is not admitted
    pub async fn try_admit(&self, cid: &Cid) -> Result<bool, LockError> {
        self.locker.acquire(&Self::key_for(cid)).await
    }

    /// Validity window of an admission.
    pub fn ttl(&self) -> Duration {
        self.locker.ttl()
    }
}

impl std::fmt::Debug for DedupGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DedupGate")
            .field("ttl", &self.locker.ttl())
            .finish()
    }
}
