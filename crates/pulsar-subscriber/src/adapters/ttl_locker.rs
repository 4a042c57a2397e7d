//! # Time-Bounded Message Locker
//!
//! In-process [`MessageLocker`] for single-node deployments and tests.
//!
//! - A key is held from its first successful acquire until the TTL elapses
//! - Expired keys may be acquired again
//! - Expired entries are swept every `gc_interval`, bounding memory

use crate::domain::{LockError, SubscriberConfig, DEFAULT_DEDUP_TTL, DEFAULT_LOCK_GC_INTERVAL};
use crate::ports::MessageLocker;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

struct LockTable {
    /// Key -> instant the lock expires.
    held: HashMap<String, Instant>,
    last_gc: Instant,
}

/// Expiring lock table guarded by a single mutex.
pub struct InMemoryMessageLocker {
    table: Mutex<LockTable>,
    ttl: Duration,
    gc_interval: Duration,
}

impl InMemoryMessageLocker {
    /// Create a locker with the default TTL (20s) and sweep interval.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_DEDUP_TTL, DEFAULT_LOCK_GC_INTERVAL)
    }

    /// Create a locker with custom settings.
    #[must_use]
    pub fn with_config(ttl: Duration, gc_interval: Duration) -> Self {
        Self {
            table: Mutex::new(LockTable {
                held: HashMap::new(),
                last_gc: Instant::now(),
            }),
            ttl,
            gc_interval,
        }
    }

    /// Create a locker from pipeline configuration.
    #[must_use]
    pub fn from_config(config: &SubscriberConfig) -> Self {
        Self::with_config(config.dedup_ttl, config.lock_gc_interval)
    }

    /// Take `key` if it is free or expired. Check and insert are atomic.
    pub fn try_lock(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut table = self.table.lock();

        if now.saturating_duration_since(table.last_gc) > self.gc_interval {
            table.held.retain(|_, expires_at| *expires_at > now);
            table.last_gc = now;
        }

        match table.held.get(key) {
            Some(expires_at) if *expires_at > now => false,
            _ => {
                table.held.insert(key.to_owned(), now + self.ttl);
                true
            }
        }
    }

    /// Entries currently stored, including expired ones not yet swept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().held.len()
    }

    /// Whether no entry is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.lock().held.is_empty()
    }
}

impl Default for InMemoryMessageLocker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageLocker for InMemoryMessageLocker {
    async fn acquire(&self, key: &str) -> Result<bool, LockError> {
        Ok(self.try_lock(key))
    }

    fn ttl(&self) -> Duration {
        self.ttl
    }
}
