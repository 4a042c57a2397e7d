//! Pipeline configuration with validation.

use super::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Initial capacity reserved in the ingestion queue.
pub const DEFAULT_MSG_BUFFER: usize = shared_bus::DEFAULT_MSG_BUFFER;

/// Default number of concurrent notifications.
pub const DEFAULT_WORK_POOL_SIZE: usize = 2000;

/// Hard ceiling for the worker pool; larger values are rejected.
pub const MAX_WORK_POOL_SIZE: usize = 3000;

/// How long a message CID stays locked after first admission.
pub const DEFAULT_DEDUP_TTL: Duration = Duration::from_secs(20);

/// How often the in-memory locker sweeps expired entries.
pub const DEFAULT_LOCK_GC_INTERVAL: Duration = Duration::from_secs(10);

/// Configuration consumed when the dispatcher is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Ingestion queue pre-allocation hint
    pub msg_buffer: usize,
    /// Concurrent notifications in flight
    pub work_pool_size: usize,
    /// Dedup lock validity window
    pub dedup_ttl: Duration,
    /// Sweep interval of the in-memory locker
    pub lock_gc_interval: Duration,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            msg_buffer: DEFAULT_MSG_BUFFER,
            work_pool_size: DEFAULT_WORK_POOL_SIZE,
            dedup_ttl: DEFAULT_DEDUP_TTL,
            lock_gc_interval: DEFAULT_LOCK_GC_INTERVAL,
        }
    }
}

impl SubscriberConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PULSAR_MSG_BUFFER`: Queue buffer hint (default: 500)
    /// - `PULSAR_WORK_POOL_SIZE`: Worker pool size (default: 2000, max: 3000)
    /// - `PULSAR_DEDUP_TTL_SECS`: Dedup lock TTL in seconds (default: 20)
    ///
    /// Unparsable values fall back to the default; out-of-range values are
    /// kept so that [`validate`](Self::validate) can reject them.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            msg_buffer: env::var("PULSAR_MSG_BUFFER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.msg_buffer),

            work_pool_size: env::var("PULSAR_WORK_POOL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.work_pool_size),

            dedup_ttl: env::var("PULSAR_DEDUP_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.dedup_ttl),

            lock_gc_interval: defaults.lock_gc_interval,
        }
    }

    /// Set the queue buffer hint.
    #[must_use]
    pub fn with_msg_buffer(mut self, msg_buffer: usize) -> Self {
        self.msg_buffer = msg_buffer;
        self
    }

    /// Set the worker pool size.
    #[must_use]
    pub fn with_work_pool_size(mut self, work_pool_size: usize) -> Self {
        self.work_pool_size = work_pool_size;
        self
    }

    /// Set the dedup lock TTL.
    #[must_use]
    pub fn with_dedup_ttl(mut self, dedup_ttl: Duration) -> Self {
        self.dedup_ttl = dedup_ttl;
        self
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// The first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.work_pool_size == 0 {
            return Err(ConfigError::ZeroWorkPool);
        }

        if self.work_pool_size > MAX_WORK_POOL_SIZE {
            return Err(ConfigError::WorkPoolAboveCeiling {
                requested: self.work_pool_size,
                max: MAX_WORK_POOL_SIZE,
            });
        }

        if self.msg_buffer == 0 {
            return Err(ConfigError::ZeroBuffer);
        }

        if self.dedup_ttl.is_zero() {
            return Err(ConfigError::ZeroTtl);
        }

        Ok(())
    }
}
