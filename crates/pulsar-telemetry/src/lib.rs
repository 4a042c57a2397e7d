//! # Pulsar Telemetry
//!
//! Observability for the message pipeline.
//!
//! ## Components
//!
//! - **Logging**: `tracing` events rendered by `tracing-subscriber`, pretty in
//!   development and JSON in containers
//! - **Metrics**: Prometheus counters, gauges and histograms in a global
//!   registry, including the ingestion queue depth
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pulsar_telemetry::{TelemetryConfig, init_telemetry};
//!
//! let config = TelemetryConfig::from_env();
//! let _guard = init_telemetry(config).expect("Failed to init telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `PULSAR_SERVICE_NAME` | `pulsar` | Service name in logs |
//! | `PULSAR_LOG_LEVEL` | `info` | Log level filter |
//! | `PULSAR_JSON_LOGS` | `false` | JSON log lines |
//! | `PULSAR_NETWORK` | `mainnet` | Network name on the startup log line |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::{init_logging, init_test_logging, StructuredLogger};
pub use metrics::{
    encode_metrics, register_metrics, MetricsHandle, DISPATCH_DURATION, DISPATCH_WORKERS_BUSY,
    FLATTENED_MESSAGES, FLATTENED_NODES, INGRESS_MESSAGES, NOTIFICATIONS, QUEUE_DEPTH,
    RESOLVE_FAILURES,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),
}

/// Initialize logging and metrics.
///
/// Returns a guard that must be held for the lifetime of the application.
///
/// # Errors
///
/// Propagates logging or metrics registration failures.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    // Metrics first so early log lines can already count
    let metrics = register_metrics()?;
    let logger = init_logging(&config)?;

    Ok(TelemetryGuard {
        _logger: logger,
        metrics,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _logger: StructuredLogger,
    metrics: MetricsHandle,
}

impl TelemetryGuard {
    /// The registered metrics.
    pub fn metrics(&self) -> &MetricsHandle {
        &self.metrics
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry");
    }
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}
