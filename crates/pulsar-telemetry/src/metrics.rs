//! Prometheus metrics for the message pipeline.
//!
//! All metrics follow the naming convention: `pulsar_<area>_<metric>_<unit>`
//!
//! ## Metric Types
//!
//! - **Counter**: Monotonically increasing value (e.g., ingress_messages_total)
//! - **Gauge**: Value that can go up or down (e.g., queue_depth)
//! - **Histogram**: Distribution of values (e.g., dispatch_duration_seconds)

use lazy_static::lazy_static;
use prometheus::{
    exponential_buckets, Counter, CounterVec, Encoder, Gauge, Histogram, HistogramOpts, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // INGRESS
    // =========================================================================

    /// Apply callbacks by outcome
    pub static ref INGRESS_MESSAGES: CounterVec = CounterVec::new(
        Opts::new("pulsar_ingress_messages_total", "Apply callbacks received, by outcome"),
        &["outcome"]  // enqueued/duplicate/lock_error/cancelled/stopped/panicked
    ).expect("metric creation failed");

    /// Items waiting in the ingestion queue
    pub static ref QUEUE_DEPTH: Gauge = Gauge::new(
        "pulsar_queue_depth",
        "Applied transactions waiting in the ingestion queue"
    ).expect("metric creation failed");

    // =========================================================================
    // FLATTENING
    // =========================================================================

    /// Messages extracted from execution traces
    pub static ref FLATTENED_MESSAGES: Counter = Counter::new(
        "pulsar_flatten_messages_total",
        "Messages extracted from execution traces"
    ).expect("metric creation failed");

    /// Trace nodes visited, including nodes without a message
    pub static ref FLATTENED_NODES: Counter = Counter::new(
        "pulsar_flatten_nodes_total",
        "Execution trace nodes visited"
    ).expect("metric creation failed");

    // =========================================================================
    // DISPATCH
    // =========================================================================

    /// Notifications by outcome
    pub static ref NOTIFICATIONS: CounterVec = CounterVec::new(
        Opts::new("pulsar_notifications_total", "Notifications attempted, by outcome"),
        &["outcome"]  // delivered/failed/panicked
    ).expect("metric creation failed");

    /// Addressee lookups that failed
    pub static ref RESOLVE_FAILURES: Counter = Counter::new(
        "pulsar_resolve_failures_total",
        "Addressee lookups that returned an error"
    ).expect("metric creation failed");

    /// Workers currently delivering
    pub static ref DISPATCH_WORKERS_BUSY: Gauge = Gauge::new(
        "pulsar_dispatch_workers_busy",
        "Dispatch workers currently holding a pool slot"
    ).expect("metric creation failed");

    /// Time to flatten, resolve and hand one transaction to the pool
    pub static ref DISPATCH_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pulsar_dispatch_duration_seconds",
            "Time spent flattening, resolving and submitting one applied transaction"
        ).buckets(exponential_buckets(0.0001, 2.0, 15).expect("bucket layout"))
    ).expect("metric creation failed");
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    registry: Arc<Registry>,
}

impl MetricsHandle {
    /// Registry holding the pipeline metrics.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

/// Register all metrics with the global registry.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if a metric is already registered.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Ingress
        Box::new(INGRESS_MESSAGES.clone()),
        Box::new(QUEUE_DEPTH.clone()),
        // Flattening
        Box::new(FLATTENED_MESSAGES.clone()),
        Box::new(FLATTENED_NODES.clone()),
        // Dispatch
        Box::new(NOTIFICATIONS.clone()),
        Box::new(RESOLVE_FAILURES.clone()),
        Box::new(DISPATCH_WORKERS_BUSY.clone()),
        Box::new(DISPATCH_DURATION.clone()),
    ];

    for metric in metrics {
        REGISTRY
            .register(metric)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    }

    Ok(MetricsHandle {
        registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
///
/// # Errors
///
/// `TelemetryError::MetricsInit` if encoding fails.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: std::time::Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: std::time::Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.histogram.observe(duration);
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}
