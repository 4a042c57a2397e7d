//! Structured logging setup.
//!
//! Installs a `tracing-subscriber` registry with an `EnvFilter` and either a
//! pretty (development) or JSON (containers) formatting layer. JSON lines carry
//! consistent fields so log shippers can parse them:
//! - `timestamp`, `level`, `target`
//! - `cid`: message CID, on every pipeline event about one message
//! - `app_id`: subscriber application, on every delivery event

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::{TelemetryConfig, TelemetryError};

/// Handle proving logging was installed by this process.
#[derive(Debug)]
pub struct StructuredLogger {
    json: bool,
}

impl StructuredLogger {
    /// Whether JSON output was selected.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.json
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
///
/// `TelemetryError::LoggingInit` if the filter is invalid or a global
/// subscriber is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<StructuredLogger, TelemetryError> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    if !config.console_output {
        tracing_subscriber::registry()
            .with(env_filter)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else if config.json_logs {
        // JSON output for containers/production
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        // Pretty output for development
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .with_ansi(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        service = %config.service_name,
        network = %config.network,
        json_logs = config.json_logs,
        "Structured logging initialized"
    );

    Ok(StructuredLogger {
        json: config.json_logs,
    })
}

/// Install a test-friendly subscriber writing through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

/// Log a pipeline event about one message with standard fields.
#[macro_export]
macro_rules! log_msg_event {
    ($level:ident, $msg:expr, $cid:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            cid = %$cid,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a delivery event for one (message, application) pair.
#[macro_export]
macro_rules! log_delivery_event {
    ($level:ident, $msg:expr, $cid:expr, $app_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            cid = %$cid,
            app_id = %$app_id,
            $($($field)*,)?
            $msg
        )
    };
}
