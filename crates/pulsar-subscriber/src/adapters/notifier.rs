//! # Notifier Adapters
//!
//! - [`LoggingNotifier`]: writes each notification to the log, for dry runs
//! - [`ChannelNotifier`]: forwards each notification into a Tokio channel,
//!   for embedding the pipeline in a larger process

use crate::domain::{FlatMessage, NotifyError, SubscriberMatch};
use crate::ports::Notifier;
use async_trait::async_trait;
use pulsar_telemetry::log_delivery_event;
use shared_types::{Address, AppId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

/// Notifier that only logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingNotifier;

impl LoggingNotifier {
    /// Create a logging notifier.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        app_id: &AppId,
        from: &Address,
        to: &Address,
        message: &FlatMessage,
    ) -> Result<(), NotifyError> {
        log_delivery_event!(
            info,
            "Notification",
            message.root_cid,
            app_id,
            from = %from,
            to = %to,
            index = message.index
        );
        Ok(())
    }

    async fn close(&self) {
        info!("Logging notifier closed");
    }
}

/// Notifier that forwards matches to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<SubscriberMatch>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver its matches arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SubscriberMatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn notify(
        &self,
        app_id: &AppId,
        _from: &Address,
        _to: &Address,
        message: &FlatMessage,
    ) -> Result<(), NotifyError> {
        self.sender
            .send(SubscriberMatch {
                app_id: app_id.clone(),
                message: Arc::new(message.clone()),
            })
            .map_err(|_| NotifyError::Transport("receiver dropped".into()))
    }
}
