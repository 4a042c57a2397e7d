//! # Inbound Ports (Driving Ports)
//!
//! The API the node drives: one callback per applied message.

use crate::domain::IngestOutcome;
use async_trait::async_trait;
use shared_types::{ApplyRet, Cid, Message, TipSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Hook invoked by the node each time it applies a message.
///
/// Implementations must return promptly: the call sits on the node's
/// message-application path. The result is informational; the node treats
/// every outcome as success.
#[async_trait]
pub trait MessageAppliedHandler: Send + Sync {
    /// Hand over one applied message.
    ///
    /// ## Parameters
    ///
    /// - `cancel`: Fires when the caller no longer wants the call to proceed
    /// - `tip_set`: Tip-set the message was applied in
    /// - `cid`: Content identifier of the top-level message
    /// - `message`: The top-level message
    /// - `ret`: Receipt and full execution trace
    /// - `implicit`: System-generated rather than user-submitted
    async fn message_applied(
        &self,
        cancel: &CancellationToken,
        tip_set: Arc<TipSet>,
        cid: Cid,
        message: Message,
        ret: ApplyRet,
        implicit: bool,
    ) -> IngestOutcome;
}
