//! # Pulsar Subscriber
//!
//! Turns the node's "message applied" callback into per-application
//! notifications without slowing the node down.
//!
//! ## Pipeline
//!
//! ```text
//! node ──message_applied──→ DedupGate ──→ ingestion queue ──→ consumer
//!                                                               │
//!                                        flatten trace, resolve addressees
//!                                                               ↓
//!                                                   worker pool ──→ Notifier
//! ```
//!
//! ## Guarantees
//!
//! | Property | Enforcement |
//! |----------|-------------|
//! | At-most-once admission per CID and TTL window | `dedup.rs` via `MessageLocker` |
//! | Ingress never waits on delivery | unbounded queue in `shared-bus` |
//! | Pre-order delivery submission | `domain/flatten.rs` explicit stack |
//! | No admitted message lost on stop | `domain/lifecycle.rs` in-flight join before close |
//! | One failing delivery never affects another | `dispatch.rs` per-pair task with panic capture |
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - InMemoryMessageLocker, WatchList, notifiers        │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs  - MessageAppliedHandler                      │
//! │  ports/outbound.rs - MessageLocker, AddresseeResolver, Notifier │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  domain/ - entities, flatten, lifecycle, config, errors         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pulsar_subscriber::{Dispatcher, LoggingNotifier, SubscriberConfig, WatchList};
//!
//! let watch = Arc::new(WatchList::new());
//! let dispatcher = Dispatcher::new(SubscriberConfig::from_env(), watch, Arc::new(LoggingNotifier))?;
//! // hand `dispatcher` to the node as its MessageAppliedHandler
//! dispatcher.stop().await;
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapters;
pub mod dedup;
mod dispatch;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{ChannelNotifier, InMemoryMessageLocker, LoggingNotifier, WatchList};
pub use dedup::DedupGate;
pub use domain::*;
pub use ports::*;
pub use service::Dispatcher;
