//! Adapters layer: in-process implementations of the outbound ports.
//!
//! Production deployments plug in a shared lock service, the subscription
//! store and a real transport behind the same traits.

pub mod notifier;
pub mod ttl_locker;
pub mod watch_list;

pub use notifier::{ChannelNotifier, LoggingNotifier};
pub use ttl_locker::InMemoryMessageLocker;
pub use watch_list::WatchList;
