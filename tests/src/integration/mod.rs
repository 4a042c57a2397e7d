//! End-to-end flows through the `Dispatcher`.

pub mod lifecycle;
