//! # Pulsar Test Suite
//!
//! Unified test crate for the message pipeline.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Notifier/locker doubles, message and trace builders
//! └── integration/      # End-to-end flows through the Dispatcher
//!     ├── dedup.rs      # At-most-once admission across instances
//!     ├── fanout.rs     # Ordering, addressee union, failure isolation
//!     └── lifecycle.rs  # Non-blocking ingress, drain on stop, late calls
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p pulsar-tests
//!
//! # By category
//! cargo test -p pulsar-tests integration::lifecycle::
//!
//! # Benchmarks
//! cargo bench -p pulsar-tests
//! ```

#![allow(dead_code)]

pub mod fixtures;
pub mod integration;
