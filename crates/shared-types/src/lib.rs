//! # Shared Types Crate
//!
//! Chain entities consumed by the message subscription pipeline.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Tip-sets, messages, receipts and execution
//!   traces are defined once here and shared by every crate.
//! - **Immutable Inputs**: Values handed over by the node are never mutated by
//!   the pipeline; they are cloned or wrapped in `Arc` when shared.
//! - **Text Identity**: `Cid` renders as lowercase hex and that rendering is the
//!   key used for deduplication.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
