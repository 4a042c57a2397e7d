//! # Error Types
//!
//! Errors raised while parsing chain entities from their text form.

use thiserror::Error;

/// Errors that can occur when decoding chain entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// The CID text is not valid hex.
    #[error("Invalid CID encoding: {0}")]
    InvalidCidEncoding(String),

    /// The CID has the wrong number of bytes.
    #[error("Invalid CID length: expected 32 bytes, got {actual}")]
    InvalidCidLength { actual: usize },

    /// An address string was empty.
    #[error("Address cannot be empty")]
    EmptyAddress,
}
