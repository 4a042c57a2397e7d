//! # Core Chain Entities
//!
//! The values the node's execution layer hands to the pipeline for every
//! applied message.
//!
//! ## Clusters
//!
//! - **Identity**: `Cid`, `Address`, `AppId`
//! - **Chain**: `TipSet`, `Message`
//! - **Execution**: `MessageReceipt`, `ApplyRet`, `ExecutionTrace`

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;
use std::str::FromStr;

// Re-export U256 from primitive-types for token amounts
pub use primitive_types::U256;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// A 32-byte content hash.
pub type Hash = [u8; 32];

/// Content identifier of a message.
///
/// Rendered as lowercase hex; the rendering is the deduplication key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Cid(pub Hash);

impl Cid {
    /// Wrap raw digest bytes.
    #[must_use]
    pub const fn from_bytes(bytes: Hash) -> Self {
        Self(bytes)
    }

    /// Raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Lowercase hex rendering.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a CID from its hex rendering.
    ///
    /// # Errors
    ///
    /// - `TypeError::InvalidCidEncoding` - Not hex
    /// - `TypeError::InvalidCidLength` - Not exactly 32 bytes
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidCidEncoding(e.to_string()))?;
        let actual = bytes.len();
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| TypeError::InvalidCidLength { actual })?;
        Ok(Self(hash))
    }
}

impl fmt::Display for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Cid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cid({}..)", hex::encode(&self.0[..4]))
    }
}

impl FromStr for Cid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

/// An account address in its canonical string form (e.g. `f01234`).
///
/// Address semantics (protocol, checksum) belong to the node; the pipeline
/// only compares addresses for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    /// Create an address from its string form.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(TypeError::EmptyAddress);
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Identifier of a downstream application that subscribes to addresses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AppId(String);

impl AppId {
    /// Create an application identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AppId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// CLUSTER B: THE CHAIN
// =============================================================================

/// The set of blocks at one height that a message was applied in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TipSet {
    /// Chain epoch of the tip-set.
    pub height: u64,
    /// CIDs of the blocks forming the tip-set.
    pub block_cids: Vec<Cid>,
}

impl TipSet {
    /// Create a tip-set.
    #[must_use]
    pub fn new(height: u64, block_cids: Vec<Cid>) -> Self {
        Self { height, block_cids }
    }
}

/// A message: either the top-level one a user submitted or an internal
/// actor-to-actor send triggered while executing it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    /// Message format version.
    pub version: u64,
    /// Recipient address.
    pub to: Address,
    /// Sender address.
    pub from: Address,
    /// Sender's sequence number.
    pub nonce: u64,
    /// Amount transferred.
    pub value: U256,
    /// Gas limit.
    pub gas_limit: i64,
    /// Maximum fee per gas unit.
    pub gas_fee_cap: U256,
    /// Miner tip per gas unit.
    pub gas_premium: U256,
    /// Actor method number.
    pub method: u64,
    /// Encoded method parameters.
    #[serde_as(as = "Bytes")]
    pub params: Vec<u8>,
}

impl Message {
    /// Create a plain send from `from` to `to` with zero value.
    pub fn new(from: impl Into<Address>, to: impl Into<Address>, nonce: u64) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            nonce,
            ..Self::default()
        }
    }

    /// Set the transferred value.
    #[must_use]
    pub fn with_value(mut self, value: U256) -> Self {
        self.value = value;
        self
    }

    /// Set the actor method and its parameters.
    #[must_use]
    pub fn with_method(mut self, method: u64, params: Vec<u8>) -> Self {
        self.method = method;
        self.params = params;
        self
    }
}

// =============================================================================
// CLUSTER C: EXECUTION
// =============================================================================

/// Outcome of executing a message.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageReceipt {
    /// Exit code; zero is success.
    pub exit_code: i64,
    /// Value returned by the invoked method.
    #[serde_as(as = "Bytes")]
    pub return_data: Vec<u8>,
    /// Gas consumed.
    pub gas_used: i64,
}

impl MessageReceipt {
    /// Whether execution succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// One node of the call tree produced while executing a message.
///
/// Bookkeeping nodes may carry no message. Subcalls are kept in call order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionTrace {
    /// The message this node executed, if any.
    pub msg: Option<Message>,
    /// Receipt of this call.
    pub msg_receipt: Option<MessageReceipt>,
    /// Actor error raised by this call.
    pub error: Option<String>,
    /// Nested sends, in call order.
    pub subcalls: Vec<ExecutionTrace>,
}

impl ExecutionTrace {
    /// A trace node carrying `msg` and no subcalls.
    #[must_use]
    pub fn new(msg: Message) -> Self {
        Self {
            msg: Some(msg),
            msg_receipt: None,
            error: None,
            subcalls: Vec::new(),
        }
    }

    /// A bookkeeping node with no message.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append one subcall.
    #[must_use]
    pub fn with_subcall(mut self, subcall: ExecutionTrace) -> Self {
        self.subcalls.push(subcall);
        self
    }

    /// Append several subcalls in order.
    #[must_use]
    pub fn with_subcalls(mut self, subcalls: impl IntoIterator<Item = ExecutionTrace>) -> Self {
        self.subcalls.extend(subcalls);
        self
    }
}

// Call depth is bounded only by gas, so the default recursive drop could
// exhaust the stack on pathological traces.
impl Drop for ExecutionTrace {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.subcalls);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.subcalls);
        }
    }
}

/// Result of applying a message to chain state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ApplyRet {
    /// Receipt of the top-level message.
    pub receipt: MessageReceipt,
    /// Actor error of the top-level call.
    pub actor_error: Option<String>,
    /// Root of the call tree.
    pub execution_trace: ExecutionTrace,
}

impl ApplyRet {
    /// Wrap a trace with a successful receipt.
    #[must_use]
    pub fn from_trace(execution_trace: ExecutionTrace) -> Self {
        Self {
            receipt: MessageReceipt::default(),
            actor_error: None,
            execution_trace,
        }
    }
}
