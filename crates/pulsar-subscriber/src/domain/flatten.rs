//! # Trace Flattener
//!
//! Turns one transaction's call tree into an ordered list of messages.
//!
//! Order is pre-order: a node's own message, then each subcall's flattened
//! list in call order. Delivery submission follows this order.
//!
//! Depth is bounded only by execution gas, so traversal uses an explicit
//! stack instead of recursion.

use super::entities::{AppliedTransaction, FlatMessage};
use shared_types::{ExecutionTrace, Message};
use std::sync::Arc;

/// Messages of one call tree, borrowed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedTrace<'a> {
    /// Messages in pre-order.
    pub messages: Vec<&'a Message>,
    /// Nodes visited, including those without a message.
    ///
    /// Always `>= messages.len()`.
    pub visited: usize,
}

/// Flatten a call tree in pre-order.
#[must_use]
pub fn flatten_trace(root: &ExecutionTrace) -> FlattenedTrace<'_> {
    let mut messages = Vec::new();
    let mut visited = 0;
    let mut stack = vec![root];

    while let Some(node) = stack.pop() {
        visited += 1;
        if let Some(msg) = &node.msg {
            messages.push(msg);
        }
        // Reversed so the first subcall is popped next
        stack.extend(node.subcalls.iter().rev());
    }

    FlattenedTrace { messages, visited }
}

/// Flatten a transaction's trace into owned, context-tagged messages.
///
/// Returns the messages and the number of trace nodes visited.
#[must_use]
pub fn flatten_transaction(tx: &AppliedTransaction) -> (Vec<FlatMessage>, usize) {
    let flattened = flatten_trace(tx.trace());
    let messages = flattened
        .messages
        .into_iter()
        .enumerate()
        .map(|(index, message)| FlatMessage {
            tip_set: Arc::clone(&tx.tip_set),
            root_cid: tx.cid,
            implicit: tx.implicit,
            index,
            message: message.clone(),
        })
        .collect();
    (messages, flattened.visited)
}
