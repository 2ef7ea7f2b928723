//! Per-output subscriber lists.
//!
//! Each live connection holds exactly one subscription on its output
//! property. Setting the output's value walks this list; disconnecting
//! cancels the subscription so no further updates flow.

use crate::core::error::{ConnectionId, PropertyId};
use std::collections::HashMap;

/// A single downstream input listening to an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription {
    /// The connection that owns this subscription.
    pub connection: ConnectionId,
    /// The input receiving the output's values.
    pub input: PropertyId,
}

/// Subscriber lists keyed by output property.
#[derive(Debug, Clone, Default)]
pub struct PropagationChannel {
    subscribers: HashMap<PropertyId, Vec<Subscription>>,
}

impl PropagationChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `input` as a subscriber of `output`.
    pub fn subscribe(&mut self, output: PropertyId, connection: ConnectionId, input: PropertyId) {
        self.subscribers
            .entry(output)
            .or_default()
            .push(Subscription { connection, input });
    }

    /// Cancel the subscription owned by `connection`. Returns whether one
    /// was found.
    pub fn unsubscribe(&mut self, output: PropertyId, connection: ConnectionId) -> bool {
        let Some(list) = self.subscribers.get_mut(&output) else {
            return false;
        };
        let before = list.len();
        list.retain(|s| s.connection != connection);
        let removed = list.len() != before;
        if list.is_empty() {
            self.subscribers.remove(&output);
        }
        removed
    }

    /// Subscribers of an output, in subscription order.
    pub fn subscribers(&self, output: PropertyId) -> &[Subscription] {
        self.subscribers
            .get(&output)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether anything listens to `output`.
    pub fn has_subscribers(&self, output: PropertyId) -> bool {
        self.subscribers.contains_key(&output)
    }

    /// Total number of live subscriptions.
    pub fn len(&self) -> usize {
        self.subscribers.values().map(Vec::len).sum()
    }

    /// True if no subscription is live.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Iterate every `(output, subscription)` pair.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyId, &Subscription)> {
        self.subscribers
            .iter()
            .flat_map(|(output, list)| list.iter().map(move |s| (*output, s)))
    }

    /// Drop every subscription.
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}
