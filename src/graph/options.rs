//! Graph behaviour options.

use crate::core::error::FlowResult;
use serde::{Deserialize, Serialize};

/// What `connect` does when the target input already has a writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupiedInputPolicy {
    /// Remove the old connection, then make the new one.
    Replace,
    /// Reject with `InputOccupied`.
    Reject,
}

/// Options controlling how a [`Graph`](crate::graph::Graph) mutates and
/// propagates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphOptions {
    /// Policy for connecting onto an occupied input.
    pub occupied_input: OccupiedInputPolicy,
    /// Whether disconnecting resets the input value to null.
    pub clear_on_disconnect: bool,
    /// Whether a new connection immediately pushes the output's value.
    pub push_on_connect: bool,
    /// Whether node evaluators run when one of their inputs changes.
    pub evaluate_on_input_change: bool,
    /// Whether values must fit the property's type-set.
    pub enforce_value_types: bool,
    /// Whether externally set values are checked against constraints.
    pub enforce_constraints: bool,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            occupied_input: OccupiedInputPolicy::Replace,
            clear_on_disconnect: true,
            push_on_connect: true,
            evaluate_on_input_change: true,
            enforce_value_types: true,
            enforce_constraints: true,
        }
    }
}

impl GraphOptions {
    /// Create the default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from JSON. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> FlowResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the occupied-input policy.
    pub fn with_occupied_input(mut self, policy: OccupiedInputPolicy) -> Self {
        self.occupied_input = policy;
        self
    }

    /// Keep (false) or clear (true) an input's value on disconnect.
    pub fn with_clear_on_disconnect(mut self, clear: bool) -> Self {
        self.clear_on_disconnect = clear;
        self
    }

    /// Enable/disable the initial push on connect.
    pub fn with_push_on_connect(mut self, push: bool) -> Self {
        self.push_on_connect = push;
        self
    }

    /// Enable/disable node evaluation on input change.
    pub fn with_evaluation(mut self, evaluate: bool) -> Self {
        self.evaluate_on_input_change = evaluate;
        self
    }

    /// Enable/disable value type enforcement.
    pub fn with_value_types(mut self, enforce: bool) -> Self {
        self.enforce_value_types = enforce;
        self
    }

    /// Enable/disable constraint enforcement.
    pub fn with_constraints(mut self, enforce: bool) -> Self {
        self.enforce_constraints = enforce;
        self
    }
}
