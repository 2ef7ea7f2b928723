//! Graph events and propagation reports.

use crate::core::error::{EvaluationError, NodeId, PropertyId};
use crate::core::types::Value;
use crate::graph::connection::Connection;
use std::fmt;

/// Something observable happened to the graph.
#[derive(Debug, Clone, PartialEq)]
pub enum PropagationEvent {
    /// A node joined the graph.
    NodeAdded {
        /// The new node
        node_id: NodeId,
    },
    /// A node and all its connections left the graph.
    NodeRemoved {
        /// The removed node
        node_id: NodeId,
    },
    /// A connection was made.
    Connected {
        /// The new connection
        connection: Connection,
    },
    /// A connection was removed.
    Disconnected {
        /// The removed connection
        connection: Connection,
    },
    /// A property's value changed.
    ValueChanged {
        /// Node owning the property
        node_id: NodeId,
        /// The property
        property: PropertyId,
        /// Its new value
        value: Option<Value>,
    },
    /// A node's evaluator ran successfully.
    NodeEvaluated {
        /// The evaluated node
        node_id: NodeId,
    },
    /// A node's evaluator failed; its outputs were left untouched.
    EvaluationFailed {
        /// The failing node
        node_id: NodeId,
        /// What the evaluator reported
        error: EvaluationError,
    },
}

/// Callback type for graph events.
pub type EventCallback = Box<dyn Fn(&PropagationEvent) + Send + Sync>;

/// Registered event callbacks.
#[derive(Default)]
pub(crate) struct EventBus {
    listeners: Vec<EventCallback>,
}

impl EventBus {
    pub(crate) fn subscribe(&mut self, callback: EventCallback) {
        self.listeners.push(callback);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub(crate) fn emit(&self, event: &PropagationEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// Summary of one cascade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    /// Properties whose value actually changed.
    pub values_changed: usize,
    /// Values handed across a connection.
    pub deliveries: usize,
    /// Successful evaluator runs.
    pub nodes_evaluated: usize,
    /// Evaluator failures, in the order they happened.
    pub errors: Vec<(NodeId, EvaluationError)>,
}

impl PropagationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if no evaluator failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: PropagationReport) {
        self.values_changed += other.values_changed;
        self.deliveries += other.deliveries;
        self.nodes_evaluated += other.nodes_evaluated;
        self.errors.extend(other.errors);
    }
}
