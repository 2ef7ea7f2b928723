//! Connection types for the graph.

use crate::core::error::{ConnectionId, NodeId, PropertyId};
use serde::{Deserialize, Serialize};

/// An endpoint of a connection (node + property).
///
/// The node ID is cached next to the property so adjacency can be derived
/// without touching the node table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    /// The node that owns the property.
    pub node_id: NodeId,
    /// The property on that node.
    pub property_id: PropertyId,
}

impl Endpoint {
    /// Create a new endpoint.
    pub fn new(node_id: NodeId, property_id: PropertyId) -> Self {
        Self {
            node_id,
            property_id,
        }
    }
}

/// A directed, single-writer edge from an output property to an input
/// property.
///
/// Connections are only created by [`Graph::connect`](crate::graph::Graph::connect)
/// and removed by [`Graph::disconnect`](crate::graph::Graph::disconnect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Unique identifier for this connection.
    pub id: ConnectionId,
    /// Source endpoint (output property).
    pub output: Endpoint,
    /// Target endpoint (input property).
    pub input: Endpoint,
}

impl Connection {
    pub(crate) fn new(output: Endpoint, input: Endpoint) -> Self {
        Self {
            id: ConnectionId::new(),
            output,
            input,
        }
    }

    /// ID of the output property feeding this connection.
    pub fn output_property(&self) -> PropertyId {
        self.output.property_id
    }

    /// ID of the input property this connection writes.
    pub fn input_property(&self) -> PropertyId {
        self.input.property_id
    }

    /// Check if this connection touches a node on either end.
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.output.node_id == node_id || self.input.node_id == node_id
    }

    /// Check if this connection touches a property on either end.
    pub fn involves_property(&self, property_id: PropertyId) -> bool {
        self.output.property_id == property_id || self.input.property_id == property_id
    }
}
