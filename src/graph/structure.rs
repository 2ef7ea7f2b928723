//! Graph structure and management.
//!
//! The [`Graph`] owns every node, every connection and the propagation
//! channel between them. All structural changes go through it so the
//! following always hold between calls:
//! - each input has at most one incoming connection
//! - a connection always runs output → input on two different nodes
//! - the node-level dependency graph is acyclic
//! - a property's connected flag matches the connection set exactly

use crate::core::error::{
    ConnectionError, ConnectionId, ConnectionResult, GraphError, GraphResult, NodeId, PropertyId,
};
use crate::core::node::{Node, Position};
use crate::core::property::{self, Frame, Property};
use crate::core::types::Value;
use crate::graph::connection::{Connection, Endpoint};
use crate::graph::options::{GraphOptions, OccupiedInputPolicy};
use crate::graph::topology::TopologyAnalyzer;
use crate::propagation::channel::PropagationChannel;
use crate::propagation::events::{EventBus, PropagationEvent, PropagationReport};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;

/// The node graph.
///
/// Uses IndexMap to maintain insertion order for consistent iteration.
#[derive(Debug)]
pub struct Graph {
    /// All nodes in the graph, indexed by ID.
    nodes: IndexMap<NodeId, Node>,
    /// Owning node of every property in the graph.
    owners: HashMap<PropertyId, NodeId>,
    /// All connections in the graph.
    connections: IndexMap<ConnectionId, Connection>,
    /// The connection feeding each occupied input.
    inbound: HashMap<PropertyId, ConnectionId>,
    pub(crate) channel: PropagationChannel,
    pub(crate) options: GraphOptions,
    pub(crate) events: EventBus,
}

impl Graph {
    /// Create a new empty graph with default options.
    pub fn new() -> Self {
        Self::with_options(GraphOptions::default())
    }

    /// Create a new empty graph.
    pub fn with_options(options: GraphOptions) -> Self {
        Self {
            nodes: IndexMap::new(),
            owners: HashMap::new(),
            connections: IndexMap::new(),
            inbound: HashMap::new(),
            channel: PropagationChannel::new(),
            options,
            events: EventBus::default(),
        }
    }

    /// Options this graph was created with.
    pub fn options(&self) -> &GraphOptions {
        &self.options
    }

    /// Register a callback invoked synchronously for every graph event.
    pub fn subscribe_events<F>(&mut self, callback: F)
    where
        F: Fn(&PropagationEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(Box::new(callback));
    }

    pub(crate) fn emit(&self, event: PropagationEvent) {
        if !self.events.is_empty() {
            self.events.emit(&event);
        }
    }

    // ========================================================================
    // Node Management
    // ========================================================================

    /// Add a node to the graph.
    ///
    /// Fails with `DuplicateNode` if the node, or any of its properties, is
    /// already part of the graph (e.g. a clone of a node that was added).
    /// Initial values are checked like external writes, so a node whose
    /// descriptors carry a mistyped or out-of-range value is refused.
    pub fn add_node(&mut self, mut node: Node) -> GraphResult<NodeId> {
        let id = node.id();
        if self.nodes.contains_key(&id)
            || node.properties().any(|p| self.owners.contains_key(&p.id()))
        {
            return Err(GraphError::DuplicateNode(id));
        }
        for prop in node.properties() {
            if let Some(value) = prop.value() {
                prop.check_value(
                    value,
                    self.options.enforce_value_types,
                    self.options.enforce_constraints,
                )?;
            }
        }

        for prop in node.properties_mut() {
            prop.set_connected(false);
            self.owners.insert(prop.id(), id);
        }

        debug!("Added node {} '{}'", id, node.name());
        self.nodes.insert(id, node);
        self.emit(PropagationEvent::NodeAdded { node_id: id });
        Ok(id)
    }

    /// Remove a node from the graph.
    ///
    /// Every connection touching the node is disconnected first. Outgoing
    /// connections go before incoming ones, so clearing the node's own
    /// inputs cannot push anything downstream.
    pub fn remove_node(&mut self, id: NodeId) -> GraphResult<Node> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let (outgoing, incoming): (Vec<&Connection>, Vec<&Connection>) = self
            .connections
            .values()
            .filter(|c| c.involves_node(id))
            .partition(|c| c.output.node_id == id);
        let attached: Vec<ConnectionId> = outgoing
            .into_iter()
            .chain(incoming)
            .map(|c| c.id)
            .collect();

        for conn in attached {
            self.disconnect(conn);
        }

        let node = self
            .nodes
            .shift_remove(&id)
            .ok_or(GraphError::NodeNotFound(id))?;
        for prop in node.properties() {
            self.owners.remove(&prop.id());
        }

        debug!("Removed node {} '{}'", id, node.name());
        self.emit(PropagationEvent::NodeRemoved { node_id: id });
        Ok(node)
    }

    /// Get a node, if present.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Get a reference to a node.
    pub fn get_node(&self, id: NodeId) -> GraphResult<&Node> {
        self.nodes.get(&id).ok_or(GraphError::NodeNotFound(id))
    }

    /// Check if a node exists.
    pub fn has_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get all nodes, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs, in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node on the board.
    pub fn set_node_position(&mut self, id: NodeId, position: Position) -> GraphResult<()> {
        self.nodes
            .get_mut(&id)
            .ok_or(GraphError::NodeNotFound(id))?
            .set_position(position);
        Ok(())
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Look up any property in the graph.
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        let owner = self.owners.get(&id)?;
        self.nodes.get(owner)?.property(id)
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        let owner = self.owners.get(&id)?;
        self.nodes.get_mut(owner)?.property_mut(id)
    }

    /// The node owning a property.
    pub fn node_of(&self, id: PropertyId) -> Option<NodeId> {
        self.owners.get(&id).copied()
    }

    /// Current value of a property.
    pub fn value(&self, id: PropertyId) -> Option<&Value> {
        self.property(id)?.value()
    }

    /// Set a property's value from outside and propagate it.
    ///
    /// Inputs driven by a connection reject direct writes. The value is
    /// checked against the property's type-set and constraints as configured
    /// in [`GraphOptions`]; `None` always passes.
    pub fn set_property_value(
        &mut self,
        id: PropertyId,
        value: Option<Value>,
    ) -> GraphResult<PropagationReport> {
        let prop = self.property(id).ok_or(GraphError::PropertyNotFound(id))?;
        if prop.is_input() && prop.is_connected() {
            return Err(GraphError::InputDriven(id));
        }
        if let Some(value) = &value {
            prop.check_value(
                value,
                self.options.enforce_value_types,
                self.options.enforce_constraints,
            )?;
        }

        debug!("Setting property {} to {:?}", id, value);
        let mut report = PropagationReport::new();
        self.write_value(id, value, &mut report);
        Ok(report)
    }

    /// Store the UI frame of a property.
    pub fn set_property_frame(&mut self, id: PropertyId, frame: Option<Frame>) -> GraphResult<()> {
        self.property_mut(id)
            .ok_or(GraphError::PropertyNotFound(id))?
            .set_frame(frame);
        Ok(())
    }

    /// Order two properties into `(output, input)`.
    pub fn resolve_roles(&self, a: PropertyId, b: PropertyId) -> ConnectionResult<(PropertyId, PropertyId)> {
        let pa = self.property(a).ok_or(ConnectionError::UnknownProperty(a))?;
        let pb = self.property(b).ok_or(ConnectionError::UnknownProperty(b))?;
        property::resolve_roles(pa, pb)
            .map(|(output, input)| (output.id(), input.id()))
            .ok_or(ConnectionError::RoleMismatch { output: a, input: b })
    }

    /// Whether two properties could be linked on type grounds, in either
    /// argument order.
    pub fn is_compatible(&self, a: PropertyId, b: PropertyId) -> bool {
        match (self.property(a), self.property(b)) {
            (Some(pa), Some(pb)) => property::is_compatible(pa, pb),
            _ => false,
        }
    }

    /// True if a live connection touches this property on either side.
    pub fn is_property_connected(&self, id: PropertyId) -> bool {
        self.inbound.contains_key(&id) || self.channel.has_subscribers(id)
    }

    // ========================================================================
    // Connection Management
    // ========================================================================

    /// Check whether `output → input` could be connected right now, treating
    /// an occupied input as a rejection.
    pub fn can_connect(&self, output: PropertyId, input: PropertyId) -> ConnectionResult<()> {
        self.check_connection(output, input, OccupiedInputPolicy::Reject)
            .map(|_| ())
    }

    /// Validate a proposed connection. Checks run in a fixed order so the
    /// first failing rule is the one reported.
    fn check_connection(
        &self,
        output: PropertyId,
        input: PropertyId,
        policy: OccupiedInputPolicy,
    ) -> ConnectionResult<(Endpoint, Endpoint, Option<ConnectionId>)> {
        let out = self
            .property(output)
            .ok_or(ConnectionError::UnknownProperty(output))?;
        let inp = self
            .property(input)
            .ok_or(ConnectionError::UnknownProperty(input))?;

        if !out.is_output() || !inp.is_input() {
            return Err(ConnectionError::RoleMismatch { output, input });
        }
        if !out.has_socket() {
            return Err(ConnectionError::NoSocket(output));
        }
        if !inp.has_socket() {
            return Err(ConnectionError::NoSocket(input));
        }
        if out.owner() == inp.owner() {
            return Err(ConnectionError::SameNode);
        }
        if !inp.property_type().accepts(out.property_type()) {
            return Err(ConnectionError::TypeMismatch {
                output: out.property_type(),
                input: inp.property_type(),
            });
        }

        let existing = self.inbound.get(&input).copied();
        if existing.is_some() && policy == OccupiedInputPolicy::Reject {
            return Err(ConnectionError::InputOccupied(input));
        }

        if self.topology().would_create_cycle(out.owner(), inp.owner()) {
            return Err(ConnectionError::FeedbackLoop {
                from: out.owner(),
                to: inp.owner(),
            });
        }

        Ok((
            Endpoint::new(out.owner(), output),
            Endpoint::new(inp.owner(), input),
            existing,
        ))
    }

    /// Connect an output to an input.
    ///
    /// On success the input is marked connected, subscribed to the output,
    /// and (per options) immediately receives the output's current value.
    /// On rejection nothing changes. An occupied input is handled per
    /// [`GraphOptions::occupied_input`].
    pub fn connect(&mut self, output: PropertyId, input: PropertyId) -> ConnectionResult<Connection> {
        let (connection, report) = self.connect_with_report(output, input)?;
        if !report.is_clean() {
            warn!(
                "Connecting {} -> {} left {} evaluator failure(s)",
                output,
                input,
                report.errors.len()
            );
        }
        Ok(connection)
    }

    /// Like [`connect`](Self::connect), also returning what the push on
    /// connect (and the clear of a replaced connection) set off.
    pub fn connect_with_report(
        &mut self,
        output: PropertyId,
        input: PropertyId,
    ) -> ConnectionResult<(Connection, PropagationReport)> {
        let (from, to, existing) = self.check_connection(output, input, self.options.occupied_input)?;

        let mut report = PropagationReport::new();
        if let Some(old) = existing {
            debug!("Replacing connection {} into input {}", old, input);
            if let Some((_, cleared)) = self.disconnect_with_report(old) {
                report.merge(cleared);
            }
        }

        let connection = Connection::new(from, to);
        self.connections.insert(connection.id, connection);
        self.inbound.insert(input, connection.id);
        self.channel.subscribe(output, connection.id, input);
        if let Some(prop) = self.property_mut(input) {
            prop.set_connected(true);
        }

        debug!(
            "Connected {}:{} -> {}:{} ({})",
            from.node_id, output, to.node_id, input, connection.id
        );
        self.emit(PropagationEvent::Connected { connection });

        if self.options.push_on_connect {
            let value = self.value(output).cloned();
            self.write_value(input, value, &mut report);
        }

        Ok((connection, report))
    }

    /// Connect `source` to the first candidate that accepts it.
    ///
    /// Roles are resolved per candidate, so `source` may be an input or an
    /// output. Returns `Ok(None)` for an empty candidate list and the last
    /// rejection if every candidate refused.
    pub fn connect_first(
        &mut self,
        source: PropertyId,
        candidates: impl IntoIterator<Item = PropertyId>,
    ) -> ConnectionResult<Option<Connection>> {
        let mut last_error = None;
        for candidate in candidates {
            let attempt = self
                .resolve_roles(source, candidate)
                .and_then(|(output, input)| self.connect(output, input));
            match attempt {
                Ok(connection) => return Ok(Some(connection)),
                Err(error) => last_error = Some(error),
            }
        }
        last_error.map_or(Ok(None), Err)
    }

    /// Remove a connection by ID.
    ///
    /// Returns `None` (and does nothing) if it does not exist, so repeated
    /// calls are harmless.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Connection> {
        let (connection, report) = self.disconnect_with_report(id)?;
        if !report.is_clean() {
            warn!(
                "Disconnecting {} left {} evaluator failure(s)",
                id,
                report.errors.len()
            );
        }
        Some(connection)
    }

    /// Like [`disconnect`](Self::disconnect), also returning what clearing
    /// the input set off.
    pub fn disconnect_with_report(&mut self, id: ConnectionId) -> Option<(Connection, PropagationReport)> {
        let connection = self.unlink(id)?;
        let mut report = PropagationReport::new();
        if self.options.clear_on_disconnect {
            self.write_value(connection.input_property(), None, &mut report);
        }
        Some((connection, report))
    }

    /// Remove the connection feeding an input, if any.
    pub fn disconnect_input(&mut self, input: PropertyId) -> Option<Connection> {
        let id = *self.inbound.get(&input)?;
        self.disconnect(id)
    }

    /// Pick a link up by its input end.
    ///
    /// Disconnects whatever feeds `input` and returns the output it came
    /// from, so the caller can continue dragging from there.
    pub fn detach_input(&mut self, input: PropertyId) -> GraphResult<Option<PropertyId>> {
        if self.property(input).is_none() {
            return Err(GraphError::PropertyNotFound(input));
        }
        Ok(self
            .disconnect_input(input)
            .map(|connection| connection.output_property()))
    }

    /// Tear down a connection's bookkeeping without touching values.
    fn unlink(&mut self, id: ConnectionId) -> Option<Connection> {
        let Some(connection) = self.connections.shift_remove(&id) else {
            debug!("Connection {} already gone", id);
            return None;
        };

        self.channel.unsubscribe(connection.output_property(), id);
        self.inbound.remove(&connection.input_property());
        if let Some(prop) = self.property_mut(connection.input_property()) {
            prop.set_connected(false);
        }

        debug!(
            "Disconnected {} -> {} ({})",
            connection.output_property(),
            connection.input_property(),
            id
        );
        self.emit(PropagationEvent::Disconnected { connection });
        Some(connection)
    }

    /// Get a connection by ID.
    pub fn connection(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Get all connections, in creation order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Connections fed by an output property.
    pub fn connections_from(&self, output: PropertyId) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.output_property() == output)
    }

    /// The connection feeding an input property.
    pub fn connection_into(&self, input: PropertyId) -> Option<&Connection> {
        self.inbound
            .get(&input)
            .and_then(|id| self.connections.get(id))
    }

    /// Connections touching a node on either side.
    pub fn connections_for_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connection> {
        self.connections
            .values()
            .filter(move |c| c.involves_node(node_id))
    }

    /// Get the number of connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    // ========================================================================
    // Graph Analysis
    // ========================================================================

    /// Topology queries over the current connections.
    pub fn topology(&self) -> TopologyAnalyzer<'_> {
        TopologyAnalyzer::new(self)
    }

    /// Check if the graph is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Remove all connections and nodes without propagating anything.
    pub fn clear(&mut self) {
        let connections: Vec<ConnectionId> = self.connections.keys().copied().collect();
        for id in connections {
            self.unlink(id);
        }
        let removed: Vec<NodeId> = self.nodes.drain(..).map(|(id, _)| id).collect();
        self.owners.clear();
        for node_id in removed {
            self.emit(PropagationEvent::NodeRemoved { node_id });
        }
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}
