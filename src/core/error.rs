//! Identifiers and error types for NodeFlow.
//!
//! Uses thiserror for structured errors with context. Errors are designed to:
//! - Be cheap to clone so the UI can keep them around for tooltips
//! - Identify exactly which node, property or connection is involved
//! - Leave the graph untouched whenever they are returned

use crate::core::types::PropertyType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub Uuid);

impl NodeId {
    /// Create a new random node ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a node ID from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a property (input or output slot) on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PropertyId(pub Uuid);

impl PropertyId {
    /// Create a new random property ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Unique identifier for a connection in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Create a new random connection ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

/// Top-level error type for NodeFlow.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum FlowError {
    /// A graph operation failed.
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// A connection was rejected.
    #[error("Connection rejected: {0}")]
    Connection(#[from] ConnectionError),

    /// A node's evaluator failed.
    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    /// An audit found a broken invariant.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Options or values could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reasons a proposed connection is rejected.
///
/// None of these are fatal: the UI surfaces them as a rejected gesture and
/// the graph is left exactly as it was.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionError {
    /// Both properties belong to the same node.
    #[error("Attempted connection on the same node")]
    SameNode,

    /// The input's type-set does not cover the output's.
    #[error("Property types do not match: {output} cannot feed {input}")]
    TypeMismatch {
        /// Type of the output property
        output: PropertyType,
        /// Type of the input property
        input: PropertyType,
    },

    /// The input's node already feeds the output's node.
    #[error("Connection from node {from} to node {to} causes a feedback loop")]
    FeedbackLoop {
        /// Node owning the output
        from: NodeId,
        /// Node owning the input
        to: NodeId,
    },

    /// The input already has a writer and replacing is not allowed.
    #[error("Input {0} is already occupied")]
    InputOccupied(PropertyId),

    /// The properties are not an output and an input, in that order.
    #[error("Property {output} is not an output or {input} is not an input")]
    RoleMismatch {
        /// Property offered as the output
        output: PropertyId,
        /// Property offered as the input
        input: PropertyId,
    },

    /// The property is edit-only.
    #[error("Property {0} has no socket")]
    NoSocket(PropertyId),

    /// The property is not part of this graph.
    #[error("Property {0} does not exist in this graph")]
    UnknownProperty(PropertyId),
}

/// Errors related to graph structure and operations.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GraphError {
    /// No node with this id.
    #[error("Node {0} not found")]
    NodeNotFound(NodeId),

    /// The node, or one of its properties, is already in the graph.
    #[error("Node {0} is already part of the graph")]
    DuplicateNode(NodeId),

    /// No property with this id.
    #[error("Property {0} not found")]
    PropertyNotFound(PropertyId),

    /// No connection with this id.
    #[error("Connection {0} not found")]
    ConnectionNotFound(ConnectionId),

    /// A value's kind is outside the property's type-set.
    #[error("Property '{name}' accepts {expected}, got a {got} value")]
    ValueTypeMismatch {
        /// Property name
        name: String,
        /// Type-set of the property
        expected: PropertyType,
        /// Kind of the rejected value
        got: PropertyType,
    },

    /// A value broke one of the property's constraints.
    #[error("Constraint violation on property '{name}': {error}")]
    ConstraintViolation {
        /// Property name
        name: String,
        /// What the constraint reported
        error: String,
    },

    /// The input is fed by a connection.
    #[error("Input {0} is driven by a connection and cannot be set directly")]
    InputDriven(PropertyId),

    /// The node graph contains a cycle.
    #[error("Cycle detected in graph involving nodes: {nodes:?}")]
    CycleDetected {
        /// Nodes on the cycle, as far as known
        nodes: Vec<NodeId>,
    },

    /// A connection was rejected.
    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Errors reported by a node's evaluator.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvaluationError {
    /// A required input has no value.
    #[error("Missing input '{port}' on node {node_id}")]
    MissingInput {
        /// Evaluating node
        node_id: NodeId,
        /// Input name
        port: String,
    },

    /// A property holds or received a value of the wrong kind.
    #[error("Property '{port}' on node {node_id} expected {expected}")]
    TypeMismatch {
        /// Evaluating node
        node_id: NodeId,
        /// Property name
        port: String,
        /// Type the property accepts
        expected: PropertyType,
    },

    /// The evaluator wrote to an output the node does not have.
    #[error("Node {node_id} has no output named '{port}'")]
    UnknownOutput {
        /// Evaluating node
        node_id: NodeId,
        /// Output name
        port: String,
    },

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl EvaluationError {
    /// Get the node ID that caused this error, if applicable.
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            EvaluationError::MissingInput { node_id, .. }
            | EvaluationError::TypeMismatch { node_id, .. }
            | EvaluationError::UnknownOutput { node_id, .. } => Some(*node_id),
            EvaluationError::Other(_) => None,
        }
    }
}

/// Invariant violations found when auditing a graph.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ValidationError {
    /// A connection endpoint is missing from the graph.
    #[error("Connection {connection} references a property that is not in the graph")]
    DanglingConnection {
        /// Offending connection
        connection: ConnectionId,
    },

    /// A connection does not run output → input.
    #[error("Connection {connection} does not run from an output to an input")]
    RoleViolation {
        /// Offending connection
        connection: ConnectionId,
    },

    /// A connection starts and ends on the same node.
    #[error("Connection {connection} links a node to itself")]
    SelfLoop {
        /// Offending connection
        connection: ConnectionId,
    },

    /// An input has more than one incoming connection.
    #[error("Input {input} has {count} writers")]
    MultipleWriters {
        /// The input property
        input: PropertyId,
        /// Number of connections into it
        count: usize,
    },

    /// A connected flag disagrees with the connection set.
    #[error("Connected flag of property {0} disagrees with the connection set")]
    ConnectedFlagMismatch(PropertyId),

    /// A connection has no propagation subscription.
    #[error("Connection {0} has no matching subscription")]
    MissingSubscription(ConnectionId),

    /// A subscription outlived its connection.
    #[error("Subscription for connection {0} has no matching connection")]
    StaleSubscription(ConnectionId),

    /// A connection's input does not cover its output's type.
    #[error("Connection {connection} carries {output} into an input accepting {input}")]
    IncompatibleTypes {
        /// Offending connection
        connection: ConnectionId,
        /// Type of the output
        output: PropertyType,
        /// Type of the input
        input: PropertyType,
    },

    /// A stored value falls outside its property's type-set.
    #[error("Property '{property}' on node {node_id} accepts {expected}, holds a {got} value")]
    ValueTypeMismatch {
        /// Owning node
        node_id: NodeId,
        /// Property name
        property: String,
        /// Type-set of the property
        expected: PropertyType,
        /// Kind of the stored value
        got: PropertyType,
    },

    /// The node graph contains a cycle.
    #[error("Graph contains a cycle")]
    CycleDetected,

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl ValidationError {
    /// Check if this is a fatal error that should stop validation.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ValidationError::CycleDetected | ValidationError::DanglingConnection { .. }
        )
    }

    /// Get a suggestion for fixing this error.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            ValidationError::MultipleWriters { .. } => {
                Some("Disconnect all but one connection into the input".to_string())
            }
            ValidationError::IncompatibleTypes { output, input, .. } => Some(format!(
                "Connect {} to an input accepting {}, or widen the input beyond {}",
                output, output, input
            )),
            ValidationError::CycleDetected => {
                Some("Remove a connection to break the cycle".to_string())
            }
            _ => None,
        }
    }
}

/// Outcome of a validation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Whether validation passed without errors.
    pub success: bool,
    /// List of errors found.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<ValidationWarning>,
    /// Time taken for validation in milliseconds.
    pub duration_ms: u64,
}

/// Non-fatal validation warning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationWarning {
    /// Warning message.
    pub message: String,
    /// Node that triggered the warning, if applicable.
    pub node_id: Option<NodeId>,
    /// Suggestion for addressing the warning.
    pub suggestion: Option<String>,
}

impl ValidationReport {
    /// Create a new empty report (success).
    pub fn new() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    /// Add an error to the report.
    pub fn add_error(&mut self, error: ValidationError) {
        self.success = false;
        self.errors.push(error);
    }

    /// Add a warning to the report.
    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Get a human-readable summary.
    pub fn summary(&self) -> String {
        match (self.success, self.warnings.len()) {
            (true, 0) => "Graph is consistent".to_string(),
            (true, n) => format!("Graph is consistent with {} warning(s)", n),
            (false, _) => format!("Validation failed with {} error(s)", self.errors.len()),
        }
    }

    /// Get detailed error messages with suggestions.
    pub fn detailed_errors(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(|e| match e.suggestion() {
                Some(hint) => format!("{} (hint: {})", e, hint),
                None => e.to_string(),
            })
            .collect()
    }
}

/// Result type alias for NodeFlow operations.
pub type FlowResult<T> = Result<T, FlowError>;

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

/// Result type alias for connection validation.
pub type ConnectionResult<T> = Result<T, ConnectionError>;

/// Result type alias for node evaluation.
pub type EvaluationResult<T> = Result<T, EvaluationError>;
