//! Graph module for managing node graphs.
//!
//! A node graph is a directed acyclic graph (DAG) where nodes own typed
//! properties and connections carry values from an output property to an
//! input property on another node.

pub mod structure;
pub mod connection;
pub mod options;
pub mod topology;

// Re-export commonly used types
pub use structure::Graph;
pub use connection::{Connection, Endpoint};
pub use options::{GraphOptions, OccupiedInputPolicy};
pub use topology::{DependencyGraph, TopologyAnalyzer};
