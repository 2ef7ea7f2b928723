//! Core types and traits for the NodeFlow dataflow engine.
//!
//! This module contains the leaf data model the graph is built from:
//! - Property types and values
//! - Properties and their descriptors
//! - Nodes and the evaluation hook
//! - Identifiers and error types

pub mod types;
pub mod property;
pub mod error;
pub mod context;
pub mod node;

// Re-export commonly used types
pub use types::{AssetRef, Color, PropertyType, Value};
pub use property::{Constraint, Frame, Property, PropertyDescriptor, PropertyDirection};
pub use error::{
    ConnectionError, EvaluationError, FlowError, GraphError, ValidationError, ValidationReport,
    ValidationWarning,
};
pub use context::EvaluationContext;
pub use node::{Evaluator, Node, NodeBuilder, Position};
