//! # NodeFlow - Dataflow Node Graphs
//!
//! NodeFlow is the engine behind a visual node editor. Nodes own typed input
//! and output properties; connecting an output to an input makes every value
//! the output takes flow into the input, and from there through whatever the
//! receiving node computes.
//!
//! ## Features
//!
//! - **Typed Connections**: Each property carries a set of kinds; an input
//!   accepts an output only if its set contains the output's
//! - **Single Writer**: An input has at most one incoming connection
//! - **Acyclic by Construction**: Connections that would close a loop are
//!   rejected before anything changes
//! - **Synchronous Propagation**: Values and re-evaluations cascade
//!   downstream inside the call that caused them
//! - **Observable**: Every mutation is reported to subscribed callbacks
//!
//! ## Quick Start
//!
//! ```rust
//! use nodeflow::prelude::*;
//!
//! let mut graph = Graph::new();
//!
//! let two = Node::new("Number", Vec::new(), [PropertyDescriptor::number("value").with_value(2.0)]);
//! let three = Node::new("Number", Vec::new(), [PropertyDescriptor::number("value").with_value(3.0)]);
//! let add = Node::builder("Add")
//!     .input(PropertyDescriptor::number("a"))
//!     .input(PropertyDescriptor::number("b"))
//!     .output(PropertyDescriptor::number("sum"))
//!     .evaluator(|ctx: &mut EvaluationContext| {
//!         let sum = ctx.number_or("a", 0.0)? + ctx.number_or("b", 0.0)?;
//!         ctx.set_output("sum", sum)
//!     })
//!     .build();
//! let display = Node::new("Display", [PropertyDescriptor::number("value")], Vec::new());
//!
//! let (two_out, three_out) = (two.outputs()[0].id(), three.outputs()[0].id());
//! let (a, b, sum) = (add.inputs()[0].id(), add.inputs()[1].id(), add.outputs()[0].id());
//! let shown = display.inputs()[0].id();
//!
//! for node in [two, three, add, display] {
//!     graph.add_node(node).unwrap();
//! }
//!
//! graph.connect(two_out, a).unwrap();
//! graph.connect(three_out, b).unwrap();
//! graph.connect(sum, shown).unwrap();
//!
//! assert_eq!(graph.value(shown), Some(&Value::Number(5.0)));
//! ```
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`core`]: Property types, values, properties, nodes and errors
//! - [`graph`]: Graph structure, connection rules and topology analysis
//! - [`propagation`]: Value delivery, node evaluation and events
//! - [`validation`]: Invariant audit pipeline

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod graph;
pub mod propagation;
pub mod validation;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust
/// use nodeflow::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use crate::core::types::{AssetRef, Color, PropertyType, Value};

    // Properties and nodes
    pub use crate::core::property::{Constraint, Frame, Property, PropertyDescriptor, PropertyDirection};
    pub use crate::core::node::{Evaluator, Node, NodeBuilder, Position};

    // Contexts
    pub use crate::core::context::EvaluationContext;

    // Errors
    pub use crate::core::error::{
        ConnectionError, ConnectionId, EvaluationError, FlowError, GraphError, NodeId, PropertyId,
        ValidationError, ValidationReport, ValidationWarning,
    };

    // Graph
    pub use crate::graph::connection::{Connection, Endpoint};
    pub use crate::graph::options::{GraphOptions, OccupiedInputPolicy};
    pub use crate::graph::structure::Graph;
    pub use crate::graph::topology::TopologyAnalyzer;

    // Propagation
    pub use crate::propagation::events::{PropagationEvent, PropagationReport};

    // Validation
    pub use crate::validation::pipeline::ValidationPipeline;
    pub use crate::validation::stages::{
        StructuralValidation, TypeValidation, ValidationStage, ValueValidation,
    };
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
