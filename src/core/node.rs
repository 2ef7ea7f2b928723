//! Nodes and the evaluation hook.
//!
//! A node is a named, fixed-shape collection of input and output
//! properties. What a node computes is not the engine's concern: a host
//! attaches an [`Evaluator`] and the engine decides *when* it runs
//! (synchronously, right after one of the node's inputs changed).

use crate::core::context::EvaluationContext;
use crate::core::error::{EvaluationResult, NodeId, PropertyId};
use crate::core::property::{Property, PropertyDescriptor, PropertyDirection};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Position of a node on the board. UI-owned; the engine only stores it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Position {
    /// Horizontal coordinate
    pub x: f64,
    /// Vertical coordinate
    pub y: f64,
}

impl Position {
    /// Create a position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Computes a node's outputs from its inputs.
///
/// # Example
///
/// ```
/// use nodeflow::prelude::*;
///
/// let add = Node::builder("Add")
///     .input(PropertyDescriptor::number("a"))
///     .input(PropertyDescriptor::number("b"))
///     .output(PropertyDescriptor::number("sum"))
///     .evaluator(|ctx: &mut EvaluationContext| {
///         let sum = ctx.number_or("a", 0.0)? + ctx.number_or("b", 0.0)?;
///         ctx.set_output("sum", sum)
///     })
///     .build();
/// assert!(add.has_evaluator());
/// ```
pub trait Evaluator: Send + Sync {
    /// Read inputs from the context and write outputs back into it.
    ///
    /// Outputs that are not written keep their previous value. Returning an
    /// error discards every write made during this call.
    fn evaluate(&self, ctx: &mut EvaluationContext) -> EvaluationResult<()>;
}

impl<F> Evaluator for F
where
    F: Fn(&mut EvaluationContext) -> EvaluationResult<()> + Send + Sync,
{
    fn evaluate(&self, ctx: &mut EvaluationContext) -> EvaluationResult<()> {
        self(ctx)
    }
}

/// A node instance.
#[derive(Clone)]
pub struct Node {
    id: NodeId,
    name: String,
    position: Position,
    inputs: Vec<Property>,
    outputs: Vec<Property>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("evaluator", &self.evaluator.as_ref().map(|_| "<evaluator>"))
            .finish()
    }
}

impl Node {
    /// Create a node with a fixed input/output shape.
    ///
    /// Every property gets this node as its owner, in declaration order.
    pub fn new(
        name: impl Into<String>,
        inputs: impl IntoIterator<Item = PropertyDescriptor>,
        outputs: impl IntoIterator<Item = PropertyDescriptor>,
    ) -> Self {
        let id = NodeId::new();
        Self {
            id,
            name: name.into(),
            position: Position::default(),
            inputs: inputs
                .into_iter()
                .map(|d| Property::from_descriptor(d, PropertyDirection::Input, id))
                .collect(),
            outputs: outputs
                .into_iter()
                .map(|d| Property::from_descriptor(d, PropertyDirection::Output, id))
                .collect(),
            evaluator: None,
        }
    }

    /// Start building a node.
    pub fn builder(name: impl Into<String>) -> NodeBuilder {
        NodeBuilder::new(name)
    }

    /// Attach the evaluation hook.
    pub fn with_evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Set the position.
    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Unique ID of this node.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Display name, usually the node's kind.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where the UI placed the node.
    pub fn position(&self) -> Position {
        self.position
    }

    /// Input properties in declaration order.
    pub fn inputs(&self) -> &[Property] {
        &self.inputs
    }

    /// Output properties in declaration order.
    pub fn outputs(&self) -> &[Property] {
        &self.outputs
    }

    /// First input with the given name.
    pub fn input(&self, name: &str) -> Option<&Property> {
        self.inputs.iter().find(|p| p.name() == name)
    }

    /// First output with the given name.
    pub fn output(&self, name: &str) -> Option<&Property> {
        self.outputs.iter().find(|p| p.name() == name)
    }

    /// All properties, inputs first.
    pub fn properties(&self) -> impl Iterator<Item = &Property> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Find one of this node's properties by ID.
    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties().find(|p| p.id() == id)
    }

    /// Whether the node computes its outputs.
    pub fn has_evaluator(&self) -> bool {
        self.evaluator.is_some()
    }

    pub(crate) fn evaluator(&self) -> Option<Arc<dyn Evaluator>> {
        self.evaluator.clone()
    }

    pub(crate) fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.inputs.iter_mut().chain(self.outputs.iter_mut())
    }

    pub(crate) fn property_mut(&mut self, id: PropertyId) -> Option<&mut Property> {
        self.properties_mut().find(|p| p.id() == id)
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = position;
    }
}

/// Builder for [`Node`].
pub struct NodeBuilder {
    name: String,
    position: Position,
    inputs: Vec<PropertyDescriptor>,
    outputs: Vec<PropertyDescriptor>,
    evaluator: Option<Arc<dyn Evaluator>>,
}

impl NodeBuilder {
    /// Create a new builder.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: Position::default(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            evaluator: None,
        }
    }

    /// Add an input property.
    pub fn input(mut self, descriptor: PropertyDescriptor) -> Self {
        self.inputs.push(descriptor);
        self
    }

    /// Add an output property.
    pub fn output(mut self, descriptor: PropertyDescriptor) -> Self {
        self.outputs.push(descriptor);
        self
    }

    /// Set the evaluation hook.
    pub fn evaluator(mut self, evaluator: impl Evaluator + 'static) -> Self {
        self.evaluator = Some(Arc::new(evaluator));
        self
    }

    /// Set the position.
    pub fn position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    /// Build the node.
    pub fn build(self) -> Node {
        let mut node = Node::new(self.name, self.inputs, self.outputs);
        node.position = self.position;
        node.evaluator = self.evaluator;
        node
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PropertyType, Value};

    #[test]
    fn test_construction_assigns_owner_and_order() {
        let node = Node::new(
            "Math",
            [PropertyDescriptor::number("Number"), PropertyDescriptor::number("Number")],
            [PropertyDescriptor::number("Result")],
        );

        assert_eq!(node.inputs().len(), 2);
        assert_eq!(node.outputs().len(), 1);
        assert!(node.properties().all(|p| p.owner() == node.id()));
        assert!(node.inputs().iter().all(Property::is_input));
        assert!(node.outputs().iter().all(Property::is_output));
        // Duplicate names are allowed; ids keep them apart.
        assert_ne!(node.inputs()[0].id(), node.inputs()[1].id());
        assert_eq!(node.input("Number").unwrap().id(), node.inputs()[0].id());
    }

    #[test]
    fn test_builder() {
        let node = Node::builder("Color")
            .input(PropertyDescriptor::new("tint", PropertyType::COLOR))
            .output(PropertyDescriptor::new("color", PropertyType::COLOR))
            .position(10.0, 20.0)
            .evaluator(|_ctx: &mut EvaluationContext| -> EvaluationResult<()> { Ok(()) })
            .build();

        assert_eq!(node.name(), "Color");
        assert_eq!(node.position(), Position::new(10.0, 20.0));
        assert!(node.has_evaluator());
        let out = node.output("color").unwrap();
        assert_eq!(node.property(out.id()).unwrap().name(), "color");
        assert!(node.property(crate::core::error::PropertyId::new()).is_none());
    }

    #[test]
    fn test_initial_values_come_from_descriptors() {
        let node = Node::new(
            "Constant",
            Vec::new(),
            [PropertyDescriptor::number("value").with_value(4.0)],
        );
        assert_eq!(node.outputs()[0].value(), Some(&Value::Number(4.0)));
    }
}
