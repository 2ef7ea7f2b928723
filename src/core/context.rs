//! Evaluation context.
//!
//! The context is a snapshot of one node's inputs and outputs handed to its
//! [`Evaluator`](crate::core::node::Evaluator). Writes are buffered and only
//! applied to the graph (and propagated) once the evaluator returns `Ok`.

use crate::core::error::{EvaluationError, EvaluationResult, NodeId};
use crate::core::node::Node;
use crate::core::types::{Color, PropertyType, Value};

/// Context provided while a node evaluates.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    /// ID of the node being evaluated.
    pub node_id: NodeId,
    /// Input names and values, in declaration order.
    inputs: Vec<(String, Option<Value>)>,
    /// Output names and their values before this evaluation.
    outputs: Vec<(String, Option<Value>)>,
    /// Pending writes, indexed like `outputs`.
    writes: Vec<Option<Option<Value>>>,
}

impl EvaluationContext {
    /// Snapshot a node.
    pub fn for_node(node: &Node) -> Self {
        let snapshot = |props: &[crate::core::property::Property]| {
            props
                .iter()
                .map(|p| (p.name().to_string(), p.value().cloned()))
                .collect::<Vec<_>>()
        };
        let outputs = snapshot(node.outputs());
        Self {
            node_id: node.id(),
            inputs: snapshot(node.inputs()),
            writes: vec![None; outputs.len()],
            outputs,
        }
    }

    // ========================================================================
    // Input Getters
    // ========================================================================

    /// Value of the first input with this name, if set.
    pub fn input(&self, name: &str) -> Option<&Value> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Value of the input at a declaration index, if set.
    pub fn input_at(&self, index: usize) -> Option<&Value> {
        self.inputs.get(index).and_then(|(_, v)| v.as_ref())
    }

    /// Number of inputs on the node.
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Get an input, failing when it is unset.
    pub fn require(&self, name: &str) -> EvaluationResult<&Value> {
        self.input(name).ok_or_else(|| EvaluationError::MissingInput {
            node_id: self.node_id,
            port: name.to_string(),
        })
    }

    /// Get a numeric input, failing when it is unset or not a number.
    pub fn require_number(&self, name: &str) -> EvaluationResult<f64> {
        self.require(name)?
            .as_number()
            .ok_or_else(|| self.type_mismatch(name, PropertyType::NUMBER))
    }

    /// Get a numeric input, substituting `default` when it is unset.
    pub fn number_or(&self, name: &str, default: f64) -> EvaluationResult<f64> {
        match self.input(name) {
            None => Ok(default),
            Some(value) => value
                .as_number()
                .ok_or_else(|| self.type_mismatch(name, PropertyType::NUMBER)),
        }
    }

    /// Get a color input, failing when it is unset or not a color.
    pub fn require_color(&self, name: &str) -> EvaluationResult<Color> {
        self.require(name)?
            .as_color()
            .ok_or_else(|| self.type_mismatch(name, PropertyType::COLOR))
    }

    fn type_mismatch(&self, name: &str, expected: PropertyType) -> EvaluationError {
        EvaluationError::TypeMismatch {
            node_id: self.node_id,
            port: name.to_string(),
            expected,
        }
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    /// Value an output had before this evaluation started.
    pub fn previous_output(&self, name: &str) -> Option<&Value> {
        self.outputs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Write the first output with this name.
    pub fn set_output(&mut self, name: &str, value: impl Into<Value>) -> EvaluationResult<()> {
        let index = self.output_index(name)?;
        self.writes[index] = Some(Some(value.into()));
        Ok(())
    }

    /// Write the output at a declaration index.
    pub fn set_output_at(&mut self, index: usize, value: impl Into<Value>) -> EvaluationResult<()> {
        let slot = self
            .writes
            .get_mut(index)
            .ok_or_else(|| EvaluationError::UnknownOutput {
                node_id: self.node_id,
                port: format!("#{}", index),
            })?;
        *slot = Some(Some(value.into()));
        Ok(())
    }

    /// Reset an output to unset.
    pub fn clear_output(&mut self, name: &str) -> EvaluationResult<()> {
        let index = self.output_index(name)?;
        self.writes[index] = Some(None);
        Ok(())
    }

    fn output_index(&self, name: &str) -> EvaluationResult<usize> {
        self.outputs
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| EvaluationError::UnknownOutput {
                node_id: self.node_id,
                port: name.to_string(),
            })
    }

    /// Consume the context, yielding `(output index, new value)` writes.
    pub(crate) fn into_writes(self) -> Vec<(usize, Option<Value>)> {
        self.writes
            .into_iter()
            .enumerate()
            .filter_map(|(i, w)| w.map(|v| (i, v)))
            .collect()
    }
}
