//! Individual validation stages.
//!
//! Each stage checks for a specific category of errors.

use crate::core::error::{ValidationError, ValidationWarning};
use crate::graph::structure::Graph;
use std::collections::HashMap;

/// Trait for validation stages.
pub trait ValidationStage: Send + Sync {
    /// Name of this validation stage.
    fn name(&self) -> &str;

    /// Validate the graph.
    ///
    /// Returns Ok with warnings, or Err with errors.
    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>>;
}

/// Structural validation - checks graph structure.
///
/// Verifies:
/// - Graph is a DAG (no cycles)
/// - All connections reference properties in the graph
/// - Every connection runs output → input across two nodes
/// - No input has more than one writer
/// - Connected flags and subscriptions mirror the connection set
pub struct StructuralValidation;

impl ValidationStage for StructuralValidation {
    fn name(&self) -> &str {
        "Structural Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // Empty graph warning (not error - might be intentional)
        if graph.is_empty() {
            warnings.push(ValidationWarning {
                message: "Graph is empty".to_string(),
                node_id: None,
                suggestion: Some("Add some nodes to build a graph".to_string()),
            });
            return Ok(warnings);
        }

        let analyzer = graph.topology();
        if analyzer.has_cycle() {
            return Err(vec![ValidationError::CycleDetected]);
        }

        let mut writers: HashMap<_, usize> = HashMap::new();
        for conn in graph.connections() {
            let (Some(out), Some(inp)) = (
                graph.property(conn.output_property()),
                graph.property(conn.input_property()),
            ) else {
                errors.push(ValidationError::DanglingConnection {
                    connection: conn.id,
                });
                continue;
            };

            if !out.is_output() || !inp.is_input() {
                errors.push(ValidationError::RoleViolation {
                    connection: conn.id,
                });
            }
            if out.owner() == inp.owner() {
                errors.push(ValidationError::SelfLoop {
                    connection: conn.id,
                });
            }
            *writers.entry(inp.id()).or_default() += 1;

            let subscribed = graph
                .channel
                .subscribers(out.id())
                .iter()
                .any(|s| s.connection == conn.id && s.input == inp.id());
            if !subscribed {
                errors.push(ValidationError::MissingSubscription(conn.id));
            }
        }

        for (input, count) in &writers {
            if *count > 1 {
                errors.push(ValidationError::MultipleWriters {
                    input: *input,
                    count: *count,
                });
            }
        }

        for (_, subscription) in graph.channel.iter() {
            if graph.connection(subscription.connection).is_none() {
                errors.push(ValidationError::StaleSubscription(subscription.connection));
            }
        }

        for node in graph.nodes() {
            for input in node.inputs() {
                if input.is_connected() != writers.contains_key(&input.id()) {
                    errors.push(ValidationError::ConnectedFlagMismatch(input.id()));
                }
            }
            for output in node.outputs() {
                if output.is_connected() {
                    errors.push(ValidationError::ConnectedFlagMismatch(output.id()));
                }
            }
        }

        // Check for disconnected subgraphs (warning)
        let subgraphs = analyzer.find_subgraphs();
        if subgraphs.len() > 1 {
            warnings.push(ValidationWarning {
                message: format!("Graph contains {} disconnected subgraphs", subgraphs.len()),
                node_id: None,
                suggestion: None,
            });
        }

        if errors.is_empty() {
            Ok(warnings)
        } else {
            Err(errors)
        }
    }
}

/// Type validation - checks type compatibility.
///
/// Verifies:
/// - Every connection's input type-set contains its output type-set
/// - Every stored value fits its property's type-set (when the graph
///   enforces value types)
pub struct TypeValidation;

impl ValidationStage for TypeValidation {
    fn name(&self) -> &str {
        "Type Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        let mut errors = Vec::new();

        for conn in graph.connections() {
            let (Some(out), Some(inp)) = (
                graph.property(conn.output_property()),
                graph.property(conn.input_property()),
            ) else {
                continue;
            };
            if !inp.property_type().accepts(out.property_type()) {
                errors.push(ValidationError::IncompatibleTypes {
                    connection: conn.id,
                    output: out.property_type(),
                    input: inp.property_type(),
                });
            }
        }

        if graph.options().enforce_value_types {
            for node in graph.nodes() {
                for prop in node.properties() {
                    let Some(value) = prop.value() else {
                        continue;
                    };
                    if !prop.property_type().admits(value) {
                        errors.push(ValidationError::ValueTypeMismatch {
                            node_id: node.id(),
                            property: prop.name().to_string(),
                            expected: prop.property_type(),
                            got: value.kind(),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(Vec::new())
        } else {
            Err(errors)
        }
    }
}

/// Value validation - reports questionable values.
///
/// Never fails. Warns about:
/// - Unconnected inputs holding values that break their constraints
/// - Unset inputs on nodes that evaluate
pub struct ValueValidation;

impl ValidationStage for ValueValidation {
    fn name(&self) -> &str {
        "Value Validation"
    }

    fn validate(&self, graph: &Graph) -> Result<Vec<ValidationWarning>, Vec<ValidationError>> {
        let mut warnings = Vec::new();

        for node in graph.nodes() {
            for input in node.inputs().iter().filter(|p| !p.is_connected()) {
                match input.value() {
                    Some(value) => {
                        for constraint in input.constraints() {
                            if let Err(error) = constraint.validate(value) {
                                warnings.push(ValidationWarning {
                                    message: format!(
                                        "Input '{}' on '{}': {}",
                                        input.name(),
                                        node.name(),
                                        error
                                    ),
                                    node_id: Some(node.id()),
                                    suggestion: None,
                                });
                            }
                        }
                    }
                    None if node.has_evaluator() => {
                        warnings.push(ValidationWarning {
                            message: format!(
                                "Input '{}' on '{}' has no value",
                                input.name(),
                                node.name()
                            ),
                            node_id: Some(node.id()),
                            suggestion: Some("Connect it or set a value".to_string()),
                        });
                    }
                    None => {}
                }
            }
        }

        Ok(warnings)
    }
}
