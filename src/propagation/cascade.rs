//! The propagation cascade.
//!
//! Depth-first: an output's new value is delivered to each subscriber in
//! turn, and each delivery runs the receiving node (and everything it
//! writes) to completion before the next subscriber is visited. The graph
//! is acyclic, so every cascade terminates.

use crate::core::context::EvaluationContext;
use crate::core::error::{EvaluationError, EvaluationResult, GraphError, GraphResult, NodeId, PropertyId};
use crate::core::node::Node;
use crate::core::property::PropertyDirection;
use crate::core::types::Value;
use crate::graph::structure::Graph;
use crate::propagation::events::{PropagationEvent, PropagationReport};
use log::{trace, warn};

impl Graph {
    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Run one node's evaluator and propagate whatever it writes.
    ///
    /// A node without an evaluator is a no-op. Evaluator failures are
    /// reported, never returned as `Err`.
    pub fn evaluate_node(&mut self, node_id: NodeId) -> GraphResult<PropagationReport> {
        if !self.has_node(node_id) {
            return Err(GraphError::NodeNotFound(node_id));
        }
        let mut report = PropagationReport::new();
        self.run_evaluator(node_id, &mut report);
        Ok(report)
    }

    /// Evaluate every node once, upstream before downstream.
    ///
    /// Useful after building a graph with evaluation disabled, or to seed
    /// outputs of nodes that have no inputs.
    pub fn evaluate_all(&mut self) -> GraphResult<PropagationReport> {
        let order = self.topology().topological_sort()?;
        let mut report = PropagationReport::new();
        for node_id in order {
            self.run_evaluator(node_id, &mut report);
        }
        Ok(report)
    }

    // ========================================================================
    // Cascade
    // ========================================================================

    /// Store a value and push it onward.
    ///
    /// Unchanged values stop the cascade. Output values go to every
    /// subscriber; input values re-run the owning node.
    pub(crate) fn write_value(
        &mut self,
        property: PropertyId,
        value: Option<Value>,
        report: &mut PropagationReport,
    ) {
        let Some(prop) = self.property_mut(property) else {
            return;
        };
        if !prop.replace_value(value.clone()) {
            return;
        }
        let (owner, direction) = (prop.owner(), prop.direction());

        report.values_changed += 1;
        self.emit(PropagationEvent::ValueChanged {
            node_id: owner,
            property,
            value: value.clone(),
        });

        match direction {
            PropertyDirection::Output => {
                let subscribers = self.channel.subscribers(property).to_vec();
                for subscription in subscribers {
                    trace!(
                        "Delivering {} -> {} over {}",
                        property,
                        subscription.input,
                        subscription.connection
                    );
                    report.deliveries += 1;
                    self.write_value(subscription.input, value.clone(), report);
                }
            }
            PropertyDirection::Input => {
                if self.options.evaluate_on_input_change {
                    self.run_evaluator(owner, report);
                }
            }
        }
    }

    fn run_evaluator(&mut self, node_id: NodeId, report: &mut PropagationReport) {
        let Some(node) = self.node(node_id) else {
            return;
        };
        let Some(evaluator) = node.evaluator() else {
            return;
        };

        let mut ctx = EvaluationContext::for_node(node);
        let result = evaluator
            .evaluate(&mut ctx)
            .and_then(|()| collect_writes(node, ctx, self.options.enforce_value_types));

        match result {
            Ok(writes) => {
                trace!("Evaluated node {} ({} writes)", node_id, writes.len());
                report.nodes_evaluated += 1;
                self.emit(PropagationEvent::NodeEvaluated { node_id });
                for (property, value) in writes {
                    self.write_value(property, value, report);
                }
            }
            Err(error) => {
                warn!("Evaluation of node {} failed: {}", node_id, error);
                report.errors.push((node_id, error.clone()));
                self.emit(PropagationEvent::EvaluationFailed { node_id, error });
            }
        }
    }
}

/// Map buffered writes onto output property IDs, rejecting the whole batch
/// if any value does not fit its output.
fn collect_writes(
    node: &Node,
    ctx: EvaluationContext,
    check_types: bool,
) -> EvaluationResult<Vec<(PropertyId, Option<Value>)>> {
    ctx.into_writes()
        .into_iter()
        .filter_map(|(index, value)| node.outputs().get(index).map(|out| (out, value)))
        .map(|(out, value)| {
            if let Some(v) = &value {
                if check_types && !out.property_type().admits(v) {
                    return Err(EvaluationError::TypeMismatch {
                        node_id: node.id(),
                        port: out.name().to_string(),
                        expected: out.property_type(),
                    });
                }
            }
            Ok((out.id(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::core::context::EvaluationContext;
    use crate::core::error::{EvaluationError, EvaluationResult, NodeId, PropertyId};
    use crate::core::node::Node;
    use crate::core::property::PropertyDescriptor;
    use crate::core::types::{Color, PropertyType, Value};
    use crate::graph::{Graph, GraphOptions};
    use crate::propagation::events::PropagationEvent;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn constant(graph: &mut Graph, value: f64) -> (NodeId, PropertyId) {
        let node = Node::new(
            "Number",
            Vec::new(),
            [PropertyDescriptor::number("value").with_value(value)],
        );
        let out = node.outputs()[0].id();
        (graph.add_node(node).unwrap(), out)
    }

    fn add(graph: &mut Graph) -> (NodeId, PropertyId, PropertyId, PropertyId) {
        let node = Node::builder("Add")
            .input(PropertyDescriptor::number("a"))
            .input(PropertyDescriptor::number("b"))
            .output(PropertyDescriptor::number("sum"))
            .evaluator(|ctx: &mut EvaluationContext| {
                if ctx.input("a").is_some() && ctx.input("b").is_some() {
                    let sum = ctx.require_number("a")? + ctx.require_number("b")?;
                    ctx.set_output("sum", sum)
                } else {
                    ctx.clear_output("sum")
                }
            })
            .build();
        let (a, b, sum) = (node.inputs()[0].id(), node.inputs()[1].id(), node.outputs()[0].id());
        (graph.add_node(node).unwrap(), a, b, sum)
    }

    fn display(graph: &mut Graph) -> (NodeId, PropertyId) {
        let node = Node::new("Display", [PropertyDescriptor::number("value")], Vec::new());
        let input = node.inputs()[0].id();
        (graph.add_node(node).unwrap(), input)
    }

    #[test]
    fn test_add_feeds_display() {
        init_logger();
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, three) = constant(&mut graph, 3.0);
        let (_, a, b, sum) = add(&mut graph);
        let (_, shown) = display(&mut graph);

        graph.connect(two, a).unwrap();
        graph.connect(three, b).unwrap();
        graph.connect(sum, shown).unwrap();

        assert_eq!(graph.value(sum), Some(&Value::Number(5.0)));
        assert_eq!(graph.value(shown), Some(&Value::Number(5.0)));

        // Changing a source re-runs the chain.
        let report = graph.set_property_value(two, Some(Value::Number(10.0))).unwrap();
        assert_eq!(graph.value(shown), Some(&Value::Number(13.0)));
        assert_eq!(report.nodes_evaluated, 1);
        assert_eq!(report.deliveries, 2);
        assert!(report.is_clean());
    }

    #[test]
    fn test_disconnect_clears_and_reevaluates() {
        init_logger();
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, three) = constant(&mut graph, 3.0);
        let (_, a, b, sum) = add(&mut graph);
        let (_, shown) = display(&mut graph);

        let first = graph.connect(two, a).unwrap();
        graph.connect(three, b).unwrap();
        graph.connect(sum, shown).unwrap();

        graph.disconnect(first.id);

        assert_eq!(graph.value(a), None);
        assert_eq!(graph.value(sum), None);
        assert_eq!(graph.value(shown), None);
        // The upstream output keeps its value.
        assert_eq!(graph.value(two), Some(&Value::Number(2.0)));
    }

    /// An Add node that refuses to run with an unset input.
    fn strict_add(graph: &mut Graph) -> (NodeId, PropertyId, PropertyId, PropertyId) {
        let node = Node::builder("StrictAdd")
            .input(PropertyDescriptor::number("a"))
            .input(PropertyDescriptor::number("b"))
            .output(PropertyDescriptor::number("sum"))
            .evaluator(|ctx: &mut EvaluationContext| {
                let sum = ctx.require_number("a")? + ctx.require_number("b")?;
                ctx.set_output("sum", sum)
            })
            .build();
        let (a, b, sum) = (node.inputs()[0].id(), node.inputs()[1].id(), node.outputs()[0].id());
        (graph.add_node(node).unwrap(), a, b, sum)
    }

    #[test]
    fn test_failed_reevaluation_after_disconnect_keeps_stale_outputs() {
        init_logger();
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, three) = constant(&mut graph, 3.0);
        let (node, a, b, sum) = strict_add(&mut graph);
        let (_, shown) = display(&mut graph);

        let first = graph.connect(two, a).unwrap();
        graph.connect(three, b).unwrap();
        graph.connect(sum, shown).unwrap();
        assert_eq!(graph.value(shown), Some(&Value::Number(5.0)));

        let (removed, report) = graph.disconnect_with_report(first.id).unwrap();
        assert_eq!(removed, first);
        assert_eq!(graph.value(a), None);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, node);
        assert!(matches!(
            report.errors[0].1,
            EvaluationError::MissingInput { ref port, .. } if port == "a"
        ));

        // The failed run wrote nothing, so the old result is still shown.
        assert_eq!(graph.value(sum), Some(&Value::Number(5.0)));
        assert_eq!(graph.value(shown), Some(&Value::Number(5.0)));
        assert!(graph.disconnect_with_report(first.id).is_none());
    }

    #[test]
    fn test_connect_with_report_surfaces_evaluator_failures() {
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (node, a, _, sum) = strict_add(&mut graph);

        let (connection, report) = graph.connect_with_report(two, a).unwrap();
        assert_eq!(graph.connection_into(a), Some(&connection));
        assert_eq!(graph.value(a), Some(&Value::Number(2.0)));
        assert_eq!(report.values_changed, 1);
        assert_eq!(report.nodes_evaluated, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, node);
        assert_eq!(graph.value(sum), None);
    }

    #[test]
    fn test_disconnected_input_receives_nothing() {
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, shown) = display(&mut graph);

        let conn = graph.connect(two, shown).unwrap();
        graph.disconnect(conn.id);
        graph.set_property_value(two, Some(Value::Number(9.0))).unwrap();

        assert_eq!(graph.value(shown), None);
    }

    #[test]
    fn test_keep_value_on_disconnect() {
        let mut graph = Graph::with_options(GraphOptions::new().with_clear_on_disconnect(false));
        let (_, two) = constant(&mut graph, 2.0);
        let (_, shown) = display(&mut graph);

        let conn = graph.connect(two, shown).unwrap();
        graph.disconnect(conn.id);

        assert_eq!(graph.value(shown), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_fan_out_reaches_every_subscriber() {
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, first) = display(&mut graph);
        let (_, second) = display(&mut graph);

        graph.connect(two, first).unwrap();
        graph.connect(two, second).unwrap();
        let report = graph.set_property_value(two, Some(Value::Number(4.0))).unwrap();

        assert_eq!(report.deliveries, 2);
        assert_eq!(graph.value(first), Some(&Value::Number(4.0)));
        assert_eq!(graph.value(second), Some(&Value::Number(4.0)));
    }

    #[test]
    fn test_push_on_connect_can_be_disabled() {
        let mut graph = Graph::with_options(GraphOptions::new().with_push_on_connect(false));
        let (_, two) = constant(&mut graph, 2.0);
        let (_, shown) = display(&mut graph);

        graph.connect(two, shown).unwrap();
        assert_eq!(graph.value(shown), None);

        graph.set_property_value(two, Some(Value::Number(1.0))).unwrap();
        assert_eq!(graph.value(shown), Some(&Value::Number(1.0)));
    }

    #[test]
    fn test_unchanged_value_stops_cascade() {
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let (_, shown) = display(&mut graph);
        graph.connect(two, shown).unwrap();

        let report = graph.set_property_value(two, Some(Value::Number(2.0))).unwrap();
        assert_eq!(report.values_changed, 0);
        assert_eq!(report.deliveries, 0);
    }

    #[test]
    fn test_evaluation_error_does_not_abort_cascade() {
        init_logger();
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let failing = Node::builder("Fails")
            .input(PropertyDescriptor::number("x"))
            .output(PropertyDescriptor::number("y").with_value(1.0))
            .evaluator(|_ctx: &mut EvaluationContext| -> EvaluationResult<()> {
                Err(EvaluationError::Other("boom".into()))
            })
            .build();
        let (fail_in, fail_out) = (failing.inputs()[0].id(), failing.outputs()[0].id());
        let fail_id = graph.add_node(failing).unwrap();
        let (_, shown) = display(&mut graph);

        let failures = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&failures);
        graph.subscribe_events(move |event| {
            if matches!(event, PropagationEvent::EvaluationFailed { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        graph.connect(two, fail_in).unwrap();
        graph.connect(two, shown).unwrap();

        let report = graph.set_property_value(two, Some(Value::Number(3.0))).unwrap();

        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].0, fail_id);
        assert_eq!(graph.value(fail_out), Some(&Value::Number(1.0)));
        assert_eq!(graph.value(shown), Some(&Value::Number(3.0)));
        // One failure on connect, one on the set.
        assert_eq!(failures.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_evaluator_output_type_is_checked() {
        let mut graph = Graph::new();
        let (_, two) = constant(&mut graph, 2.0);
        let wrong = Node::builder("Wrong")
            .input(PropertyDescriptor::number("x"))
            .output(PropertyDescriptor::number("y"))
            .output(PropertyDescriptor::new("c", PropertyType::COLOR))
            .evaluator(|ctx: &mut EvaluationContext| {
                ctx.set_output("c", Color::RED)?;
                ctx.set_output("y", "not a number")
            })
            .build();
        let (wrong_in, y, c) = (
            wrong.inputs()[0].id(),
            wrong.outputs()[0].id(),
            wrong.outputs()[1].id(),
        );
        graph.add_node(wrong).unwrap();

        graph.connect(two, wrong_in).unwrap();

        // The whole batch is dropped.
        assert_eq!(graph.value(y), None);
        assert_eq!(graph.value(c), None);
    }

    #[test]
    fn test_evaluate_all_runs_in_dependency_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut graph = Graph::with_options(GraphOptions::new().with_evaluation(false));

        let make = |name: &'static str, order: Arc<Mutex<Vec<&'static str>>>| {
            Node::builder(name)
                .input(PropertyDescriptor::number("in"))
                .output(PropertyDescriptor::number("out"))
                .evaluator(move |ctx: &mut EvaluationContext| {
                    order.lock().unwrap().push(name);
                    let value = ctx.number_or("in", 0.0)?;
                    ctx.set_output("out", value + 1.0)
                })
                .build()
        };

        let last = make("last", Arc::clone(&order));
        let first = make("first", Arc::clone(&order));
        let (last_in, last_out) = (last.inputs()[0].id(), last.outputs()[0].id());
        let first_out = first.outputs()[0].id();
        graph.add_node(last).unwrap();
        graph.add_node(first).unwrap();
        graph.connect(first_out, last_in).unwrap();

        let report = graph.evaluate_all().unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "last"]);
        assert_eq!(report.nodes_evaluated, 2);
        assert_eq!(graph.value(last_out), Some(&Value::Number(2.0)));
    }

    #[test]
    fn test_evaluate_node() {
        let mut graph = Graph::new();
        let (id, a, b, sum) = add(&mut graph);
        graph.set_property_value(a, Some(Value::Number(1.0))).unwrap();
        graph.set_property_value(b, Some(Value::Number(1.5))).unwrap();
        assert_eq!(graph.value(sum), Some(&Value::Number(2.5)));

        let report = graph.evaluate_node(id).unwrap();
        assert_eq!(report.nodes_evaluated, 1);
        assert_eq!(report.values_changed, 0);
        assert!(graph.evaluate_node(NodeId::new()).is_err());
    }

    #[test]
    fn test_value_events_carry_new_value() {
        let mut graph = Graph::new();
        let (node_id, two) = constant(&mut graph, 2.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        graph.subscribe_events(move |event| {
            if let PropagationEvent::ValueChanged { .. } = event {
                sink.lock().unwrap().push(event.clone());
            }
        });

        graph.set_property_value(two, Some(Value::Number(8.0))).unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PropagationEvent::ValueChanged {
                node_id,
                property: two,
                value: Some(Value::Number(8.0)),
            }]
        );
    }
}
