//! Topological analysis of the node graph.
//!
//! Provides algorithms for:
//! - Feedback-loop detection (reachability)
//! - Topological sorting (evaluation order)
//! - Upstream/downstream dependency analysis
//!
//! Every query works on a node-level dependency graph derived from the
//! current connections; the graph itself stores only property-level edges.

use crate::core::error::{GraphError, GraphResult, NodeId};
use crate::graph::structure::Graph;
use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::unionfind::UnionFind;
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use std::collections::{HashMap, HashSet};

/// Node-level dependency graph. Edge weights count parallel connections.
pub type DependencyGraph = DiGraphMap<NodeId, usize>;

/// Analyzer for graph topology.
pub struct TopologyAnalyzer<'a> {
    graph: &'a Graph,
    dependencies: DependencyGraph,
}

impl<'a> TopologyAnalyzer<'a> {
    /// Create a new analyzer for the given graph.
    pub fn new(graph: &'a Graph) -> Self {
        let mut dependencies = DiGraphMap::with_capacity(graph.node_count(), graph.connection_count());
        for node_id in graph.node_ids() {
            dependencies.add_node(node_id);
        }
        for conn in graph.connections() {
            let weight = dependencies
                .edge_weight(conn.output.node_id, conn.input.node_id)
                .copied()
                .unwrap_or(0);
            dependencies.add_edge(conn.output.node_id, conn.input.node_id, weight + 1);
        }
        Self {
            graph,
            dependencies,
        }
    }

    /// The node-level dependency graph.
    pub fn dependency_graph(&self) -> &DependencyGraph {
        &self.dependencies
    }

    /// Check if `target` is reachable from `start` following connections.
    ///
    /// A node always reaches itself.
    pub fn is_reachable(&self, start: NodeId, target: NodeId) -> bool {
        if start == target {
            return true;
        }
        if !self.dependencies.contains_node(start) || !self.dependencies.contains_node(target) {
            return false;
        }
        has_path_connecting(&self.dependencies, start, target, None)
    }

    /// Check if connecting an output on `from` to an input on `to` would
    /// close a loop.
    pub fn would_create_cycle(&self, from: NodeId, to: NodeId) -> bool {
        self.is_reachable(to, from)
    }

    /// Check if the graph has any cycles.
    pub fn has_cycle(&self) -> bool {
        is_cyclic_directed(&self.dependencies)
    }

    /// Get the topological sort order.
    ///
    /// Returns nodes in an order where dependencies come before dependents.
    pub fn topological_sort(&self) -> GraphResult<Vec<NodeId>> {
        toposort(&self.dependencies, None).map_err(|cycle| GraphError::CycleDetected {
            nodes: vec![cycle.node_id()],
        })
    }

    /// All nodes that depend on the given node, nearest first.
    pub fn downstream(&self, node_id: NodeId) -> Vec<NodeId> {
        if !self.dependencies.contains_node(node_id) {
            return Vec::new();
        }
        let mut bfs = Bfs::new(&self.dependencies, node_id);
        let mut result = Vec::new();
        while let Some(current) = bfs.next(&self.dependencies) {
            if current != node_id {
                result.push(current);
            }
        }
        result
    }

    /// All nodes the given node depends on, nearest first.
    pub fn upstream(&self, node_id: NodeId) -> Vec<NodeId> {
        if !self.dependencies.contains_node(node_id) {
            return Vec::new();
        }
        let reversed = Reversed(&self.dependencies);
        let mut bfs = Bfs::new(reversed, node_id);
        let mut result = Vec::new();
        while let Some(current) = bfs.next(reversed) {
            if current != node_id {
                result.push(current);
            }
        }
        result
    }

    /// Nodes with no incoming connections.
    pub fn source_nodes(&self) -> Vec<NodeId> {
        self.nodes_without(Direction::Incoming)
    }

    /// Nodes with no outgoing connections.
    pub fn sink_nodes(&self) -> Vec<NodeId> {
        self.nodes_without(Direction::Outgoing)
    }

    fn nodes_without(&self, direction: Direction) -> Vec<NodeId> {
        self.graph
            .node_ids()
            .filter(|&id| {
                self.dependencies
                    .neighbors_directed(id, direction)
                    .next()
                    .is_none()
            })
            .collect()
    }

    /// Find all disconnected subgraphs (ignoring edge direction).
    pub fn find_subgraphs(&self) -> Vec<HashSet<NodeId>> {
        let ids: Vec<NodeId> = self.graph.node_ids().collect();
        let index: HashMap<NodeId, usize> = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let mut components = UnionFind::new(ids.len());
        for (from, to, _) in self.dependencies.all_edges() {
            if let (Some(&a), Some(&b)) = (index.get(&from), index.get(&to)) {
                components.union(a, b);
            }
        }

        let mut roots: Vec<usize> = Vec::new();
        let mut subgraphs: Vec<HashSet<NodeId>> = Vec::new();
        for (i, &id) in ids.iter().enumerate() {
            let root = components.find(i);
            match roots.iter().position(|&r| r == root) {
                Some(slot) => {
                    subgraphs[slot].insert(id);
                }
                None => {
                    roots.push(root);
                    subgraphs.push(HashSet::from([id]));
                }
            }
        }
        subgraphs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::node::Node;
    use crate::core::property::PropertyDescriptor;

    fn passthrough(graph: &mut Graph) -> NodeId {
        graph
            .add_node(Node::new(
                "Pass",
                [PropertyDescriptor::number("in")],
                [PropertyDescriptor::number("out")],
            ))
            .unwrap()
    }

    fn link(graph: &mut Graph, from: NodeId, to: NodeId) {
        let output = graph.node(from).unwrap().outputs()[0].id();
        let input = graph.node(to).unwrap().inputs()[0].id();
        graph.connect(output, input).unwrap();
    }

    #[test]
    fn test_topological_sort() {
        let mut graph = Graph::new();
        let node3 = passthrough(&mut graph);
        let node1 = passthrough(&mut graph);
        let node2 = passthrough(&mut graph);

        link(&mut graph, node1, node2);
        link(&mut graph, node2, node3);

        let sorted = graph.topology().topological_sort().unwrap();
        let pos = |id| sorted.iter().position(|&n| n == id).unwrap();

        assert_eq!(sorted.len(), 3);
        assert!(pos(node1) < pos(node2));
        assert!(pos(node2) < pos(node3));
    }

    #[test]
    fn test_reachability() {
        let mut graph = Graph::new();
        let a = passthrough(&mut graph);
        let b = passthrough(&mut graph);
        let c = passthrough(&mut graph);

        link(&mut graph, a, b);
        link(&mut graph, b, c);

        let analyzer = graph.topology();
        assert!(analyzer.is_reachable(a, c));
        assert!(!analyzer.is_reachable(c, a));
        assert!(analyzer.would_create_cycle(c, a));
        assert!(analyzer.would_create_cycle(a, a));
        assert!(!analyzer.would_create_cycle(a, c));
        assert!(!analyzer.has_cycle());
        assert!(!analyzer.is_reachable(a, NodeId::new()));
    }

    #[test]
    fn test_upstream_downstream() {
        let mut graph = Graph::new();
        let a = passthrough(&mut graph);
        let b = passthrough(&mut graph);
        let c = passthrough(&mut graph);
        let lone = passthrough(&mut graph);

        link(&mut graph, a, b);
        link(&mut graph, b, c);

        let analyzer = graph.topology();
        assert_eq!(analyzer.downstream(a), vec![b, c]);
        assert_eq!(analyzer.upstream(c), vec![b, a]);
        assert!(analyzer.downstream(lone).is_empty());
        assert!(analyzer.upstream(NodeId::new()).is_empty());
    }

    #[test]
    fn test_source_sink_nodes() {
        let mut graph = Graph::new();
        let a = passthrough(&mut graph);
        let b = passthrough(&mut graph);
        let lone = passthrough(&mut graph);

        link(&mut graph, a, b);

        let analyzer = graph.topology();
        assert_eq!(analyzer.source_nodes(), vec![a, lone]);
        assert_eq!(analyzer.sink_nodes(), vec![b, lone]);
    }

    #[test]
    fn test_find_subgraphs() {
        let mut graph = Graph::new();

        // Two disconnected chains
        let a1 = passthrough(&mut graph);
        let a2 = passthrough(&mut graph);
        let b1 = passthrough(&mut graph);
        let b2 = passthrough(&mut graph);

        link(&mut graph, a1, a2);
        link(&mut graph, b1, b2);

        let subgraphs = graph.topology().find_subgraphs();

        assert_eq!(subgraphs.len(), 2);
        assert!(subgraphs[0].contains(&a1) && subgraphs[0].contains(&a2));
        assert!(subgraphs[1].contains(&b1) && subgraphs[1].contains(&b2));
    }

    #[test]
    fn test_parallel_connections_share_one_dependency_edge() {
        let mut graph = Graph::new();
        let a = passthrough(&mut graph);
        let add = graph
            .add_node(Node::new(
                "Add",
                [PropertyDescriptor::number("a"), PropertyDescriptor::number("b")],
                [PropertyDescriptor::number("sum")],
            ))
            .unwrap();

        let out = graph.node(a).unwrap().outputs()[0].id();
        let inputs: Vec<_> = graph.node(add).unwrap().inputs().iter().map(|p| p.id()).collect();
        graph.connect(out, inputs[0]).unwrap();
        graph.connect(out, inputs[1]).unwrap();

        let analyzer = graph.topology();
        assert_eq!(analyzer.dependency_graph().edge_count(), 1);
        assert_eq!(analyzer.dependency_graph().edge_weight(a, add), Some(&2));
    }
}
