//! # Topology Algorithms
//!
//! Pure queries over a [`Graph`]: nothing here mutates. Traversal follows
//! the directed graph induced by edges (Output→Input); internal bridge
//! edges to a sub-graph boundary are skipped by the directed algorithms,
//! matching the DAG invariant which ignores them.

use indexmap::IndexSet;
use std::collections::{HashMap, VecDeque};

use crate::graph::Graph;
use crate::id::NodeId;

/// The node driven by an edge (the Input side after normalization).
fn edge_target_node(graph: &Graph, edge: &crate::model::Edge) -> Option<NodeId> {
    graph.port(edge.target_port).map(|p| p.node)
}

fn edge_source_node(graph: &Graph, edge: &crate::model::Edge) -> Option<NodeId> {
    graph.port(edge.source_port).map(|p| p.node)
}

/// Downstream neighbors of a node, bridge edges excluded.
fn successors(graph: &Graph, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let Some(node_ref) = graph.node(node) else {
        return out;
    };
    for port in node_ref.output_ports() {
        for edge_id in graph.edge_ids_for_port(port.id) {
            let Some(edge) = graph.edge(*edge_id) else {
                continue;
            };
            if edge.source_port != port.id || graph.is_bridge_edge(edge) {
                continue;
            }
            if let Some(target) = edge_target_node(graph, edge) {
                out.push(target);
            }
        }
    }
    out
}

/// Would adding an edge `from → to` close a cycle? True exactly when `from`
/// is already reachable from `to`.
pub fn would_create_cycle(graph: &Graph, from: NodeId, to: NodeId) -> bool {
    if from == to {
        return true;
    }
    reachable_with_start(graph, to).contains(&from)
}

/// Every node reachable from `start` along Output→Input, excluding `start`
/// itself.
pub fn reachable_nodes(graph: &Graph, start: NodeId) -> IndexSet<NodeId> {
    let mut reachable = reachable_with_start(graph, start);
    reachable.shift_remove(&start);
    reachable
}

fn reachable_with_start(graph: &Graph, start: NodeId) -> IndexSet<NodeId> {
    let mut visited = IndexSet::new();
    let mut queue = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        for next in successors(graph, node) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    visited
}

/// Kahn's algorithm over the port-induced directed graph. `None` when a
/// cycle leaves residual in-degree.
pub fn topological_sort(graph: &Graph) -> Option<Vec<NodeId>> {
    let mut in_degree: HashMap<NodeId, usize> =
        graph.nodes().map(|n| (n.id, 0)).collect();
    for edge in graph.edges() {
        if graph.is_bridge_edge(edge) {
            continue;
        }
        if let Some(target) = edge_target_node(graph, edge) {
            if let Some(degree) = in_degree.get_mut(&target) {
                *degree += 1;
            }
        }
    }

    // Seeded in insertion order so the result is deterministic.
    let mut queue: VecDeque<NodeId> = graph
        .nodes()
        .filter(|n| in_degree.get(&n.id).copied() == Some(0))
        .map(|n| n.id)
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());
    while let Some(node) = queue.pop_front() {
        order.push(node);
        for next in successors(graph, node) {
            if let Some(degree) = in_degree.get_mut(&next) {
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(next);
                }
            }
        }
    }

    if order.len() == graph.node_count() {
        Some(order)
    } else {
        None
    }
}

/// Whether the (non-bridge) directed graph contains a cycle.
pub fn has_cycle(graph: &Graph) -> bool {
    topological_sort(graph).is_none()
}

/// Nodes without incoming edges.
pub fn root_nodes(graph: &Graph) -> Vec<NodeId> {
    degree_filter(graph, |incoming, _| incoming == 0)
}

/// Nodes without outgoing edges.
pub fn leaf_nodes(graph: &Graph) -> Vec<NodeId> {
    degree_filter(graph, |_, outgoing| outgoing == 0)
}

fn degree_filter(
    graph: &Graph,
    keep: impl Fn(usize, usize) -> bool,
) -> Vec<NodeId> {
    let mut incoming: HashMap<NodeId, usize> = HashMap::new();
    let mut outgoing: HashMap<NodeId, usize> = HashMap::new();
    for edge in graph.edges() {
        if let Some(source) = edge_source_node(graph, edge) {
            *outgoing.entry(source).or_insert(0) += 1;
        }
        if let Some(target) = edge_target_node(graph, edge) {
            *incoming.entry(target).or_insert(0) += 1;
        }
    }
    graph
        .nodes()
        .filter(|n| {
            keep(
                incoming.get(&n.id).copied().unwrap_or(0),
                outgoing.get(&n.id).copied().unwrap_or(0),
            )
        })
        .map(|n| n.id)
        .collect()
}

/// Weakly connected components over the undirected projection, bridge edges
/// included. Components and their members come out in insertion order.
pub fn connected_components(graph: &Graph) -> Vec<Vec<NodeId>> {
    let mut neighbors: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for edge in graph.edges() {
        let (Some(a), Some(b)) = (
            edge_source_node(graph, edge),
            edge_target_node(graph, edge),
        ) else {
            continue;
        };
        neighbors.entry(a).or_default().push(b);
        neighbors.entry(b).or_default().push(a);
    }

    let mut visited: IndexSet<NodeId> = IndexSet::new();
    let mut components = Vec::new();
    for node in graph.nodes() {
        if visited.contains(&node.id) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::new();
        visited.insert(node.id);
        queue.push_back(node.id);
        while let Some(current) = queue.pop_front() {
            component.push(current);
            if let Some(adjacent) = neighbors.get(&current) {
                for next in adjacent {
                    if visited.insert(*next) {
                        queue.push_back(*next);
                    }
                }
            }
        }
        components.push(component);
    }
    components
}
