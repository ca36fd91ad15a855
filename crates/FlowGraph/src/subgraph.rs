//! # SubGraph Instantiation
//!
//! Deep-copies a source graph (the "asset") into a destination graph,
//! creates the representative boundary node that becomes the sub-graph's
//! external interface, and wraps the copies in a [`SubGraphFrame`].
//!
//! The content-copy stage is shared with clipboard paste, which copies
//! nodes and edges but creates no representative or frame.

use glam::Vec2;
use indexmap::IndexMap;

use crate::decorations::{SubGraphFrame, fit_bounds};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::id::{EdgeId, FrameId, NodeId, PortId};
use crate::math::{CONTAINER_PADDING, Rect};
use crate::model::{
    Edge, Node, Port, PortCapacity, PortDefinition, PortDirection, SUBGRAPH_BOUNDARY_TYPE,
};

/// Fallback frame size when the asset contributes no node bounds.
const EMPTY_FRAME_SIZE: Vec2 = Vec2::new(200.0, 150.0);

/// Source→destination id maps produced by a content copy.
#[derive(Debug, Default)]
pub struct CopyResult {
    pub nodes: IndexMap<NodeId, NodeId>,
    pub ports: IndexMap<PortId, PortId>,
    pub edges: Vec<EdgeId>,
}

/// Everything [`instantiate`] created, for callers that need to undo it.
#[derive(Debug)]
pub struct SubGraphInstance {
    pub frame: FrameId,
    pub representative: NodeId,
    pub nodes: IndexMap<NodeId, NodeId>,
    pub ports: IndexMap<PortId, PortId>,
    pub edges: Vec<EdgeId>,
}

fn fresh_port_id(dest: &Graph, taken: &IndexMap<PortId, PortId>) -> PortId {
    loop {
        let candidate = dest.allocate_port_id();
        if !taken.values().any(|p| *p == candidate) {
            return candidate;
        }
    }
}

/// Copies every node and every fully mapped edge of `source` into `dest`,
/// offsetting positions. All ids are freshly allocated; name, semantic id,
/// direction, kind, data type, capacity and sort order are preserved per
/// port.
pub fn copy_into(dest: &mut Graph, source: &Graph, offset: Vec2) -> Result<CopyResult, GraphError> {
    let mut result = CopyResult::default();

    for src_node in source.nodes() {
        let node_id = dest.allocate_node_id();
        let mut node = Node::new(node_id, &src_node.type_id, src_node.position + offset);
        node.size = src_node.size;
        node.display_mode = src_node.display_mode;
        node.allow_dynamic_ports = src_node.allow_dynamic_ports;
        node.user_data = src_node.user_data.clone();
        for src_port in &src_node.ports {
            let port_id = fresh_port_id(dest, &result.ports);
            result.ports.insert(src_port.id, port_id);
            node.ports.push(Port::from_parts(
                port_id,
                node_id,
                src_port.name.clone(),
                src_port.semantic_id().to_string(),
                src_port.direction,
                src_port.kind,
                src_port.data_type.clone(),
                src_port.capacity,
                src_port.sort_order,
            ));
        }
        dest.add_node_direct(node)?;
        result.nodes.insert(src_node.id, node_id);
    }

    for src_edge in source.edges() {
        let (Some(source_port), Some(target_port)) = (
            result.ports.get(&src_edge.source_port).copied(),
            result.ports.get(&src_edge.target_port).copied(),
        ) else {
            continue;
        };
        let edge_id = dest.allocate_edge_id();
        let mut edge = Edge::new(edge_id, source_port, target_port);
        edge.user_data = src_edge.user_data.clone();
        dest.add_edge_direct(edge)?;
        result.edges.push(edge_id);
    }

    Ok(result)
}

/// Boundary port definitions inferred from the asset's unbound ports: each
/// input without incoming edges becomes a Single boundary input, each
/// output without outgoing edges a Multiple boundary output. Sort order is
/// assigned in discovery order per direction.
fn infer_boundary_ports(source: &Graph) -> Vec<PortDefinition> {
    let mut defs = Vec::new();
    let mut next_input = 0;
    let mut next_output = 0;
    for node in source.nodes() {
        for port in &node.ports {
            let edges = source.edge_ids_for_port(port.id);
            match port.direction {
                PortDirection::Input => {
                    let has_incoming = edges
                        .iter()
                        .filter_map(|e| source.edge(*e))
                        .any(|e| e.target_port == port.id);
                    if !has_incoming {
                        defs.push(
                            PortDefinition::new(
                                &port.name,
                                PortDirection::Input,
                                port.kind,
                                &port.data_type,
                            )
                            .with_semantic_id(port.semantic_id())
                            .with_capacity(PortCapacity::Single)
                            .with_sort_order(next_input),
                        );
                        next_input += 1;
                    }
                }
                PortDirection::Output => {
                    let has_outgoing = edges
                        .iter()
                        .filter_map(|e| source.edge(*e))
                        .any(|e| e.source_port == port.id);
                    if !has_outgoing {
                        defs.push(
                            PortDefinition::new(
                                &port.name,
                                PortDirection::Output,
                                port.kind,
                                &port.data_type,
                            )
                            .with_semantic_id(port.semantic_id())
                            .with_capacity(PortCapacity::Multiple)
                            .with_sort_order(next_output),
                        );
                        next_output += 1;
                    }
                }
            }
        }
    }
    defs
}

/// Instantiates `source` into `dest` as a sub-graph: copies the content,
/// creates the representative boundary node at `offset` (with explicit
/// `boundary_ports` when given, inferred otherwise) and wraps the copies in
/// a frame.
pub fn instantiate(
    dest: &mut Graph,
    source: &Graph,
    title: &str,
    offset: Vec2,
    boundary_ports: Option<&[PortDefinition]>,
    source_asset: Option<&str>,
) -> Result<SubGraphInstance, GraphError> {
    let copied = copy_into(dest, source, offset)?;

    let inferred;
    let boundary_defs: &[PortDefinition] = match boundary_ports {
        Some(explicit) => explicit,
        None => {
            inferred = infer_boundary_ports(source);
            &inferred
        }
    };

    let representative_id = dest.allocate_node_id();
    let mut representative = Node::new(representative_id, SUBGRAPH_BOUNDARY_TYPE, offset);
    representative.allow_dynamic_ports = true;
    let mut taken = IndexMap::new();
    for def in boundary_defs {
        let port_id = fresh_port_id(dest, &taken);
        taken.insert(port_id, port_id);
        representative
            .ports
            .push(Port::from_definition(port_id, representative_id, def));
    }
    dest.add_node_direct(representative)?;

    let bounds = fit_bounds(dest, copied.nodes.values().copied(), CONTAINER_PADDING)
        .unwrap_or_else(|| Rect::from_pos_size(offset, EMPTY_FRAME_SIZE));

    let frame_id = dest.allocate_frame_id();
    let mut frame = SubGraphFrame::new(frame_id, title, representative_id);
    frame.bounds = bounds;
    frame.contained.extend(copied.nodes.values().copied());
    frame.source_asset = source_asset.map(str::to_string);
    dest.add_frame_direct(frame)?;

    tracing::debug!(
        frame = %frame_id,
        nodes = copied.nodes.len(),
        boundary_ports = boundary_defs.len(),
        "sub-graph instantiated"
    );

    Ok(SubGraphInstance {
        frame: frame_id,
        representative: representative_id,
        nodes: copied.nodes,
        ports: copied.ports,
        edges: copied.edges,
    })
}
