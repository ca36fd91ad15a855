//! # Graph Aggregate Root
//!
//! The [`Graph`] owns every entity, keeps the secondary indices that make
//! port/edge queries O(1), and exposes the low-level mutation API that the
//! command layer drives.
//!
//! ## Concurrency
//! Single-threaded cooperative: one logical owner mutates and reads on the
//! same thread; every mutation completes synchronously. Event ordering is
//! fixed — "added" signals fire after the entity and all indices are in
//! place, "removed" signals fire before structural removal so listeners can
//! still resolve ids.
//!
//! ## Trust domain
//! The `*_direct` methods are the entry points for commands and the
//! deserializer. They validate referential integrity but skip connection
//! policy; user-visible mutation goes through the command layer.

use glam::Vec2;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

use crate::decorations::{ContainerRef, GraphComment, NodeGroup, SubGraphFrame};
use crate::error::GraphError;
use crate::events::{GraphEvents, NodeMoved};
use crate::id::{CommentId, EdgeId, FrameId, GraphId, GroupId, NodeId, PortId};
use crate::model::{DisplayMode, Edge, Node, NodeState, Port, PortCapacity, PortDefinition};
use crate::policy::{self, ConnectionPolicy, ConnectionResult, DefaultConnectionPolicy};
use crate::registry::{NodeTypeCatalog, TypeCompatibilityRegistry};

/// Which edge shapes the graph admits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Topology {
    /// Cycles are forbidden (ignoring internal bridge edges).
    #[default]
    #[serde(rename = "DAG")]
    Dag,
    /// Directed, cycles allowed.
    DirectedGraph,
    /// Direction is cosmetic.
    Undirected,
}

/// Per-graph configuration: topology, connection policy and the two
/// registries the policy consults.
pub struct GraphSettings {
    pub topology: Topology,
    pub policy: Box<dyn ConnectionPolicy>,
    pub compatibility: TypeCompatibilityRegistry,
    pub catalog: NodeTypeCatalog,
}

impl GraphSettings {
    pub fn new(topology: Topology) -> Self {
        Self {
            topology,
            ..Self::default()
        }
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            topology: Topology::Dag,
            policy: Box::new(DefaultConnectionPolicy::new()),
            compatibility: TypeCompatibilityRegistry::new(),
            catalog: NodeTypeCatalog::new(),
        }
    }
}

/// Result of [`Graph::connect`].
///
/// `displaced` carries the edge that was pushed out of a full
/// Single-capacity input, which is how `ConnectCommand` implements undo.
#[derive(Debug)]
pub struct ConnectOutcome {
    pub status: ConnectionResult,
    pub created: Option<EdgeId>,
    pub displaced: Option<Edge>,
}

impl ConnectOutcome {
    fn rejected(status: ConnectionResult) -> Self {
        Self {
            status,
            created: None,
            displaced: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.created.is_some()
    }
}

/// The aggregate root: entities, indices, settings and lifecycle signals.
pub struct Graph {
    pub id: GraphId,
    pub settings: GraphSettings,
    pub events: GraphEvents,
    nodes: IndexMap<NodeId, Node>,
    edges: IndexMap<EdgeId, Edge>,
    groups: IndexMap<GroupId, NodeGroup>,
    frames: IndexMap<FrameId, SubGraphFrame>,
    comments: IndexMap<CommentId, GraphComment>,
    /// Port id → owning node id.
    port_owner: HashMap<PortId, NodeId>,
    /// Port id → edges touching the port.
    port_edges: HashMap<PortId, Vec<EdgeId>>,
}

impl Graph {
    pub fn new(settings: GraphSettings) -> Self {
        Self::with_id(GraphId::fresh(), settings)
    }

    pub fn with_id(id: GraphId, settings: GraphSettings) -> Self {
        Self {
            id,
            settings,
            events: GraphEvents::default(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
            groups: IndexMap::new(),
            frames: IndexMap::new(),
            comments: IndexMap::new(),
            port_owner: HashMap::new(),
            port_edges: HashMap::new(),
        }
    }

    // ---- queries ----------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn group(&self, id: GroupId) -> Option<&NodeGroup> {
        self.groups.get(&id)
    }

    pub fn groups(&self) -> impl Iterator<Item = &NodeGroup> {
        self.groups.values()
    }

    pub fn frame(&self, id: FrameId) -> Option<&SubGraphFrame> {
        self.frames.get(&id)
    }

    pub fn frames(&self) -> impl Iterator<Item = &SubGraphFrame> {
        self.frames.values()
    }

    pub fn comment(&self, id: CommentId) -> Option<&GraphComment> {
        self.comments.get(&id)
    }

    pub fn comments(&self) -> impl Iterator<Item = &GraphComment> {
        self.comments.values()
    }

    /// Flat iterator over both container kinds.
    pub fn containers(&self) -> impl Iterator<Item = ContainerRef<'_>> {
        self.groups
            .values()
            .map(ContainerRef::Group)
            .chain(self.frames.values().map(ContainerRef::Frame))
    }

    pub fn port(&self, id: PortId) -> Option<&Port> {
        let node = self.port_owner.get(&id)?;
        self.nodes.get(node)?.find_port(id)
    }

    /// The node owning a port.
    pub fn port_node(&self, id: PortId) -> Option<&Node> {
        let node = self.port_owner.get(&id)?;
        self.nodes.get(node)
    }

    /// Ids of all edges touching a port, in creation order.
    pub fn edge_ids_for_port(&self, port: PortId) -> &[EdgeId] {
        self.port_edges.get(&port).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn edge_count_for_port(&self, port: PortId) -> usize {
        self.edge_ids_for_port(port).len()
    }

    /// Ids of all edges touching any port of a node, deduplicated, in
    /// discovery order.
    pub fn edge_ids_for_node(&self, node: NodeId) -> Vec<EdgeId> {
        let mut out: Vec<EdgeId> = Vec::new();
        if let Some(node) = self.nodes.get(&node) {
            for port in &node.ports {
                for edge in self.edge_ids_for_port(port.id) {
                    if !out.contains(edge) {
                        out.push(*edge);
                    }
                }
            }
        }
        out
    }

    pub fn is_boundary_node(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|n| n.is_boundary())
    }

    /// The frame whose contained set holds this node.
    pub fn frame_containing(&self, node: NodeId) -> Option<&SubGraphFrame> {
        self.frames.values().find(|f| f.contains(node))
    }

    /// The frame whose representative this node is.
    pub fn frame_by_representative(&self, node: NodeId) -> Option<&SubGraphFrame> {
        self.frames.values().find(|f| f.representative == node)
    }

    /// A node's scope: the containing frame's id, or `None` for top-level.
    pub fn scope_of(&self, node: NodeId) -> Option<FrameId> {
        self.frame_containing(node).map(|f| f.id)
    }

    /// Whether connecting these two ports would be an internal bridge: one
    /// endpoint sits on a frame's representative and the other endpoint's
    /// node lives inside that frame.
    pub fn is_internal_bridge(&self, a: PortId, b: PortId) -> bool {
        let (Some(pa), Some(pb)) = (self.port(a), self.port(b)) else {
            return false;
        };
        let (na, nb) = (pa.node, pb.node);
        if let Some(frame) = self.frame_by_representative(na)
            && frame.contains(nb)
        {
            return true;
        }
        if let Some(frame) = self.frame_by_representative(nb)
            && frame.contains(na)
        {
            return true;
        }
        false
    }

    /// Whether an existing edge is an internal bridge.
    pub fn is_bridge_edge(&self, edge: &Edge) -> bool {
        self.is_internal_bridge(edge.source_port, edge.target_port)
    }

    /// Delegates to the configured policy after endpoint normalization.
    pub fn can_connect(&self, source: PortId, target: PortId) -> ConnectionResult {
        let (source, target) = policy::normalize_endpoints(self, source, target);
        self.settings.policy.can_connect(self, source, target)
    }

    // ---- fresh ids --------------------------------------------------------

    fn fresh_node_id(&self) -> NodeId {
        loop {
            let id = NodeId::fresh();
            if !self.nodes.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_port_id(&self) -> PortId {
        loop {
            let id = PortId::fresh();
            if !self.port_owner.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_edge_id(&self) -> EdgeId {
        loop {
            let id = EdgeId::fresh();
            if !self.edges.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_group_id(&self) -> GroupId {
        loop {
            let id = GroupId::fresh();
            if !self.groups.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_frame_id(&self) -> FrameId {
        loop {
            let id = FrameId::fresh();
            if !self.frames.contains_key(&id) {
                return id;
            }
        }
    }

    fn fresh_comment_id(&self) -> CommentId {
        loop {
            let id = CommentId::fresh();
            if !self.comments.contains_key(&id) {
                return id;
            }
        }
    }

    /// Fresh ids for entities built outside the graph (the instantiator).
    pub(crate) fn allocate_node_id(&self) -> NodeId {
        self.fresh_node_id()
    }

    pub(crate) fn allocate_port_id(&self) -> PortId {
        self.fresh_port_id()
    }

    pub(crate) fn allocate_edge_id(&self) -> EdgeId {
        self.fresh_edge_id()
    }

    pub(crate) fn allocate_frame_id(&self) -> FrameId {
        self.fresh_frame_id()
    }

    // ---- node lifecycle ---------------------------------------------------

    /// Creates a node of a registered type, synthesizing its default ports
    /// and payload from the catalog.
    pub fn add_node(&mut self, type_id: &str, position: Vec2) -> Result<NodeId, GraphError> {
        let definition = self
            .settings
            .catalog
            .get(type_id)
            .cloned()
            .ok_or_else(|| GraphError::UnknownNodeType(type_id.to_string()))?;

        let id = self.fresh_node_id();
        let mut node = Node::new(id, type_id, position);
        node.allow_dynamic_ports = definition.allow_dynamic_ports;
        node.user_data = definition.default_user_data.clone();
        for port_def in &definition.default_ports {
            let port_id = self.fresh_port_id();
            self.port_owner.insert(port_id, id);
            node.ports.push(Port::from_definition(port_id, id, port_def));
        }
        self.nodes.insert(id, node);

        if let Some(node) = self.nodes.get(&id) {
            self.events.node_added.emit(node);
        }
        tracing::debug!(node = %id, type_id, "node added");
        Ok(id)
    }

    /// Inserts a fully built node, ports included. Command/deserializer
    /// entry point: ids are taken as given and only checked for integrity.
    pub fn add_node_direct(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if self.nodes.contains_key(&node.id) {
            return Err(GraphError::DuplicateId(node.id.to_string()));
        }
        for port in &node.ports {
            if self.port_owner.contains_key(&port.id) {
                return Err(GraphError::DuplicateId(port.id.to_string()));
            }
            if port.node != node.id {
                return Err(GraphError::MalformedDocument(format!(
                    "port {} does not back-reference node {}",
                    port.id, node.id
                )));
            }
        }

        let id = node.id;
        for port in &node.ports {
            self.port_owner.insert(port.id, id);
        }
        self.nodes.insert(id, node);
        if let Some(node) = self.nodes.get(&id) {
            self.events.node_added.emit(node);
        }
        Ok(id)
    }

    /// Removes a node, cascading every touching edge and every containment
    /// membership. Returns the removed edges.
    pub fn remove_node(&mut self, id: NodeId) -> Result<Vec<Edge>, GraphError> {
        if !self.nodes.contains_key(&id) {
            return Err(GraphError::NodeNotFound(id));
        }

        let mut edge_ids: Vec<EdgeId> = Vec::new();
        if let Some(node) = self.nodes.get(&id) {
            for port in &node.ports {
                for edge in self.edge_ids_for_port(port.id) {
                    if !edge_ids.contains(edge) {
                        edge_ids.push(*edge);
                    }
                }
            }
        }

        // Raised before structural removal: listeners can still resolve the
        // node and its ports.
        if let Some(node) = self.nodes.get(&id) {
            self.events.node_removed.emit(node);
        }

        let mut removed_edges = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            if let Some(edge) = self.remove_edge_internal(edge_id) {
                removed_edges.push(edge);
            }
        }

        for group in self.groups.values_mut() {
            group.contained.shift_remove(&id);
        }
        for frame in self.frames.values_mut() {
            frame.contained.shift_remove(&id);
        }

        if let Some(node) = self.nodes.shift_remove(&id) {
            for port in &node.ports {
                self.port_owner.remove(&port.id);
                self.port_edges.remove(&port.id);
            }
        }
        tracing::debug!(node = %id, cascaded = removed_edges.len(), "node removed");
        Ok(removed_edges)
    }

    pub fn move_node(&mut self, id: NodeId, position: Vec2) -> Result<Vec2, GraphError> {
        let old = {
            let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
            let old = node.position;
            node.position = position;
            old
        };
        self.events.node_moved.emit(&NodeMoved {
            node: id,
            old_position: old,
            new_position: position,
        });
        Ok(old)
    }

    /// Replaces a node's payload, returning the previous one.
    pub fn set_node_user_data(&mut self, id: NodeId, data: Value) -> Result<Value, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.user_data, data))
    }

    pub fn set_display_mode(
        &mut self,
        id: NodeId,
        mode: DisplayMode,
    ) -> Result<DisplayMode, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.display_mode, mode))
    }

    pub fn set_node_state(&mut self, id: NodeId, state: NodeState) -> Result<NodeState, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.state, state))
    }

    pub fn set_node_size(&mut self, id: NodeId, size: Vec2) -> Result<Vec2, GraphError> {
        let node = self.nodes.get_mut(&id).ok_or(GraphError::NodeNotFound(id))?;
        Ok(std::mem::replace(&mut node.size, size))
    }

    // ---- port lifecycle ---------------------------------------------------

    /// Adds a dynamic port to a node that allows them.
    pub fn add_port(
        &mut self,
        node_id: NodeId,
        definition: &PortDefinition,
    ) -> Result<PortId, GraphError> {
        let allow = self
            .nodes
            .get(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?
            .allow_dynamic_ports;
        if !allow {
            return Err(GraphError::DynamicPortsNotAllowed(node_id));
        }

        let port_id = self.fresh_port_id();
        let port = Port::from_definition(port_id, node_id, definition);
        self.port_owner.insert(port_id, node_id);
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.ports.push(port);
        }
        if let Some(port) = self.port(port_id) {
            self.events.port_added.emit(port);
        }
        Ok(port_id)
    }

    /// Re-inserts a previously removed port with its original id. Command
    /// entry point: skips the dynamic-ports gate.
    pub fn add_port_direct(&mut self, port: Port) -> Result<PortId, GraphError> {
        if self.port_owner.contains_key(&port.id) {
            return Err(GraphError::DuplicateId(port.id.to_string()));
        }
        if !self.nodes.contains_key(&port.node) {
            return Err(GraphError::NodeNotFound(port.node));
        }

        let port_id = port.id;
        let node_id = port.node;
        self.port_owner.insert(port_id, node_id);
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.ports.push(port);
        }
        if let Some(port) = self.port(port_id) {
            self.events.port_added.emit(port);
        }
        Ok(port_id)
    }

    /// Removes a dynamic port, cascading its edges. Returns the port and the
    /// removed edges.
    pub fn remove_port(&mut self, port_id: PortId) -> Result<(Port, Vec<Edge>), GraphError> {
        let node_id = *self
            .port_owner
            .get(&port_id)
            .ok_or(GraphError::PortNotFound(port_id))?;
        let allow = self
            .nodes
            .get(&node_id)
            .is_some_and(|n| n.allow_dynamic_ports);
        if !allow {
            return Err(GraphError::DynamicPortsNotAllowed(node_id));
        }

        let edge_ids: Vec<EdgeId> = self.edge_ids_for_port(port_id).to_vec();
        let mut removed_edges = Vec::with_capacity(edge_ids.len());
        for edge_id in edge_ids {
            if let Some(edge) = self.remove_edge_internal(edge_id) {
                removed_edges.push(edge);
            }
        }

        if let Some(port) = self.port(port_id) {
            self.events.port_removed.emit(port);
        }

        self.port_owner.remove(&port_id);
        self.port_edges.remove(&port_id);
        let port = self
            .nodes
            .get_mut(&node_id)
            .and_then(|node| {
                let index = node.ports.iter().position(|p| p.id == port_id)?;
                Some(node.ports.remove(index))
            })
            .ok_or(GraphError::PortNotFound(port_id))?;
        Ok((port, removed_edges))
    }

    /// Changes a port's display name. The semantic id stays fixed.
    pub fn rename_port(&mut self, port_id: PortId, name: &str) -> Result<String, GraphError> {
        let node_id = *self
            .port_owner
            .get(&port_id)
            .ok_or(GraphError::PortNotFound(port_id))?;
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::PortNotFound(port_id))?;
        let port = node
            .ports
            .iter_mut()
            .find(|p| p.id == port_id)
            .ok_or(GraphError::PortNotFound(port_id))?;
        Ok(std::mem::replace(&mut port.name, name.to_string()))
    }

    // ---- edge lifecycle ---------------------------------------------------

    /// Validates and creates an edge. Endpoints are normalized
    /// (Output→Input) unless the attempt is an internal bridge, a full
    /// Single input has its existing edge displaced, and the configured
    /// policy gets the final word.
    ///
    /// Policy rejection is not an error: the outcome carries the rejection
    /// status and nothing is mutated. Unknown port ids are API misuse.
    pub fn connect(&mut self, source: PortId, target: PortId) -> Result<ConnectOutcome, GraphError> {
        if self.port(source).is_none() {
            return Err(GraphError::PortNotFound(source));
        }
        if self.port(target).is_none() {
            return Err(GraphError::PortNotFound(target));
        }

        let bridge = self.is_internal_bridge(source, target);
        let (source, target) = policy::normalize_endpoints(self, source, target);
        let status = self.settings.policy.can_connect(self, source, target);
        if !status.is_success() {
            return Ok(ConnectOutcome::rejected(status));
        }

        let (target_capacity, target_node) = {
            let Some(port) = self.port(target) else {
                return Err(GraphError::PortNotFound(target));
            };
            (port.capacity, port.node)
        };
        // Bridges waive capacity entirely, so nothing is displaced there.
        let mut displaced = None;
        if !bridge
            && target_capacity == PortCapacity::Single
            && !self.is_boundary_node(target_node)
        {
            let existing = self.edge_ids_for_port(target).first().copied();
            if let Some(edge_id) = existing {
                displaced = self.remove_edge_internal(edge_id);
            }
        }

        let edge_id = self.fresh_edge_id();
        self.edges.insert(edge_id, Edge::new(edge_id, source, target));
        self.port_edges.entry(source).or_default().push(edge_id);
        self.port_edges.entry(target).or_default().push(edge_id);
        if let Some(edge) = self.edges.get(&edge_id) {
            self.events.edge_added.emit(edge);
        }
        tracing::debug!(edge = %edge_id, displaced = displaced.is_some(), "edge connected");

        Ok(ConnectOutcome {
            status: ConnectionResult::Success,
            created: Some(edge_id),
            displaced,
        })
    }

    /// Inserts an edge as-is, skipping policy. Command/deserializer entry
    /// point.
    pub fn add_edge_direct(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        if self.edges.contains_key(&edge.id) {
            return Err(GraphError::DuplicateId(edge.id.to_string()));
        }
        if !self.port_owner.contains_key(&edge.source_port) {
            return Err(GraphError::PortNotFound(edge.source_port));
        }
        if !self.port_owner.contains_key(&edge.target_port) {
            return Err(GraphError::PortNotFound(edge.target_port));
        }

        let id = edge.id;
        let (source, target) = (edge.source_port, edge.target_port);
        self.edges.insert(id, edge);
        self.port_edges.entry(source).or_default().push(id);
        self.port_edges.entry(target).or_default().push(id);
        if let Some(edge) = self.edges.get(&id) {
            self.events.edge_added.emit(edge);
        }
        Ok(id)
    }

    /// Removes an edge, returning it.
    pub fn disconnect(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        self.remove_edge_internal(id)
            .ok_or(GraphError::EdgeNotFound(id))
    }

    /// The one edge-removal path: raises `edge_removed` while the edge still
    /// resolves, then drops it from the arena and both index entries.
    fn remove_edge_internal(&mut self, id: EdgeId) -> Option<Edge> {
        if let Some(edge) = self.edges.get(&id) {
            self.events.edge_removed.emit(edge);
        } else {
            return None;
        }
        let edge = self.edges.shift_remove(&id)?;
        if let Some(edges) = self.port_edges.get_mut(&edge.source_port) {
            edges.retain(|e| *e != id);
        }
        if let Some(edges) = self.port_edges.get_mut(&edge.target_port) {
            edges.retain(|e| *e != id);
        }
        Some(edge)
    }

    // ---- groups, frames, comments ----------------------------------------

    /// Builds a group around the given nodes and auto-fits its bounds.
    pub fn create_group(
        &mut self,
        title: &str,
        nodes: &[NodeId],
    ) -> Result<GroupId, GraphError> {
        for node in nodes {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::NodeNotFound(*node));
            }
        }
        let id = self.fresh_group_id();
        let mut group = NodeGroup::new(id, title);
        group.contained.extend(nodes.iter().copied());
        group.auto_fit(self, crate::math::CONTAINER_PADDING);
        self.add_group_direct(group)
    }

    pub fn add_group_direct(&mut self, group: NodeGroup) -> Result<GroupId, GraphError> {
        if self.groups.contains_key(&group.id) {
            return Err(GraphError::DuplicateId(group.id.to_string()));
        }
        for node in &group.contained {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::NodeNotFound(*node));
            }
        }
        let id = group.id;
        self.groups.insert(id, group);
        Ok(id)
    }

    pub fn remove_group(&mut self, id: GroupId) -> Result<NodeGroup, GraphError> {
        self.groups
            .shift_remove(&id)
            .ok_or(GraphError::GroupNotFound(id))
    }

    pub fn add_node_to_group(&mut self, group: GroupId, node: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        let group = self
            .groups
            .get_mut(&group)
            .ok_or(GraphError::GroupNotFound(group))?;
        group.contained.insert(node);
        Ok(())
    }

    pub fn remove_node_from_group(
        &mut self,
        group: GroupId,
        node: NodeId,
    ) -> Result<bool, GraphError> {
        let group = self
            .groups
            .get_mut(&group)
            .ok_or(GraphError::GroupNotFound(group))?;
        Ok(group.contained.shift_remove(&node))
    }

    pub fn add_frame_direct(&mut self, frame: SubGraphFrame) -> Result<FrameId, GraphError> {
        if self.frames.contains_key(&frame.id) {
            return Err(GraphError::DuplicateId(frame.id.to_string()));
        }
        if !self.is_boundary_node(frame.representative) {
            return Err(GraphError::NotABoundaryNode(frame.representative));
        }
        if frame.contained.contains(&frame.representative)
            || self.frame_containing(frame.representative).is_some()
        {
            return Err(GraphError::RepresentativeNotContainable(frame.representative));
        }
        for node in &frame.contained {
            if !self.nodes.contains_key(node) {
                return Err(GraphError::NodeNotFound(*node));
            }
            if self.is_boundary_node(*node) {
                return Err(GraphError::RepresentativeNotContainable(*node));
            }
            if self.frame_containing(*node).is_some() {
                return Err(GraphError::NodeAlreadyFramed(*node));
            }
        }
        let id = frame.id;
        self.frames.insert(id, frame);
        Ok(id)
    }

    /// Removes the frame itself; its contents stay in the graph.
    pub fn remove_frame(&mut self, id: FrameId) -> Result<SubGraphFrame, GraphError> {
        self.frames
            .shift_remove(&id)
            .ok_or(GraphError::FrameNotFound(id))
    }

    pub fn add_node_to_frame(&mut self, frame: FrameId, node: NodeId) -> Result<(), GraphError> {
        if !self.nodes.contains_key(&node) {
            return Err(GraphError::NodeNotFound(node));
        }
        if self.is_boundary_node(node) {
            return Err(GraphError::RepresentativeNotContainable(node));
        }
        if let Some(existing) = self.frame_containing(node)
            && existing.id != frame
        {
            return Err(GraphError::NodeAlreadyFramed(node));
        }
        let frame = self
            .frames
            .get_mut(&frame)
            .ok_or(GraphError::FrameNotFound(frame))?;
        frame.contained.insert(node);
        Ok(())
    }

    pub fn remove_node_from_frame(
        &mut self,
        frame: FrameId,
        node: NodeId,
    ) -> Result<bool, GraphError> {
        let frame = self
            .frames
            .get_mut(&frame)
            .ok_or(GraphError::FrameNotFound(frame))?;
        Ok(frame.contained.shift_remove(&node))
    }

    /// Sets the collapsed flag, returning the previous value.
    pub fn set_frame_collapsed(&mut self, id: FrameId, collapsed: bool) -> Result<bool, GraphError> {
        let frame = self.frames.get_mut(&id).ok_or(GraphError::FrameNotFound(id))?;
        Ok(std::mem::replace(&mut frame.is_collapsed, collapsed))
    }

    /// Builds a comment at the given bounds.
    pub fn create_comment(&mut self, bounds: crate::math::Rect, text: &str) -> Result<CommentId, GraphError> {
        let id = self.fresh_comment_id();
        self.add_comment_direct(GraphComment::new(id, bounds, text))
    }

    pub fn add_comment_direct(&mut self, comment: GraphComment) -> Result<CommentId, GraphError> {
        if self.comments.contains_key(&comment.id) {
            return Err(GraphError::DuplicateId(comment.id.to_string()));
        }
        let id = comment.id;
        self.comments.insert(id, comment);
        Ok(id)
    }

    pub fn remove_comment(&mut self, id: CommentId) -> Result<GraphComment, GraphError> {
        self.comments
            .shift_remove(&id)
            .ok_or(GraphError::CommentNotFound(id))
    }

    /// Replaces an edge's payload, returning the previous one.
    pub fn set_edge_user_data(&mut self, id: EdgeId, data: Value) -> Result<Value, GraphError> {
        let edge = self.edges.get_mut(&id).ok_or(GraphError::EdgeNotFound(id))?;
        Ok(std::mem::replace(&mut edge.user_data, data))
    }

    /// Drops every entity and index. Signals are kept; no per-entity events
    /// fire.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.groups.clear();
        self.frames.clear();
        self.comments.clear();
        self.port_owner.clear();
        self.port_edges.clear();
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("topology", &self.settings.topology)
            .field("nodes", &self.nodes.len())
            .field("edges", &self.edges.len())
            .field("groups", &self.groups.len())
            .field("frames", &self.frames.len())
            .field("comments", &self.comments.len())
            .finish()
    }
}
