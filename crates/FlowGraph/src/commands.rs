//! # Built-in Commands
//!
//! One command per user-visible mutation. Each snapshots whatever its undo
//! needs on first execution and re-inserts through the graph's direct paths
//! afterwards, so redo restores the exact ids the first run produced.

use glam::Vec2;
use serde_json::Value;

use crate::command::Command;
use crate::decorations::{GraphComment, NodeGroup, SubGraphFrame};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::id::{CommentId, EdgeId, FrameId, GroupId, NodeId, PortId};
use crate::math::Rect;
use crate::model::{DisplayMode, Edge, Node, Port, PortDefinition};
use crate::persistence::GraphDocument;
use crate::subgraph;

/// Creates a node of a registered type.
pub struct AddNodeCommand {
    description: String,
    type_id: String,
    position: Vec2,
    created: Option<Node>,
}

impl AddNodeCommand {
    pub fn new(type_id: &str, position: Vec2) -> Self {
        Self {
            description: format!("Add {type_id}"),
            type_id: type_id.to_string(),
            position,
            created: None,
        }
    }

    /// Id of the node created by the first execution.
    pub fn node_id(&self) -> Option<NodeId> {
        self.created.as_ref().map(|n| n.id)
    }
}

impl Command for AddNodeCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(node) => {
                graph.add_node_direct(node.clone())?;
            }
            None => {
                let id = graph.add_node(&self.type_id, self.position)?;
                self.created = graph.node(id).cloned();
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let node = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.remove_node(node.id)?;
        Ok(())
    }
}

struct RemovedNodeSnapshot {
    node: Node,
    edges: Vec<Edge>,
    groups: Vec<GroupId>,
    frame: Option<FrameId>,
}

/// Removes a node with all its edges; undo restores everything, membership
/// included.
pub struct RemoveNodeCommand {
    description: String,
    node_id: NodeId,
    removed: Option<RemovedNodeSnapshot>,
}

impl RemoveNodeCommand {
    pub fn new(node_id: NodeId) -> Self {
        Self {
            description: "Remove Node".to_string(),
            node_id,
            removed: None,
        }
    }
}

impl Command for RemoveNodeCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        if self.removed.is_none() {
            let node = graph
                .node(self.node_id)
                .cloned()
                .ok_or(GraphError::NodeNotFound(self.node_id))?;
            let edges = graph
                .edge_ids_for_node(self.node_id)
                .into_iter()
                .filter_map(|id| graph.edge(id).cloned())
                .collect();
            let groups = graph
                .groups()
                .filter(|g| g.contained.contains(&self.node_id))
                .map(|g| g.id)
                .collect();
            let frame = graph.scope_of(self.node_id);
            self.removed = Some(RemovedNodeSnapshot {
                node,
                edges,
                groups,
                frame,
            });
        }
        graph.remove_node(self.node_id)?;
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let snapshot = self.removed.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.add_node_direct(snapshot.node.clone())?;
        for group in &snapshot.groups {
            graph.add_node_to_group(*group, self.node_id)?;
        }
        if let Some(frame) = snapshot.frame {
            graph.add_node_to_frame(frame, self.node_id)?;
        }
        for edge in &snapshot.edges {
            graph.add_edge_direct(edge.clone())?;
        }
        Ok(())
    }
}

/// Repositions a node.
pub struct MoveNodeCommand {
    description: String,
    node_id: NodeId,
    to: Vec2,
    from: Option<Vec2>,
}

impl MoveNodeCommand {
    pub fn new(node_id: NodeId, to: Vec2) -> Self {
        Self {
            description: "Move Node".to_string(),
            node_id,
            to,
            from: None,
        }
    }
}

impl Command for MoveNodeCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = graph.move_node(self.node_id, self.to)?;
        if self.from.is_none() {
            self.from = Some(old);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let from = self.from.ok_or(GraphError::CommandNotExecuted)?;
        graph.move_node(self.node_id, from)?;
        Ok(())
    }
}

/// Connects two ports. A rejected attempt fails the command (and is not
/// recorded); the rejection status rides in the error.
pub struct ConnectCommand {
    description: String,
    source: PortId,
    target: PortId,
    created: Option<Edge>,
    displaced: Option<Edge>,
}

impl ConnectCommand {
    pub fn new(source: PortId, target: PortId) -> Self {
        Self {
            description: "Connect".to_string(),
            source,
            target,
            created: None,
            displaced: None,
        }
    }

    pub fn edge_id(&self) -> Option<EdgeId> {
        self.created.as_ref().map(|e| e.id)
    }
}

impl Command for ConnectCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(edge) => {
                // Redo: replay the displacement, then restore the edge.
                if let Some(displaced) = &self.displaced {
                    graph.disconnect(displaced.id)?;
                }
                graph.add_edge_direct(edge.clone())?;
            }
            None => {
                let outcome = graph.connect(self.source, self.target)?;
                let Some(edge_id) = outcome.created else {
                    return Err(GraphError::ConnectionRejected(outcome.status));
                };
                self.created = graph.edge(edge_id).cloned();
                self.displaced = outcome.displaced;
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let edge = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.disconnect(edge.id)?;
        if let Some(displaced) = &self.displaced {
            graph.add_edge_direct(displaced.clone())?;
        }
        Ok(())
    }
}

/// Removes an edge.
pub struct DisconnectCommand {
    description: String,
    edge_id: EdgeId,
    removed: Option<Edge>,
}

impl DisconnectCommand {
    pub fn new(edge_id: EdgeId) -> Self {
        Self {
            description: "Disconnect".to_string(),
            edge_id,
            removed: None,
        }
    }
}

impl Command for DisconnectCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let edge = graph.disconnect(self.edge_id)?;
        if self.removed.is_none() {
            self.removed = Some(edge);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let edge = self.removed.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.add_edge_direct(edge.clone())?;
        Ok(())
    }
}

/// Adds a dynamic port to a node.
pub struct AddPortCommand {
    description: String,
    node_id: NodeId,
    definition: PortDefinition,
    created: Option<Port>,
}

impl AddPortCommand {
    pub fn new(node_id: NodeId, definition: PortDefinition) -> Self {
        Self {
            description: format!("Add Port {}", definition.name),
            node_id,
            definition,
            created: None,
        }
    }

    pub fn port_id(&self) -> Option<PortId> {
        self.created.as_ref().map(|p| p.id)
    }
}

impl Command for AddPortCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(port) => {
                graph.add_port_direct(port.clone())?;
            }
            None => {
                let id = graph.add_port(self.node_id, &self.definition)?;
                self.created = graph.port(id).cloned();
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let port = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.remove_port(port.id)?;
        Ok(())
    }
}

/// Removes a dynamic port, cascading its edges.
pub struct RemovePortCommand {
    description: String,
    port_id: PortId,
    removed: Option<(Port, Vec<Edge>)>,
}

impl RemovePortCommand {
    pub fn new(port_id: PortId) -> Self {
        Self {
            description: "Remove Port".to_string(),
            port_id,
            removed: None,
        }
    }
}

impl Command for RemovePortCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let removed = graph.remove_port(self.port_id)?;
        if self.removed.is_none() {
            self.removed = Some(removed);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let (port, edges) = self.removed.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.add_port_direct(port.clone())?;
        for edge in edges {
            graph.add_edge_direct(edge.clone())?;
        }
        Ok(())
    }
}

/// Replaces a node's opaque payload.
pub struct ChangeNodeDataCommand {
    description: String,
    node_id: NodeId,
    new_data: Value,
    old_data: Option<Value>,
}

impl ChangeNodeDataCommand {
    pub fn new(node_id: NodeId, new_data: Value) -> Self {
        Self {
            description: "Change Node Data".to_string(),
            node_id,
            new_data,
            old_data: None,
        }
    }
}

impl Command for ChangeNodeDataCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = graph.set_node_user_data(self.node_id, self.new_data.clone())?;
        if self.old_data.is_none() {
            self.old_data = Some(old);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = self.old_data.clone().ok_or(GraphError::CommandNotExecuted)?;
        graph.set_node_user_data(self.node_id, old)?;
        Ok(())
    }
}

/// Replaces an edge's opaque payload.
pub struct ChangeEdgeDataCommand {
    description: String,
    edge_id: EdgeId,
    new_data: Value,
    old_data: Option<Value>,
}

impl ChangeEdgeDataCommand {
    pub fn new(edge_id: EdgeId, new_data: Value) -> Self {
        Self {
            description: "Change Edge Data".to_string(),
            edge_id,
            new_data,
            old_data: None,
        }
    }
}

impl Command for ChangeEdgeDataCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = graph.set_edge_user_data(self.edge_id, self.new_data.clone())?;
        if self.old_data.is_none() {
            self.old_data = Some(old);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = self.old_data.clone().ok_or(GraphError::CommandNotExecuted)?;
        graph.set_edge_user_data(self.edge_id, old)?;
        Ok(())
    }
}

/// Wraps nodes in a visual group.
pub struct CreateGroupCommand {
    description: String,
    title: String,
    node_ids: Vec<NodeId>,
    created: Option<NodeGroup>,
}

impl CreateGroupCommand {
    pub fn new(title: &str, node_ids: Vec<NodeId>) -> Self {
        Self {
            description: format!("Group \"{title}\""),
            title: title.to_string(),
            node_ids,
            created: None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.created.as_ref().map(|g| g.id)
    }
}

impl Command for CreateGroupCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(group) => {
                graph.add_group_direct(group.clone())?;
            }
            None => {
                let id = graph.create_group(&self.title, &self.node_ids)?;
                self.created = graph.group(id).cloned();
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let group = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.remove_group(group.id)?;
        Ok(())
    }
}

/// Drops a comment box onto the canvas.
pub struct CreateCommentCommand {
    description: String,
    bounds: Rect,
    text: String,
    created: Option<GraphComment>,
}

impl CreateCommentCommand {
    pub fn new(bounds: Rect, text: &str) -> Self {
        Self {
            description: "Add Comment".to_string(),
            bounds,
            text: text.to_string(),
            created: None,
        }
    }

    pub fn comment_id(&self) -> Option<CommentId> {
        self.created.as_ref().map(|c| c.id)
    }
}

impl Command for CreateCommentCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(comment) => {
                graph.add_comment_direct(comment.clone())?;
            }
            None => {
                let id = graph.create_comment(self.bounds, &self.text)?;
                self.created = graph.comment(id).cloned();
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let comment = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.remove_comment(comment.id)?;
        Ok(())
    }
}

/// Switches a node between Expanded/Collapsed/Minimized.
pub struct ChangeDisplayModeCommand {
    description: String,
    node_id: NodeId,
    mode: DisplayMode,
    old_mode: Option<DisplayMode>,
}

impl ChangeDisplayModeCommand {
    pub fn new(node_id: NodeId, mode: DisplayMode) -> Self {
        Self {
            description: "Change Display Mode".to_string(),
            node_id,
            mode,
            old_mode: None,
        }
    }
}

impl Command for ChangeDisplayModeCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = graph.set_display_mode(self.node_id, self.mode)?;
        if self.old_mode.is_none() {
            self.old_mode = Some(old);
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let old = self.old_mode.ok_or(GraphError::CommandNotExecuted)?;
        graph.set_display_mode(self.node_id, old)?;
        Ok(())
    }
}

/// Collapses or expands a sub-graph frame.
pub struct ToggleSubGraphCollapseCommand {
    description: String,
    frame_id: FrameId,
}

impl ToggleSubGraphCollapseCommand {
    pub fn new(frame_id: FrameId) -> Self {
        Self {
            description: "Toggle Sub-Graph Collapse".to_string(),
            frame_id,
        }
    }

    fn toggle(&self, graph: &mut Graph) -> Result<(), GraphError> {
        let current = graph
            .frame(self.frame_id)
            .ok_or(GraphError::FrameNotFound(self.frame_id))?
            .is_collapsed;
        graph.set_frame_collapsed(self.frame_id, !current)?;
        Ok(())
    }
}

impl Command for ToggleSubGraphCollapseCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        self.toggle(graph)
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        self.toggle(graph)
    }
}

struct SubGraphSnapshot {
    nodes: Vec<Node>,
    representative: Node,
    edges: Vec<Edge>,
    frame: SubGraphFrame,
}

/// Instantiates an asset document as a sub-graph (see
/// [`crate::subgraph::instantiate`]).
pub struct CreateSubGraphCommand {
    description: String,
    asset: GraphDocument,
    title: String,
    offset: Vec2,
    boundary_ports: Option<Vec<PortDefinition>>,
    source_asset: Option<String>,
    created: Option<SubGraphSnapshot>,
}

impl CreateSubGraphCommand {
    pub fn new(asset: GraphDocument, title: &str, offset: Vec2) -> Self {
        Self {
            description: format!("Create Sub-Graph \"{title}\""),
            asset,
            title: title.to_string(),
            offset,
            boundary_ports: None,
            source_asset: None,
            created: None,
        }
    }

    pub fn with_boundary_ports(mut self, ports: Vec<PortDefinition>) -> Self {
        self.boundary_ports = Some(ports);
        self
    }

    pub fn with_source_asset(mut self, asset_id: &str) -> Self {
        self.source_asset = Some(asset_id.to_string());
        self
    }

    pub fn frame_id(&self) -> Option<FrameId> {
        self.created.as_ref().map(|s| s.frame.id)
    }

    pub fn representative_id(&self) -> Option<NodeId> {
        self.created.as_ref().map(|s| s.representative.id)
    }
}

impl Command for CreateSubGraphCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(snapshot) => {
                for node in &snapshot.nodes {
                    graph.add_node_direct(node.clone())?;
                }
                graph.add_node_direct(snapshot.representative.clone())?;
                for edge in &snapshot.edges {
                    graph.add_edge_direct(edge.clone())?;
                }
                graph.add_frame_direct(snapshot.frame.clone())?;
            }
            None => {
                let source = self.asset.to_graph()?;
                let instance = subgraph::instantiate(
                    graph,
                    &source,
                    &self.title,
                    self.offset,
                    self.boundary_ports.as_deref(),
                    self.source_asset.as_deref(),
                )?;
                let nodes = instance
                    .nodes
                    .values()
                    .filter_map(|id| graph.node(*id).cloned())
                    .collect();
                let edges = instance
                    .edges
                    .iter()
                    .filter_map(|id| graph.edge(*id).cloned())
                    .collect();
                let representative = graph
                    .node(instance.representative)
                    .cloned()
                    .ok_or(GraphError::NodeNotFound(instance.representative))?;
                let frame = graph
                    .frame(instance.frame)
                    .cloned()
                    .ok_or(GraphError::FrameNotFound(instance.frame))?;
                self.created = Some(SubGraphSnapshot {
                    nodes,
                    representative,
                    edges,
                    frame,
                });
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let snapshot = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        graph.remove_frame(snapshot.frame.id)?;
        for node in &snapshot.nodes {
            graph.remove_node(node.id)?;
        }
        graph.remove_node(snapshot.representative.id)?;
        Ok(())
    }
}

struct PasteSnapshot {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// Deserializes a clipboard blob and copies its content in at an offset.
/// Pasting never creates a frame; that is [`CreateSubGraphCommand`]'s job.
pub struct PasteCommand {
    description: String,
    clipboard: String,
    offset: Vec2,
    created: Option<PasteSnapshot>,
}

impl PasteCommand {
    pub fn new(clipboard: &str, offset: Vec2) -> Self {
        Self {
            description: "Paste".to_string(),
            clipboard: clipboard.to_string(),
            offset,
            created: None,
        }
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.created
            .as_ref()
            .map(|s| s.nodes.iter().map(|n| n.id).collect())
            .unwrap_or_default()
    }
}

impl Command for PasteCommand {
    fn description(&self) -> &str {
        &self.description
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        match &self.created {
            Some(snapshot) => {
                for node in &snapshot.nodes {
                    graph.add_node_direct(node.clone())?;
                }
                for edge in &snapshot.edges {
                    graph.add_edge_direct(edge.clone())?;
                }
            }
            None => {
                let document = GraphDocument::from_json(&self.clipboard).ok_or_else(|| {
                    GraphError::MalformedDocument("clipboard blob".to_string())
                })?;
                let source = document.to_graph()?;
                let copied = subgraph::copy_into(graph, &source, self.offset)?;
                let nodes = copied
                    .nodes
                    .values()
                    .filter_map(|id| graph.node(*id).cloned())
                    .collect();
                let edges = copied
                    .edges
                    .iter()
                    .filter_map(|id| graph.edge(*id).cloned())
                    .collect();
                self.created = Some(PasteSnapshot { nodes, edges });
            }
        }
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<(), GraphError> {
        let snapshot = self.created.as_ref().ok_or(GraphError::CommandNotExecuted)?;
        for node in &snapshot.nodes {
            graph.remove_node(node.id)?;
        }
        Ok(())
    }
}
