//! # Persistence
//!
//! The portable JSON exchange representation: a serde document model
//! mirroring the graph structure, plus the [`UserDataSerializer`] seam for
//! domain payloads.
//!
//! Loading never partially mutates a target: documents materialize into a
//! fresh graph which is handed back only when every reference resolved.
//! Malformed input yields `None` and a logged warning.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decorations::{GraphComment, NodeGroup, SubGraphFrame};
use crate::error::GraphError;
use crate::graph::{Graph, GraphSettings, Topology};
use crate::id::{CommentId, EdgeId, FrameId, GraphId, GroupId, NodeId, PortId};
use crate::math::{Color, Rect};
use crate::model::{
    DisplayMode, Edge, Node, Port, PortCapacity, PortDirection, PortKind,
};

/// Converts opaque payloads to and from their persisted string form.
///
/// The graph core stores payloads as JSON values typed externally by the
/// node's type id; hosts with richer domain payloads implement this trait
/// to round-trip them.
pub trait UserDataSerializer {
    fn serialize_node_data(&self, type_id: &str, data: &Value) -> Option<String>;
    fn deserialize_node_data(&self, type_id: &str, raw: &str) -> Option<Value>;
    fn serialize_edge_data(&self, data: &Value) -> Option<String>;
    fn deserialize_edge_data(&self, raw: &str) -> Option<Value>;
}

/// Pass-through serializer for graphs whose payloads are plain JSON.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonUserDataSerializer;

impl UserDataSerializer for JsonUserDataSerializer {
    fn serialize_node_data(&self, _type_id: &str, data: &Value) -> Option<String> {
        serde_json::to_string(data).ok()
    }

    fn deserialize_node_data(&self, _type_id: &str, raw: &str) -> Option<Value> {
        serde_json::from_str(raw).ok()
    }

    fn serialize_edge_data(&self, data: &Value) -> Option<String> {
        serde_json::to_string(data).ok()
    }

    fn deserialize_edge_data(&self, raw: &str) -> Option<Value> {
        serde_json::from_str(raw).ok()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointDocument {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for PointDocument {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<PointDocument> for Vec2 {
    fn from(p: PointDocument) -> Self {
        Vec2::new(p.x, p.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorDocument {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl From<Color> for ColorDocument {
    fn from(c: Color) -> Self {
        Self {
            r: c.x,
            g: c.y,
            b: c.z,
            a: c.w,
        }
    }
}

impl From<ColorDocument> for Color {
    fn from(c: ColorDocument) -> Self {
        Color::new(c.r, c.g, c.b, c.a)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub topology: Topology,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDocument {
    pub id: PortId,
    pub name: String,
    pub semantic_id: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    pub data_type: String,
    pub capacity: PortCapacity,
    pub sort_order: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDocument {
    pub id: NodeId,
    pub type_id: String,
    pub position: PointDocument,
    #[serde(default)]
    pub display_mode: DisplayMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<PointDocument>,
    #[serde(default)]
    pub allow_dynamic_ports: bool,
    #[serde(default)]
    pub ports: Vec<PortDocument>,
    #[serde(default)]
    pub user_data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDocument {
    pub id: EdgeId,
    pub source_port_id: PortId,
    pub target_port_id: PortId,
    #[serde(default)]
    pub user_data: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDocument {
    pub id: GroupId,
    pub bounds: Rect,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<ColorDocument>,
    pub contained_node_ids: Vec<NodeId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameDocument {
    pub id: FrameId,
    pub bounds: Rect,
    pub title: String,
    pub contained_node_ids: Vec<NodeId>,
    pub is_collapsed: bool,
    pub representative_node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_asset_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentDocument {
    pub id: CommentId,
    pub bounds: Rect,
    pub text: String,
    pub font_size: f32,
    pub text_color: ColorDocument,
    pub background_color: ColorDocument,
}

/// The top-level document. Also the clipboard format: a copied fragment is
/// a document with empty decoration lists.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDocument {
    pub id: GraphId,
    pub settings: SettingsDocument,
    pub nodes: Vec<NodeDocument>,
    pub edges: Vec<EdgeDocument>,
    #[serde(default)]
    pub groups: Vec<GroupDocument>,
    #[serde(default)]
    pub sub_graph_frames: Vec<FrameDocument>,
    #[serde(default)]
    pub comments: Vec<CommentDocument>,
}

fn encode_payload(raw: Option<String>) -> Value {
    match raw {
        Some(text) => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        None => Value::Null,
    }
}

fn decode_payload(value: &Value, deserialize: impl Fn(&str) -> Option<Value>) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    // A string entry that is not itself JSON is an opaque blob from a
    // custom serializer; hand it over verbatim.
    if let Value::String(text) = value
        && serde_json::from_str::<Value>(text).is_err()
        && let Some(data) = deserialize(text)
    {
        return data;
    }
    let raw = serde_json::to_string(value).unwrap_or_default();
    match deserialize(&raw) {
        Some(data) => data,
        None => {
            tracing::warn!("payload failed to deserialize; dropping");
            Value::Null
        }
    }
}

impl GraphDocument {
    /// Snapshots a graph with the pass-through payload serializer.
    pub fn from_graph(graph: &Graph) -> Self {
        Self::from_graph_with(graph, &JsonUserDataSerializer)
    }

    pub fn from_graph_with(graph: &Graph, serializer: &dyn UserDataSerializer) -> Self {
        let nodes = graph
            .nodes()
            .map(|node| NodeDocument {
                id: node.id,
                type_id: node.type_id.clone(),
                position: node.position.into(),
                display_mode: node.display_mode,
                size: Some(node.size.into()),
                allow_dynamic_ports: node.allow_dynamic_ports,
                ports: node
                    .ports
                    .iter()
                    .map(|port| PortDocument {
                        id: port.id,
                        name: port.name.clone(),
                        semantic_id: port.semantic_id().to_string(),
                        direction: port.direction,
                        kind: port.kind,
                        data_type: port.data_type.clone(),
                        capacity: port.capacity,
                        sort_order: port.sort_order,
                    })
                    .collect(),
                user_data: if node.user_data.is_null() {
                    Value::Null
                } else {
                    encode_payload(serializer.serialize_node_data(&node.type_id, &node.user_data))
                },
            })
            .collect();

        let edges = graph
            .edges()
            .map(|edge| EdgeDocument {
                id: edge.id,
                source_port_id: edge.source_port,
                target_port_id: edge.target_port,
                user_data: if edge.user_data.is_null() {
                    Value::Null
                } else {
                    encode_payload(serializer.serialize_edge_data(&edge.user_data))
                },
            })
            .collect();

        Self {
            id: graph.id,
            settings: SettingsDocument {
                topology: graph.settings.topology,
            },
            nodes,
            edges,
            groups: graph
                .groups()
                .map(|group| GroupDocument {
                    id: group.id,
                    bounds: group.bounds,
                    title: group.title.clone(),
                    color: Some(group.color.into()),
                    contained_node_ids: group.contained.iter().copied().collect(),
                })
                .collect(),
            sub_graph_frames: graph
                .frames()
                .map(|frame| FrameDocument {
                    id: frame.id,
                    bounds: frame.bounds,
                    title: frame.title.clone(),
                    contained_node_ids: frame.contained.iter().copied().collect(),
                    is_collapsed: frame.is_collapsed,
                    representative_node_id: frame.representative,
                    source_asset_id: frame.source_asset.clone(),
                })
                .collect(),
            comments: graph
                .comments()
                .map(|comment| CommentDocument {
                    id: comment.id,
                    bounds: comment.bounds,
                    text: comment.text.clone(),
                    font_size: comment.font_size,
                    text_color: comment.text_color.into(),
                    background_color: comment.background_color.into(),
                })
                .collect(),
        }
    }

    /// Snapshots only the given nodes and the edges fully inside the
    /// selection. This is the clipboard copy path.
    pub fn from_selection(graph: &Graph, selection: &[NodeId]) -> Self {
        let mut doc = Self {
            id: GraphId::fresh(),
            settings: SettingsDocument {
                topology: graph.settings.topology,
            },
            nodes: Vec::new(),
            edges: Vec::new(),
            groups: Vec::new(),
            sub_graph_frames: Vec::new(),
            comments: Vec::new(),
        };
        let full = Self::from_graph(graph);
        doc.nodes = full
            .nodes
            .into_iter()
            .filter(|n| selection.contains(&n.id))
            .collect();
        let selected_ports: Vec<PortId> = doc
            .nodes
            .iter()
            .flat_map(|n| n.ports.iter().map(|p| p.id))
            .collect();
        doc.edges = full
            .edges
            .into_iter()
            .filter(|e| {
                selected_ports.contains(&e.source_port_id)
                    && selected_ports.contains(&e.target_port_id)
            })
            .collect();
        doc
    }

    /// Parses a document, warning and returning `None` on malformed input.
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str(json) {
            Ok(document) => Some(document),
            Err(error) => {
                tracing::warn!(error = %error, "malformed graph document");
                None
            }
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Materializes the document with the pass-through payload serializer.
    pub fn into_graph(self, settings: GraphSettings) -> Result<Graph, GraphError> {
        self.into_graph_with(settings, &JsonUserDataSerializer)
    }

    /// Materializes the document into a fresh graph, validating every
    /// reference through the direct-add paths. All ids are preserved; ports
    /// are reconstructed from the catalog's default set (matched by
    /// semantic id) when a node document carries none.
    pub fn into_graph_with(
        self,
        mut settings: GraphSettings,
        serializer: &dyn UserDataSerializer,
    ) -> Result<Graph, GraphError> {
        settings.topology = self.settings.topology;
        let mut graph = Graph::with_id(self.id, settings);

        for node_doc in &self.nodes {
            let mut node = Node::new(node_doc.id, &node_doc.type_id, node_doc.position.into());
            node.display_mode = node_doc.display_mode;
            if let Some(size) = node_doc.size {
                node.size = size.into();
            }
            node.allow_dynamic_ports = node_doc.allow_dynamic_ports;
            node.user_data = decode_payload(&node_doc.user_data, |raw| {
                serializer.deserialize_node_data(&node_doc.type_id, raw)
            });

            if node_doc.ports.is_empty() {
                // Older documents omit ports; rebuild them from the type's
                // declared defaults, keyed by semantic id.
                if let Some(definition) = graph.settings.catalog.get(&node_doc.type_id).cloned() {
                    for port_def in &definition.default_ports {
                        let port_id = graph.allocate_port_id();
                        node.ports.push(Port::from_definition(port_id, node.id, port_def));
                    }
                }
            } else {
                for port_doc in &node_doc.ports {
                    node.ports.push(Port::from_parts(
                        port_doc.id,
                        node.id,
                        port_doc.name.clone(),
                        port_doc.semantic_id.clone(),
                        port_doc.direction,
                        port_doc.kind,
                        port_doc.data_type.clone(),
                        port_doc.capacity,
                        port_doc.sort_order,
                    ));
                }
            }
            graph.add_node_direct(node)?;
        }

        for edge_doc in &self.edges {
            let mut edge = Edge::new(edge_doc.id, edge_doc.source_port_id, edge_doc.target_port_id);
            edge.user_data =
                decode_payload(&edge_doc.user_data, |raw| serializer.deserialize_edge_data(raw));
            graph.add_edge_direct(edge)?;
        }

        for group_doc in &self.groups {
            let mut group = NodeGroup::new(group_doc.id, &group_doc.title);
            group.bounds = group_doc.bounds;
            if let Some(color) = group_doc.color {
                group.color = color.into();
            }
            group.contained.extend(group_doc.contained_node_ids.iter().copied());
            graph.add_group_direct(group)?;
        }

        for frame_doc in &self.sub_graph_frames {
            let mut frame =
                SubGraphFrame::new(frame_doc.id, &frame_doc.title, frame_doc.representative_node_id);
            frame.bounds = frame_doc.bounds;
            frame.is_collapsed = frame_doc.is_collapsed;
            frame.source_asset = frame_doc.source_asset_id.clone();
            frame
                .contained
                .extend(frame_doc.contained_node_ids.iter().copied());
            graph.add_frame_direct(frame)?;
        }

        for comment_doc in &self.comments {
            let mut comment = GraphComment::new(comment_doc.id, comment_doc.bounds, &comment_doc.text);
            comment.font_size = comment_doc.font_size;
            comment.text_color = comment_doc.text_color.into();
            comment.background_color = comment_doc.background_color.into();
            graph.add_comment_direct(comment)?;
        }

        Ok(graph)
    }

    /// Materializes with default settings of the document's topology.
    /// Convenience for commands that need a temporary source graph.
    pub fn to_graph(&self) -> Result<Graph, GraphError> {
        self.clone().into_graph(GraphSettings::new(self.settings.topology))
    }
}

/// Parses and materializes in one step, reporting both failure modes as
/// `None` with a logged warning.
pub fn load_graph(json: &str, settings: GraphSettings) -> Option<Graph> {
    let document = GraphDocument::from_json(json)?;
    match document.into_graph(settings) {
        Ok(graph) => Some(graph),
        Err(error) => {
            tracing::warn!(error = %error, "graph document failed validation");
            None
        }
    }
}
