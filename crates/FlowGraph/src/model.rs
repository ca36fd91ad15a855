//! # Core Data Models
//!
//! The primary graph entities: [`Node`], [`Port`], [`Edge`] and the
//! [`PortDefinition`] template used to describe ports from the outside.
//!
//! Entities are plain value types owned by the [`crate::graph::Graph`]; they
//! never hold references to each other, only ids.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::{EdgeId, NodeId, PortId};
use crate::math::Rect;

/// Node type id reserved for sub-graph boundary (representative) nodes.
pub const SUBGRAPH_BOUNDARY_TYPE: &str = "__SubGraphBoundary";

/// Data type name that only connects to itself.
pub const EXEC_TYPE: &str = "exec";
/// Wildcard data type name. The empty string is treated the same way.
pub const ANY_TYPE: &str = "any";

/// Default layout size for freshly created nodes.
pub const DEFAULT_NODE_SIZE: Vec2 = Vec2::new(180.0, 100.0);

/// Which way a port faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// The semantic channel a port participates in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortKind {
    Control,
    Data,
    Event,
}

/// How many edges a port accepts.
///
/// `Single` means at most one; connecting a second edge displaces the first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortCapacity {
    Single,
    Multiple,
}

/// Visual presentation of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Expanded,
    Collapsed,
    Minimized,
}

/// Transient editor state of a node. Not persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeState {
    #[default]
    Normal,
    Selected,
    Highlighted,
    Error,
    Running,
}

/// An immutable template describing a port to be created.
///
/// This is the only way external code should describe a port; the graph
/// turns definitions into [`Port`]s with fresh ids.
#[derive(Clone, Debug, PartialEq)]
pub struct PortDefinition {
    pub name: String,
    pub semantic_id: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    pub data_type: String,
    pub capacity: PortCapacity,
    pub sort_order: i32,
}

impl PortDefinition {
    /// A `Multiple`-capacity definition whose semantic id defaults to `name`.
    pub fn new(name: &str, direction: PortDirection, kind: PortKind, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            semantic_id: name.to_string(),
            direction,
            kind,
            data_type: data_type.to_string(),
            capacity: PortCapacity::Multiple,
            sort_order: 0,
        }
    }

    pub fn single(mut self) -> Self {
        self.capacity = PortCapacity::Single;
        self
    }

    pub fn with_capacity(mut self, capacity: PortCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_semantic_id(mut self, semantic_id: &str) -> Self {
        self.semantic_id = semantic_id.to_string();
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// A Port on a Node.
///
/// Ports are the anchors for edges. The `node` field is a back-reference to
/// the owning node, never ownership.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    /// Self-reference id.
    pub id: PortId,
    /// Id of the node this port belongs to.
    pub node: NodeId,
    /// Mutable display name.
    pub name: String,
    /// Stable identifier used by serialization and export. Defaults to the
    /// name at construction and never changes afterwards.
    semantic_id: String,
    pub direction: PortDirection,
    pub kind: PortKind,
    pub data_type: String,
    pub capacity: PortCapacity,
    pub sort_order: i32,
}

impl Port {
    pub fn from_definition(id: PortId, node: NodeId, definition: &PortDefinition) -> Self {
        Self {
            id,
            node,
            name: definition.name.clone(),
            semantic_id: definition.semantic_id.clone(),
            direction: definition.direction,
            kind: definition.kind,
            data_type: definition.data_type.clone(),
            capacity: definition.capacity,
            sort_order: definition.sort_order,
        }
    }

    /// Reconstructs a port from persisted fields, semantic id included.
    pub(crate) fn from_parts(
        id: PortId,
        node: NodeId,
        name: String,
        semantic_id: String,
        direction: PortDirection,
        kind: PortKind,
        data_type: String,
        capacity: PortCapacity,
        sort_order: i32,
    ) -> Self {
        Self {
            id,
            node,
            name,
            semantic_id,
            direction,
            kind,
            data_type,
            capacity,
            sort_order,
        }
    }

    pub fn semantic_id(&self) -> &str {
        &self.semantic_id
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    pub fn is_output(&self) -> bool {
        self.direction == PortDirection::Output
    }
}

/// A Node in the graph.
///
/// Nodes exclusively own their ports; removing a node removes all of them.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Self-reference id.
    pub id: NodeId,
    /// Registry id of the node's type.
    pub type_id: String,
    /// World-space position of the top-left corner.
    pub position: Vec2,
    /// Size of the node layout.
    pub size: Vec2,
    pub display_mode: DisplayMode,
    pub state: NodeState,
    /// Whether ports may be added/removed after creation.
    pub allow_dynamic_ports: bool,
    /// Opaque domain payload, typed externally by `type_id`.
    pub user_data: Value,
    /// Ordered port list, owned.
    pub ports: Vec<Port>,
}

impl Node {
    pub fn new(id: NodeId, type_id: &str, position: Vec2) -> Self {
        Self {
            id,
            type_id: type_id.to_string(),
            position,
            size: DEFAULT_NODE_SIZE,
            display_mode: DisplayMode::default(),
            state: NodeState::default(),
            allow_dynamic_ports: false,
            user_data: Value::Null,
            ports: Vec::new(),
        }
    }

    pub fn is_boundary(&self) -> bool {
        self.type_id == SUBGRAPH_BOUNDARY_TYPE
    }

    pub fn find_port(&self, id: PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id == id)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_input())
    }

    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_output())
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_pos_size(self.position, self.size)
    }
}

/// A directed connection between two ports.
///
/// After normalization `source_port` is an Output and `target_port` an
/// Input — except for internal bridge edges to a sub-graph boundary, which
/// keep the direction the user drew.
#[derive(Clone, Debug, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    pub source_port: PortId,
    pub target_port: PortId,
    /// Opaque domain payload.
    pub user_data: Value,
}

impl Edge {
    pub fn new(id: EdgeId, source_port: PortId, target_port: PortId) -> Self {
        Self {
            id,
            source_port,
            target_port,
            user_data: Value::Null,
        }
    }

    /// True when `port` is one of the two endpoints.
    pub fn touches(&self, port: PortId) -> bool {
        self.source_port == port || self.target_port == port
    }
}
