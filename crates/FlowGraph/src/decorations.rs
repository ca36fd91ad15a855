//! # Decorations
//!
//! Visual containers and annotations layered over the node graph: groups
//! (purely visual, non-partitioning), sub-graph frames (containment with a
//! boundary) and comments.

use indexmap::IndexSet;

use crate::graph::Graph;
use crate::id::{CommentId, FrameId, GroupId, NodeId};
use crate::math::{Color, Rect, TITLE_BAR_HEIGHT};

/// A purely visual container. Groups never partition the graph: a node may
/// sit in any number of groups.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeGroup {
    pub id: GroupId,
    pub bounds: Rect,
    pub title: String,
    pub color: Color,
    pub contained: IndexSet<NodeId>,
}

impl NodeGroup {
    pub fn new(id: GroupId, title: &str) -> Self {
        Self {
            id,
            bounds: Rect::ZERO,
            title: title.to_string(),
            color: Color::new(0.25, 0.3, 0.4, 0.35),
            contained: IndexSet::new(),
        }
    }

    /// Recomputes the bounds to encapsulate all contained nodes, expanded by
    /// `padding` plus the reserved title-bar height.
    pub fn auto_fit(&mut self, graph: &Graph, padding: f32) {
        if let Some(bounds) = fit_bounds(graph, self.contained.iter().copied(), padding) {
            self.bounds = bounds;
        }
    }
}

/// A containment container with a boundary: the contained nodes form a
/// sub-graph whose external interface is the representative node's ports.
#[derive(Clone, Debug, PartialEq)]
pub struct SubGraphFrame {
    pub id: FrameId,
    pub bounds: Rect,
    pub title: String,
    pub contained: IndexSet<NodeId>,
    pub is_collapsed: bool,
    /// The real node (type `__SubGraphBoundary`) carrying the boundary ports.
    pub representative: NodeId,
    /// Id of the source asset this frame was instantiated from, if any.
    pub source_asset: Option<String>,
}

impl SubGraphFrame {
    pub fn new(id: FrameId, title: &str, representative: NodeId) -> Self {
        Self {
            id,
            bounds: Rect::ZERO,
            title: title.to_string(),
            contained: IndexSet::new(),
            is_collapsed: false,
            representative,
            source_asset: None,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.contained.contains(&node)
    }

    /// Recomputes the bounds to encapsulate all contained nodes, expanded by
    /// `padding` plus the reserved title-bar height.
    pub fn auto_fit(&mut self, graph: &Graph, padding: f32) {
        if let Some(bounds) = fit_bounds(graph, self.contained.iter().copied(), padding) {
            self.bounds = bounds;
        }
    }
}

/// A free-floating text annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphComment {
    pub id: CommentId,
    pub bounds: Rect,
    pub text: String,
    pub font_size: f32,
    pub text_color: Color,
    pub background_color: Color,
}

impl GraphComment {
    pub fn new(id: CommentId, bounds: Rect, text: &str) -> Self {
        Self {
            id,
            bounds,
            text: text.to_string(),
            font_size: 14.0,
            text_color: Color::new(0.9, 0.9, 0.9, 1.0),
            background_color: Color::new(0.2, 0.2, 0.1, 0.8),
        }
    }
}

/// A borrowed view over either container kind, for operations that iterate
/// "all containers" regardless of flavor.
#[derive(Clone, Copy, Debug)]
pub enum ContainerRef<'a> {
    Group(&'a NodeGroup),
    Frame(&'a SubGraphFrame),
}

impl ContainerRef<'_> {
    pub fn bounds(&self) -> Rect {
        match self {
            ContainerRef::Group(g) => g.bounds,
            ContainerRef::Frame(f) => f.bounds,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ContainerRef::Group(g) => &g.title,
            ContainerRef::Frame(f) => &f.title,
        }
    }

    pub fn contains(&self, node: NodeId) -> bool {
        match self {
            ContainerRef::Group(g) => g.contained.contains(&node),
            ContainerRef::Frame(f) => f.contained.contains(&node),
        }
    }
}

/// Encapsulating rectangle of the given nodes, expanded by `padding` with
/// title-bar space reserved on top. `None` when no node produces a bound.
pub fn fit_bounds(
    graph: &Graph,
    nodes: impl IntoIterator<Item = NodeId>,
    padding: f32,
) -> Option<Rect> {
    let mut union: Option<Rect> = None;
    for id in nodes {
        if let Some(node) = graph.node(id) {
            let b = node.bounds();
            union = Some(match union {
                Some(u) => u.union(&b),
                None => b,
            });
        }
    }
    union.map(|u| u.expanded(padding).with_title_bar(TITLE_BAR_HEIGHT))
}
