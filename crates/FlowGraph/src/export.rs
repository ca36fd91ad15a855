//! # Export Flattener
//!
//! Collapses a graph's sub-graph frames into a flat actions + transitions
//! model for downstream consumers: boundary nodes are elided and edges are
//! stitched through them, many-to-many. Structural and configurable
//! validation findings ride along as severity-tagged messages; export is
//! best-effort and callers inspect the messages before consuming.

use indexmap::IndexSet;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::graph::Graph;
use crate::id::{NodeId, PortId};
use crate::model::{Port, PortDirection};

/// Prefix marking a string property as a scene-binding reference.
pub const SCENE_BINDING_PREFIX: &str = "scene://";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, Serialize)]
pub struct ValidationMessage {
    pub severity: Severity,
    pub rule: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<NodeId>,
}

impl ValidationMessage {
    pub fn new(severity: Severity, rule: &str, message: String, node: Option<NodeId>) -> Self {
        Self {
            severity,
            rule: rule.to_string(),
            message,
            node,
        }
    }
}

/// One flattened property of an action's payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyEntry {
    pub key: String,
    pub value: String,
    pub value_type: String,
}

/// A scene-binding reference extracted from an action's payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BindingRef {
    pub property: String,
    pub target: String,
}

/// A non-boundary node in the flat model.
#[derive(Clone, Debug, Serialize)]
pub struct ActionEntry {
    pub id: NodeId,
    pub type_id: String,
    pub properties: Vec<PropertyEntry>,
    pub bindings: Vec<BindingRef>,
}

/// A stitched edge in the flat model. Port fields carry semantic ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct TransitionEntry {
    pub from_node: NodeId,
    pub from_port: String,
    pub to_node: NodeId,
    pub to_port: String,
}

/// The flat export model.
#[derive(Debug, Serialize)]
pub struct ExportModel {
    pub blueprint_id: String,
    pub blueprint_name: String,
    pub version: String,
    pub actions: Vec<ActionEntry>,
    pub transitions: Vec<TransitionEntry>,
    pub messages: Vec<ValidationMessage>,
}

impl ExportModel {
    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|m| m.severity == Severity::Error)
    }
}

/// A pluggable validation rule run during export. Rules carry their own
/// severity.
pub trait ExportRule {
    fn name(&self) -> &str;
    fn check(&self, graph: &Graph) -> Vec<ValidationMessage>;
}

/// Requires a payload property on every node of a type.
pub struct PropertyRequired {
    pub type_id: String,
    pub property: String,
    pub severity: Severity,
}

impl ExportRule for PropertyRequired {
    fn name(&self) -> &str {
        "PropertyRequired"
    }

    fn check(&self, graph: &Graph) -> Vec<ValidationMessage> {
        graph
            .nodes()
            .filter(|n| n.type_id == self.type_id)
            .filter(|n| n.user_data.get(&self.property).is_none())
            .map(|n| {
                ValidationMessage::new(
                    self.severity,
                    self.name(),
                    format!("node of type {} is missing property '{}'", self.type_id, self.property),
                    Some(n.id),
                )
            })
            .collect()
    }
}

/// Requires at least one scene-binding reference on every node of a type.
pub struct BindingRequired {
    pub type_id: String,
    pub severity: Severity,
}

impl ExportRule for BindingRequired {
    fn name(&self) -> &str {
        "BindingRequired"
    }

    fn check(&self, graph: &Graph) -> Vec<ValidationMessage> {
        graph
            .nodes()
            .filter(|n| n.type_id == self.type_id)
            .filter(|n| extract_bindings(&n.user_data).is_empty())
            .map(|n| {
                ValidationMessage::new(
                    self.severity,
                    self.name(),
                    format!("node of type {} has no scene binding", self.type_id),
                    Some(n.id),
                )
            })
            .collect()
    }
}

/// Flags sub-graph frames containing fewer than `min` nodes.
pub struct MinNodesInSubGraph {
    pub min: usize,
    pub severity: Severity,
}

impl ExportRule for MinNodesInSubGraph {
    fn name(&self) -> &str {
        "MinNodesInSubGraph"
    }

    fn check(&self, graph: &Graph) -> Vec<ValidationMessage> {
        graph
            .frames()
            .filter(|f| f.contained.len() < self.min)
            .map(|f| {
                ValidationMessage::new(
                    self.severity,
                    self.name(),
                    format!(
                        "sub-graph \"{}\" contains {} nodes, fewer than {}",
                        f.title,
                        f.contained.len(),
                        self.min
                    ),
                    None,
                )
            })
            .collect()
    }
}

/// Configured flattener: blueprint naming, optional designated entry type,
/// pluggable rule set.
pub struct Exporter {
    pub blueprint_name: String,
    pub version: String,
    entry_type: Option<String>,
    rules: Vec<Box<dyn ExportRule>>,
}

impl Exporter {
    pub fn new(blueprint_name: &str) -> Self {
        Self {
            blueprint_name: blueprint_name.to_string(),
            version: "1.0".to_string(),
            entry_type: None,
            rules: Vec::new(),
        }
    }

    /// Requires exactly one node of this type (e.g. `Flow.Start`).
    pub fn with_entry_type(mut self, type_id: &str) -> Self {
        self.entry_type = Some(type_id.to_string());
        self
    }

    pub fn add_rule(&mut self, rule: Box<dyn ExportRule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: Box<dyn ExportRule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Flattens the graph. Always produces a model; findings are reported
    /// in `messages`.
    pub fn export(&self, graph: &Graph) -> ExportModel {
        let mut messages = Vec::new();

        let actions: Vec<ActionEntry> = graph
            .nodes()
            .filter(|n| !n.is_boundary())
            .map(|n| ActionEntry {
                id: n.id,
                type_id: n.type_id.clone(),
                properties: flatten_properties(&n.user_data),
                bindings: extract_bindings(&n.user_data),
            })
            .collect();

        let transitions = self.stitch_transitions(graph);
        self.validate(graph, &mut messages);
        for rule in &self.rules {
            messages.extend(rule.check(graph));
        }

        if !messages.is_empty() {
            tracing::warn!(
                blueprint = self.blueprint_name,
                findings = messages.len(),
                "export produced validation findings"
            );
        }

        ExportModel {
            blueprint_id: graph.id.to_string(),
            blueprint_name: self.blueprint_name.clone(),
            version: self.version.clone(),
            actions,
            transitions,
            messages,
        }
    }

    fn stitch_transitions(&self, graph: &Graph) -> Vec<TransitionEntry> {
        let is_boundary_port =
            |port: PortId| graph.port_node(port).is_some_and(|n| n.is_boundary());

        // Accumulate the real ports on the far side of each boundary port.
        let mut incoming_to_boundary: HashMap<PortId, Vec<PortId>> = HashMap::new();
        let mut outgoing_from_boundary: HashMap<PortId, Vec<PortId>> = HashMap::new();
        for edge in graph.edges() {
            let source_boundary = is_boundary_port(edge.source_port);
            let target_boundary = is_boundary_port(edge.target_port);
            if target_boundary && !source_boundary {
                incoming_to_boundary
                    .entry(edge.target_port)
                    .or_default()
                    .push(edge.source_port);
            }
            if source_boundary && !target_boundary {
                outgoing_from_boundary
                    .entry(edge.source_port)
                    .or_default()
                    .push(edge.target_port);
            }
        }

        // The two stitching cases each see a path from one side, so emitted
        // transitions are deduplicated.
        let mut seen: IndexSet<TransitionEntry> = IndexSet::new();
        for edge in graph.edges() {
            let source_boundary = is_boundary_port(edge.source_port);
            let target_boundary = is_boundary_port(edge.target_port);
            match (source_boundary, target_boundary) {
                (false, false) => {
                    if let Some(t) = self.transition(graph, edge.source_port, edge.target_port) {
                        seen.insert(t);
                    }
                }
                (true, false) => {
                    if let Some(sources) = incoming_to_boundary.get(&edge.source_port) {
                        for source in sources {
                            if let Some(t) = self.transition(graph, *source, edge.target_port) {
                                seen.insert(t);
                            }
                        }
                    }
                }
                (false, true) => {
                    if let Some(targets) = outgoing_from_boundary.get(&edge.target_port) {
                        for target in targets {
                            if let Some(t) = self.transition(graph, edge.source_port, *target) {
                                seen.insert(t);
                            }
                        }
                    }
                }
                // Boundary-to-boundary: the neighboring cases already
                // stitched through.
                (true, true) => {}
            }
        }
        seen.into_iter().collect()
    }

    fn transition(&self, graph: &Graph, from: PortId, to: PortId) -> Option<TransitionEntry> {
        let from_port = graph.port(from)?;
        let to_port = graph.port(to)?;
        Some(TransitionEntry {
            from_node: from_port.node,
            from_port: resolve_semantic_id(graph, from_port),
            to_node: to_port.node,
            to_port: resolve_semantic_id(graph, to_port),
        })
    }

    fn validate(&self, graph: &Graph, messages: &mut Vec<ValidationMessage>) {
        if let Some(entry_type) = &self.entry_type {
            let count = graph
                .nodes()
                .filter(|n| n.type_id == *entry_type)
                .count();
            if count != 1 {
                messages.push(ValidationMessage::new(
                    Severity::Error,
                    "EntryNode",
                    format!("expected exactly one {entry_type} node, found {count}"),
                    None,
                ));
            }
        }

        for node in graph.nodes().filter(|n| !n.is_boundary()) {
            if !graph.settings.catalog.contains(&node.type_id) {
                messages.push(ValidationMessage::new(
                    Severity::Error,
                    "UnknownType",
                    format!("node type {} is not registered", node.type_id),
                    Some(node.id),
                ));
            }
            if graph.edge_ids_for_node(node.id).is_empty() {
                messages.push(ValidationMessage::new(
                    Severity::Warning,
                    "IsolatedNode",
                    "node has no incident edges".to_string(),
                    Some(node.id),
                ));
            }
        }

        for edge in graph.edges() {
            if graph.is_bridge_edge(edge) {
                continue;
            }
            let source_ok = graph
                .port(edge.source_port)
                .is_some_and(|p| p.direction == PortDirection::Output);
            let target_ok = graph
                .port(edge.target_port)
                .is_some_and(|p| p.direction == PortDirection::Input);
            if !source_ok || !target_ok {
                messages.push(ValidationMessage::new(
                    Severity::Error,
                    "EdgeDirection",
                    format!("edge {} is not Output→Input", edge.id),
                    None,
                ));
            }
        }
    }
}

/// The semantic id a port exports under: the declared default port matching
/// its (name, direction) when the node's type is registered, the port's own
/// semantic id otherwise.
fn resolve_semantic_id(graph: &Graph, port: &Port) -> String {
    if let Some(node) = graph.node(port.node)
        && let Some(definition) = graph.settings.catalog.get(&node.type_id)
        && let Some(port_def) = definition.find_port(&port.name, port.direction)
    {
        return port_def.semantic_id.clone();
    }
    port.semantic_id().to_string()
}

/// Top-level entries of a JSON object payload as key/value/type triples.
/// Nested values are re-serialized as JSON text.
fn flatten_properties(user_data: &Value) -> Vec<PropertyEntry> {
    let Value::Object(map) = user_data else {
        return Vec::new();
    };
    map.iter()
        .map(|(key, value)| {
            let (text, value_type) = match value {
                Value::Null => ("null".to_string(), "null"),
                Value::Bool(b) => (b.to_string(), "boolean"),
                Value::Number(n) => (n.to_string(), "number"),
                Value::String(s) => (s.clone(), "string"),
                other => (
                    serde_json::to_string(other).unwrap_or_default(),
                    if other.is_array() { "array" } else { "object" },
                ),
            };
            PropertyEntry {
                key: key.clone(),
                value: text,
                value_type: value_type.to_string(),
            }
        })
        .collect()
}

/// String properties carrying the `scene://` prefix, as binding references.
fn extract_bindings(user_data: &Value) -> Vec<BindingRef> {
    let Value::Object(map) = user_data else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(key, value)| {
            let text = value.as_str()?;
            let target = text.strip_prefix(SCENE_BINDING_PREFIX)?;
            Some(BindingRef {
                property: key.clone(),
                target: target.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flatten_properties_covers_json_types() {
        let data = serde_json::json!({
            "speed": 2.5,
            "label": "run",
            "enabled": true,
            "tags": ["a", "b"],
        });
        let props = flatten_properties(&data);
        let by_key = |k: &str| props.iter().find(|p| p.key == k).cloned();
        assert_eq!(by_key("speed").map(|p| p.value_type), Some("number".to_string()));
        assert_eq!(by_key("label").map(|p| p.value), Some("run".to_string()));
        assert_eq!(by_key("enabled").map(|p| p.value_type), Some("boolean".to_string()));
        assert_eq!(by_key("tags").map(|p| p.value_type), Some("array".to_string()));
    }

    #[test]
    fn bindings_require_the_scene_prefix() {
        let data = serde_json::json!({
            "target": "scene://level/Spawner",
            "label": "plain string",
        });
        let bindings = extract_bindings(&data);
        assert_eq!(bindings.len(), 1);
        assert_eq!(bindings[0].property, "target");
        assert_eq!(bindings[0].target, "level/Spawner");
    }
}
