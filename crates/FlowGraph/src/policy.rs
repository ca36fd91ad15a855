//! # Connection Policy
//!
//! A pure judgement over a graph snapshot and two ports: may they be
//! connected, and if not, why not. The default policy is scope-aware — it
//! distinguishes internal bridges to a sub-graph boundary, external
//! connections to a boundary port, and plain same-scope connections.

use crate::graph::{Graph, Topology};
use crate::id::PortId;
use crate::model::{Port, PortCapacity, PortDirection};
use crate::topology;

/// Outcome of a connection attempt's validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionResult {
    Success,
    SameNode,
    /// Also the rejection channel for plain cross-scope attempts: a
    /// connection between two different sub-graph scopes must route through
    /// a boundary port and is reported here.
    SameDirection,
    KindMismatch,
    DataTypeMismatch,
    CapacityExceeded,
    CycleDetected,
    DuplicateEdge,
    CustomRejected,
}

impl ConnectionResult {
    pub fn is_success(&self) -> bool {
        *self == ConnectionResult::Success
    }
}

/// The judgement seam: maps (graph, source, target) to a result without
/// mutating anything.
pub trait ConnectionPolicy {
    fn can_connect(&self, graph: &Graph, source: PortId, target: PortId) -> ConnectionResult;
}

/// Extension point run after the default checks succeed.
pub trait ConnectionValidator {
    fn validate(&self, graph: &Graph, source: PortId, target: PortId) -> ConnectionResult;
}

/// The built-in multi-scope policy.
#[derive(Default)]
pub struct DefaultConnectionPolicy {
    validators: Vec<Box<dyn ConnectionValidator>>,
}

impl DefaultConnectionPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator(&mut self, validator: Box<dyn ConnectionValidator>) {
        self.validators.push(validator);
    }

    fn check(&self, graph: &Graph, source: &Port, target: &Port) -> ConnectionResult {
        let compatibility = &graph.settings.compatibility;

        // Scope A: internal bridge. Direction and capacity are waived.
        if graph.is_internal_bridge(source.id, target.id) {
            if source.kind != target.kind {
                return ConnectionResult::KindMismatch;
            }
            // Bridges are direction-agnostic, so compatibility is too.
            if !compatibility.is_compatible(&source.data_type, &target.data_type)
                && !compatibility.is_compatible(&target.data_type, &source.data_type)
            {
                return ConnectionResult::DataTypeMismatch;
            }
            let duplicate = graph.edges().any(|e| {
                (e.source_port == source.id && e.target_port == target.id)
                    || (e.source_port == target.id && e.target_port == source.id)
            });
            if duplicate {
                return ConnectionResult::DuplicateEdge;
            }
            return ConnectionResult::Success;
        }

        let source_boundary = graph.node(source.node).is_some_and(|n| n.is_boundary());
        let target_boundary = graph.node(target.node).is_some_and(|n| n.is_boundary());
        let plain = !source_boundary && !target_boundary;

        // Scope C only: both nodes must live in the same scope; crossing
        // frames without a boundary is rejected.
        if plain && graph.scope_of(source.node) != graph.scope_of(target.node) {
            return ConnectionResult::SameDirection;
        }

        if source.node == target.node {
            return ConnectionResult::SameNode;
        }
        if source.direction == target.direction {
            return ConnectionResult::SameDirection;
        }

        // Normalize so `out` drives `in`, whichever order was drawn.
        let (out, inp) = if source.is_output() {
            (source, target)
        } else {
            (target, source)
        };

        if out.kind != inp.kind {
            return ConnectionResult::KindMismatch;
        }
        if !compatibility.is_compatible(&out.data_type, &inp.data_type) {
            return ConnectionResult::DataTypeMismatch;
        }
        let duplicate = graph
            .edges()
            .any(|e| e.source_port == out.id && e.target_port == inp.id);
        if duplicate {
            return ConnectionResult::DuplicateEdge;
        }

        if plain {
            // A full Single output is a hard stop; a full Single input is
            // resolved later by displacement, so it passes validation.
            if out.capacity == PortCapacity::Single && graph.edge_count_for_port(out.id) > 0
            {
                return ConnectionResult::CapacityExceeded;
            }
            if graph.settings.topology == Topology::Dag
                && topology::would_create_cycle(graph, out.node, inp.node)
            {
                return ConnectionResult::CycleDetected;
            }
        }

        ConnectionResult::Success
    }
}

impl ConnectionPolicy for DefaultConnectionPolicy {
    fn can_connect(&self, graph: &Graph, source: PortId, target: PortId) -> ConnectionResult {
        let Some(source) = graph.port(source) else {
            return ConnectionResult::CustomRejected;
        };
        let Some(target) = graph.port(target) else {
            return ConnectionResult::CustomRejected;
        };

        let result = self.check(graph, source, target);
        if !result.is_success() {
            return result;
        }
        for validator in &self.validators {
            let result = validator.validate(graph, source.id, target.id);
            if !result.is_success() {
                return result;
            }
        }
        ConnectionResult::Success
    }
}

/// Normalizes an attempt so the Output port comes first. Internal bridges
/// keep the order the user drew.
pub(crate) fn normalize_endpoints(
    graph: &Graph,
    source: PortId,
    target: PortId,
) -> (PortId, PortId) {
    if graph.is_internal_bridge(source, target) {
        return (source, target);
    }
    let (Some(src), Some(tgt)) = (graph.port(source), graph.port(target)) else {
        return (source, target);
    };
    if src.direction == PortDirection::Input && tgt.direction == PortDirection::Output {
        (target, source)
    } else {
        (source, target)
    }
}
