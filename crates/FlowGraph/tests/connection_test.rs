use flow_graph::decorations::SubGraphFrame;
use flow_graph::model::{
    Node, Port, PortDefinition, PortDirection, PortKind, SUBGRAPH_BOUNDARY_TYPE,
};
use flow_graph::policy::{ConnectionResult, ConnectionValidator, DefaultConnectionPolicy};
use flow_graph::registry::NodeTypeDefinition;
use flow_graph::{FrameId, Graph, GraphSettings, NodeId, PortId};
use glam::Vec2;

fn settings() -> GraphSettings {
    let mut settings = GraphSettings::default();
    settings
        .catalog
        .register(
            NodeTypeDefinition::new("T", "Test Node", "Test")
                .with_port(
                    PortDefinition::new("In", PortDirection::Input, PortKind::Control, "exec")
                        .single(),
                )
                .with_port(PortDefinition::new(
                    "Out",
                    PortDirection::Output,
                    PortKind::Control,
                    "exec",
                )),
        )
        .unwrap();
    settings
        .catalog
        .register(
            NodeTypeDefinition::new("D", "Data Node", "Test")
                .with_port(PortDefinition::new(
                    "Value",
                    PortDirection::Input,
                    PortKind::Data,
                    "float",
                ))
                .with_port(PortDefinition::new(
                    "Result",
                    PortDirection::Output,
                    PortKind::Data,
                    "int",
                )),
        )
        .unwrap();
    settings
}

fn ports_of(graph: &Graph, node: NodeId) -> (PortId, PortId) {
    let node = graph.node(node).unwrap();
    let input = node.input_ports().next().unwrap().id;
    let output = node.output_ports().next().unwrap().id;
    (input, output)
}

/// Adds a boundary node with one input and one output port, plus a frame it
/// represents wrapping `contained`.
fn add_frame(graph: &mut Graph, contained: &[NodeId]) -> (NodeId, PortId, PortId, FrameId) {
    let rep_id = NodeId::fresh();
    let mut rep = Node::new(rep_id, SUBGRAPH_BOUNDARY_TYPE, Vec2::ZERO);
    rep.allow_dynamic_ports = true;
    let r_in = PortId::fresh();
    rep.ports.push(Port::from_definition(
        r_in,
        rep_id,
        &PortDefinition::new("RIn", PortDirection::Input, PortKind::Control, "exec").single(),
    ));
    let r_out = PortId::fresh();
    rep.ports.push(Port::from_definition(
        r_out,
        rep_id,
        &PortDefinition::new("ROut", PortDirection::Output, PortKind::Control, "exec"),
    ));
    graph.add_node_direct(rep).unwrap();

    let frame_id = FrameId::fresh();
    let mut frame = SubGraphFrame::new(frame_id, "frame", rep_id);
    frame.contained.extend(contained.iter().copied());
    graph.add_frame_direct(frame).unwrap();
    (rep_id, r_in, r_out, frame_id)
}

#[test]
fn plain_checks_reject_in_order() {
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let d = graph.add_node("D", Vec2::new(200.0, 0.0)).unwrap();
    let (a_in, a_out) = ports_of(&graph, a);
    let (b_in, b_out) = ports_of(&graph, b);
    let (d_in, d_out) = ports_of(&graph, d);

    // Same node.
    assert_eq!(graph.can_connect(a_out, a_in), ConnectionResult::SameNode);
    // Same direction.
    assert_eq!(graph.can_connect(a_out, b_out), ConnectionResult::SameDirection);
    // Kind mismatch: Control output into Data input.
    assert_eq!(graph.can_connect(a_out, d_in), ConnectionResult::KindMismatch);
    // Kind mismatch in the other direction.
    assert_eq!(graph.can_connect(d_out, b_in), ConnectionResult::KindMismatch);

    graph.connect(a_out, b_in).unwrap();
    assert_eq!(graph.can_connect(a_out, b_in), ConnectionResult::DuplicateEdge);
}

#[test]
fn data_type_mismatch_uses_the_compatibility_registry() {
    let mut settings = settings();
    settings.compatibility.register_conversion("int", "float");
    let mut graph = Graph::new(settings);
    let producer = graph.add_node("D", Vec2::ZERO).unwrap();
    let consumer = graph.add_node("D", Vec2::new(100.0, 0.0)).unwrap();
    let (_, int_out) = ports_of(&graph, producer);
    let (float_in, _) = ports_of(&graph, consumer);

    // int -> float is registered.
    assert_eq!(graph.can_connect(int_out, float_in), ConnectionResult::Success);

    // Without the conversion the same attempt is a type mismatch.
    let mut bare = Graph::new(self::settings());
    let p = bare.add_node("D", Vec2::ZERO).unwrap();
    let c = bare.add_node("D", Vec2::new(100.0, 0.0)).unwrap();
    let (_, int_out) = ports_of(&bare, p);
    let (float_in, _) = ports_of(&bare, c);
    assert_eq!(
        bare.can_connect(int_out, float_in),
        ConnectionResult::DataTypeMismatch
    );
}

#[test]
fn full_single_output_is_capacity_exceeded() {
    let mut settings = GraphSettings::default();
    settings
        .catalog
        .register(
            NodeTypeDefinition::new("S", "Single Out", "Test")
                .with_port(PortDefinition::new("In", PortDirection::Input, PortKind::Control, "exec"))
                .with_port(
                    PortDefinition::new("Out", PortDirection::Output, PortKind::Control, "exec")
                        .single(),
                ),
        )
        .unwrap();
    let mut graph = Graph::new(settings);
    let a = graph.add_node("S", Vec2::ZERO).unwrap();
    let b = graph.add_node("S", Vec2::new(100.0, 0.0)).unwrap();
    let c = graph.add_node("S", Vec2::new(200.0, 0.0)).unwrap();
    let (_, a_out) = ports_of(&graph, a);
    let (b_in, _) = ports_of(&graph, b);
    let (c_in, _) = ports_of(&graph, c);

    graph.connect(a_out, b_in).unwrap();
    assert_eq!(graph.can_connect(a_out, c_in), ConnectionResult::CapacityExceeded);
    let outcome = graph.connect(a_out, c_in).unwrap();
    assert!(!outcome.is_connected());
    assert_eq!(graph.edge_count(), 1);
}

#[test]
fn cycle_rejection_in_dag_topology() {
    // A→B→C, then C→A must be rejected with no mutation.
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let c = graph.add_node("T", Vec2::new(200.0, 0.0)).unwrap();
    let (a_in, a_out) = ports_of(&graph, a);
    let (b_in, b_out) = ports_of(&graph, b);
    let (c_in, c_out) = ports_of(&graph, c);

    graph.connect(a_out, b_in).unwrap();
    graph.connect(b_out, c_in).unwrap();

    assert_eq!(graph.can_connect(c_out, a_in), ConnectionResult::CycleDetected);
    let outcome = graph.connect(c_out, a_in).unwrap();
    assert!(!outcome.is_connected());
    assert_eq!(graph.edge_count(), 2);
}

#[test]
fn cycles_are_allowed_in_directed_graph_topology() {
    let mut settings = settings();
    settings.topology = flow_graph::Topology::DirectedGraph;
    let mut graph = Graph::new(settings);
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let (a_in, a_out) = ports_of(&graph, a);
    let (b_in, b_out) = ports_of(&graph, b);

    graph.connect(a_out, b_in).unwrap();
    assert!(graph.connect(b_out, a_in).unwrap().is_connected());
}

#[test]
fn cross_scope_connection_is_rejected() {
    // Nodes inside two disjoint frames cannot connect
    // directly; the rejection rides the SameDirection code.
    let mut graph = Graph::new(settings());
    let n1 = graph.add_node("T", Vec2::ZERO).unwrap();
    let n2 = graph.add_node("T", Vec2::new(300.0, 0.0)).unwrap();
    add_frame(&mut graph, &[n1]);
    add_frame(&mut graph, &[n2]);
    let (_, n1_out) = ports_of(&graph, n1);
    let (n2_in, _) = ports_of(&graph, n2);

    assert_eq!(graph.can_connect(n1_out, n2_in), ConnectionResult::SameDirection);
    let outcome = graph.connect(n1_out, n2_in).unwrap();
    assert!(!outcome.is_connected());
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn top_level_to_framed_node_is_also_cross_scope() {
    let mut graph = Graph::new(settings());
    let outside = graph.add_node("T", Vec2::ZERO).unwrap();
    let inside = graph.add_node("T", Vec2::new(300.0, 0.0)).unwrap();
    add_frame(&mut graph, &[inside]);
    let (_, out) = ports_of(&graph, outside);
    let (inp, _) = ports_of(&graph, inside);

    assert_eq!(graph.can_connect(out, inp), ConnectionResult::SameDirection);
}

#[test]
fn internal_bridge_waives_direction_and_capacity() {
    let mut graph = Graph::new(settings());
    let inner = graph.add_node("T", Vec2::ZERO).unwrap();
    let (rep, r_in, _r_out, _) = add_frame(&mut graph, &[inner]);
    let (inner_in, _) = ports_of(&graph, inner);

    // Input-to-input, and the contained port is Single capacity: both
    // waived for a bridge.
    assert_eq!(graph.can_connect(r_in, inner_in), ConnectionResult::Success);
    let outcome = graph.connect(r_in, inner_in).unwrap();
    assert!(outcome.is_connected());

    // The bridge keeps the direction as drawn.
    let edge = graph.edge(outcome.created.unwrap()).unwrap();
    assert_eq!(edge.source_port, r_in);
    assert_eq!(edge.target_port, inner_in);

    // Same pair again, in either endpoint order, is a duplicate.
    assert_eq!(graph.can_connect(r_in, inner_in), ConnectionResult::DuplicateEdge);
    assert_eq!(graph.can_connect(inner_in, r_in), ConnectionResult::DuplicateEdge);

    let _ = rep;
}

#[test]
fn external_connection_to_boundary_skips_capacity() {
    let mut graph = Graph::new(settings());
    let inner = graph.add_node("T", Vec2::ZERO).unwrap();
    let (_, r_in, _, _) = add_frame(&mut graph, &[inner]);

    let a = graph.add_node("T", Vec2::new(-200.0, 0.0)).unwrap();
    let b = graph.add_node("T", Vec2::new(-200.0, 100.0)).unwrap();
    let (_, a_out) = ports_of(&graph, a);
    let (_, b_out) = ports_of(&graph, b);

    // RIn is Single capacity, but external boundary connections skip the
    // capacity check on both endpoints, so a second feeder is fine.
    assert!(graph.connect(a_out, r_in).unwrap().is_connected());
    assert_eq!(graph.can_connect(b_out, r_in), ConnectionResult::Success);
    assert!(graph.connect(b_out, r_in).unwrap().is_connected());
    assert_eq!(graph.edge_count_for_port(r_in), 2);
}

struct RejectEverything;

impl ConnectionValidator for RejectEverything {
    fn validate(&self, _graph: &Graph, _source: PortId, _target: PortId) -> ConnectionResult {
        ConnectionResult::CustomRejected
    }
}

#[test]
fn validator_chain_runs_after_the_default_checks() {
    let mut policy = DefaultConnectionPolicy::new();
    policy.add_validator(Box::new(RejectEverything));
    let mut settings = settings();
    settings.policy = Box::new(policy);
    let mut graph = Graph::new(settings);

    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let (_, a_out) = ports_of(&graph, a);
    let (b_in, _) = ports_of(&graph, b);

    // The default checks would pass; the validator gets the last word.
    assert_eq!(graph.can_connect(a_out, b_in), ConnectionResult::CustomRejected);
    // A same-node attempt never reaches the validator.
    let (a_in, _) = ports_of(&graph, a);
    assert_eq!(graph.can_connect(a_out, a_in), ConnectionResult::SameNode);
}
