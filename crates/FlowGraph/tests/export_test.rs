use flow_graph::decorations::SubGraphFrame;
use flow_graph::export::{
    Exporter, MinNodesInSubGraph, PropertyRequired, Severity, TransitionEntry,
};
use flow_graph::model::{
    Node, Port, PortDefinition, PortDirection, PortKind, SUBGRAPH_BOUNDARY_TYPE,
};
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
}

fn ports_of(graph: &Graph, node: NodeId) -> (PortId, PortId) {
    let node = graph.node(node).unwrap();
    let input = node.input_ports().next().unwrap().id;
    let output = node.output_ports().next().unwrap().id;
    (input, output)
}

fn add_boundary(graph: &mut Graph, contained: &[NodeId]) -> (NodeId, PortId, PortId, FrameId) {
    let rep_id = NodeId::fresh();
    let mut rep = Node::new(rep_id, SUBGRAPH_BOUNDARY_TYPE, Vec2::ZERO);
    let r_in = PortId::fresh();
    rep.ports.push(Port::from_definition(
        r_in,
        rep_id,
        &PortDefinition::new("RIn", PortDirection::Input, PortKind::Control, "exec"),
    ));
    let r_out = PortId::fresh();
    rep.ports.push(Port::from_definition(
        r_out,
        rep_id,
        &PortDefinition::new("ROut", PortDirection::Output, PortKind::Control, "exec"),
    ));
    graph.add_node_direct(rep).unwrap();

    let frame_id = FrameId::fresh();
    let mut frame = SubGraphFrame::new(frame_id, "F", rep_id);
    frame.contained.extend(contained.iter().copied());
    graph.add_frame_direct(frame).unwrap();
    (rep_id, r_in, r_out, frame_id)
}

#[test]
fn flatten_stitches_many_to_many_through_the_boundary() {
    // A and B feed the frame boundary, X and Y live inside.
    // A.Out→R.RIn, B.Out→R.RIn, R.RIn→X.In (bridge), X.Out→R.ROut
    // (bridge), R.ROut→Y.In. Flat transitions: exactly A→X, B→X, X→Y,
    // and nothing references R.
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(0.0, 120.0)).unwrap();
    let x = graph.add_node("T", Vec2::new(300.0, 0.0)).unwrap();
    let y = graph.add_node("T", Vec2::new(500.0, 0.0)).unwrap();
    let (rep, r_in, r_out, _) = add_boundary(&mut graph, &[x, y]);

    let (_, a_out) = ports_of(&graph, a);
    let (_, b_out) = ports_of(&graph, b);
    let (x_in, x_out) = ports_of(&graph, x);
    let (y_in, _) = ports_of(&graph, y);

    assert!(graph.connect(a_out, r_in).unwrap().is_connected());
    assert!(graph.connect(b_out, r_in).unwrap().is_connected());
    assert!(graph.connect(r_in, x_in).unwrap().is_connected());
    assert!(graph.connect(x_out, r_out).unwrap().is_connected());
    assert!(graph.connect(r_out, y_in).unwrap().is_connected());

    let model = Exporter::new("demo").export(&graph);

    // Boundary node is elided from the actions.
    assert_eq!(model.actions.len(), 4);
    assert!(model.actions.iter().all(|a| a.id != rep));

    let expected = |from: NodeId, to: NodeId, to_port: &str| TransitionEntry {
        from_node: from,
        from_port: "Out".to_string(),
        to_node: to,
        to_port: to_port.to_string(),
    };
    assert_eq!(model.transitions.len(), 3);
    assert!(model.transitions.contains(&expected(a, x, "In")));
    assert!(model.transitions.contains(&expected(b, x, "In")));
    assert!(model.transitions.contains(&expected(x, y, "In")));
    assert!(
        model
            .transitions
            .iter()
            .all(|t| t.from_node != rep && t.to_node != rep)
    );
}

#[test]
fn plain_edges_export_directly_with_semantic_ids() {
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(200.0, 0.0)).unwrap();
    let (_, a_out) = ports_of(&graph, a);
    let (b_in, _) = ports_of(&graph, b);
    graph.connect(a_out, b_in).unwrap();

    // Display renames must not leak into the export.
    graph.rename_port(b_in, "Fancy Input").unwrap();

    let model = Exporter::new("demo").export(&graph);
    assert_eq!(model.transitions.len(), 1);
    assert_eq!(model.transitions[0].from_port, "Out");
    assert_eq!(model.transitions[0].to_port, "In");
}

#[test]
fn actions_carry_flattened_properties_and_bindings() {
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    graph
        .set_node_user_data(
            a,
            serde_json::json!({
                "speed": 1.5,
                "target": "scene://level/Door",
            }),
        )
        .unwrap();

    let model = Exporter::new("demo").export(&graph);
    let action = model.actions.iter().find(|e| e.id == a).unwrap();
    assert_eq!(action.type_id, "T");

    let speed = action.properties.iter().find(|p| p.key == "speed").unwrap();
    assert_eq!(speed.value, "1.5");
    assert_eq!(speed.value_type, "number");

    assert_eq!(action.bindings.len(), 1);
    assert_eq!(action.bindings[0].target, "level/Door");
}

#[test]
fn structural_validation_reports_entry_isolation_and_unknown_types() {
    let mut settings = settings();
    settings
        .catalog
        .register(NodeTypeDefinition::new("Flow.Start", "Start", "Flow").with_port(
            PortDefinition::new("Out", PortDirection::Output, PortKind::Control, "exec"),
        ))
        .unwrap();
    let mut graph = Graph::new(settings);

    // No entry node, one isolated node, one node of an unregistered type
    // (inserted directly, as a deserializer would).
    let isolated = graph.add_node("T", Vec2::ZERO).unwrap();
    let rogue = Node::new(NodeId::fresh(), "NotRegistered", Vec2::new(100.0, 0.0));
    let rogue_id = rogue.id;
    graph.add_node_direct(rogue).unwrap();

    let exporter = Exporter::new("demo").with_entry_type("Flow.Start");
    let model = exporter.export(&graph);

    assert!(model.has_errors());
    let rules: Vec<&str> = model.messages.iter().map(|m| m.rule.as_str()).collect();
    assert!(rules.contains(&"EntryNode"));
    assert!(rules.contains(&"UnknownType"));
    assert!(rules.contains(&"IsolatedNode"));
    assert!(
        model
            .messages
            .iter()
            .any(|m| m.rule == "UnknownType" && m.node == Some(rogue_id))
    );
    assert!(
        model
            .messages
            .iter()
            .any(|m| m.rule == "IsolatedNode" && m.node == Some(isolated))
    );
}

#[test]
fn pluggable_rules_surface_in_the_same_stream() {
    let mut graph = Graph::new(settings());
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let (_, a_out) = ports_of(&graph, a);
    let (b_in, _) = ports_of(&graph, b);
    graph.connect(a_out, b_in).unwrap();
    add_boundary(&mut graph, &[]);

    let exporter = Exporter::new("demo")
        .with_rule(Box::new(PropertyRequired {
            type_id: "T".to_string(),
            property: "label".to_string(),
            severity: Severity::Warning,
        }))
        .with_rule(Box::new(MinNodesInSubGraph {
            min: 1,
            severity: Severity::Error,
        }));
    let model = exporter.export(&graph);

    // Both T nodes lack "label"; the empty frame violates the minimum.
    assert_eq!(
        model
            .messages
            .iter()
            .filter(|m| m.rule == "PropertyRequired")
            .count(),
        2
    );
    assert!(
        model
            .messages
            .iter()
            .any(|m| m.rule == "MinNodesInSubGraph" && m.severity == Severity::Error)
    );
}
