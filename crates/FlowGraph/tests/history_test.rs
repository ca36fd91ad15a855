use flow_graph::command::{CommandHistory, CompoundCommand};
use flow_graph::commands::{
    AddNodeCommand, ChangeNodeDataCommand, ConnectCommand, DisconnectCommand, MoveNodeCommand,
    RemoveNodeCommand,
};
use flow_graph::model::{PortDefinition, PortDirection, PortKind};
use flow_graph::persistence::GraphDocument;
use flow_graph::registry::NodeTypeDefinition;
use flow_graph::{Graph, GraphSettings, NodeId, PortId};
use glam::Vec2;
use std::cell::Cell;
use std::rc::Rc;

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

/// Order-insensitive structural snapshot: undo may restore entities in a
/// different arena order, which is structurally equal.
fn canonical(graph: &Graph) -> GraphDocument {
    let mut doc = GraphDocument::from_graph(graph);
    doc.nodes.sort_by_key(|n| n.id);
    doc.edges.sort_by_key(|e| e.id);
    doc.groups.sort_by_key(|g| g.id);
    doc.sub_graph_frames.sort_by_key(|f| f.id);
    doc.comments.sort_by_key(|c| c.id);
    for group in &mut doc.groups {
        group.contained_node_ids.sort();
    }
    for frame in &mut doc.sub_graph_frames {
        frame.contained_node_ids.sort();
    }
    doc
}

#[test]
fn add_node_undo_redo_keeps_the_id() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::new(10);

    let command = AddNodeCommand::new("T", Vec2::new(5.0, 5.0));
    history.execute(&mut graph, Box::new(command)).unwrap();
    let id = graph.nodes().next().unwrap().id;

    assert!(history.undo(&mut graph).unwrap());
    assert_eq!(graph.node_count(), 0);

    assert!(history.redo(&mut graph).unwrap());
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.nodes().next().unwrap().id, id);
}

#[test]
fn move_undo_restores_the_old_position() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let id = graph.add_node("T", Vec2::ZERO).unwrap();

    history
        .execute(&mut graph, Box::new(MoveNodeCommand::new(id, Vec2::new(40.0, 8.0))))
        .unwrap();
    assert_eq!(graph.node(id).unwrap().position, Vec2::new(40.0, 8.0));

    history.undo(&mut graph).unwrap();
    assert_eq!(graph.node(id).unwrap().position, Vec2::ZERO);
    history.redo(&mut graph).unwrap();
    assert_eq!(graph.node(id).unwrap().position, Vec2::new(40.0, 8.0));
}

#[test]
fn connect_undo_restores_a_displaced_edge() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let c = graph.add_node("T", Vec2::new(200.0, 0.0)).unwrap();
    let (b_in, _) = ports_of(&graph, b);
    let (_, a_out) = ports_of(&graph, a);
    let (_, c_out) = ports_of(&graph, c);

    history
        .execute(&mut graph, Box::new(ConnectCommand::new(a_out, b_in)))
        .unwrap();
    let first_edge = graph.edges().next().unwrap().id;

    history
        .execute(&mut graph, Box::new(ConnectCommand::new(c_out, b_in)))
        .unwrap();
    assert!(graph.edge(first_edge).is_none());

    // Undo the displacing connect: the original edge returns, id intact.
    history.undo(&mut graph).unwrap();
    assert!(graph.edge(first_edge).is_some());
    assert_eq!(graph.edge_count_for_port(b_in), 1);

    // Redo displaces again.
    history.redo(&mut graph).unwrap();
    assert!(graph.edge(first_edge).is_none());
    assert_eq!(graph.edge_count_for_port(b_in), 1);
}

#[test]
fn rejected_connect_is_not_recorded() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let (a_in, a_out) = ports_of(&graph, a);

    let result = history.execute(&mut graph, Box::new(ConnectCommand::new(a_out, a_in)));
    assert!(result.is_err());
    assert!(!history.can_undo());
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn compound_delete_round_trips() {
    // Compound-remove two connected nodes: undo restores
    // nodes and edge with identical ids, redo empties the graph again.
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let a = graph.add_node("T", Vec2::ZERO).unwrap();
    let b = graph.add_node("T", Vec2::new(100.0, 0.0)).unwrap();
    let (b_in, _) = ports_of(&graph, b);
    let (_, a_out) = ports_of(&graph, a);
    graph.connect(a_out, b_in).unwrap();

    let before = canonical(&graph);

    let compound = CompoundCommand::new("Delete Selection")
        .with(Box::new(RemoveNodeCommand::new(a)))
        .with(Box::new(RemoveNodeCommand::new(b)));
    history.execute(&mut graph, Box::new(compound)).unwrap();
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);

    history.undo(&mut graph).unwrap();
    assert_eq!(canonical(&graph), before);

    history.redo(&mut graph).unwrap();
    assert_eq!(graph.node_count(), 0);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn compound_execute_rolls_back_on_child_failure() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let a = graph.add_node("T", Vec2::ZERO).unwrap();

    let before = canonical(&graph);

    // Second child references a node that does not exist.
    let compound = CompoundCommand::new("Broken")
        .with(Box::new(RemoveNodeCommand::new(a)))
        .with(Box::new(RemoveNodeCommand::new(NodeId::fresh())));
    let result = history.execute(&mut graph, Box::new(compound));
    assert!(result.is_err());
    assert!(!history.can_undo());

    // The first child was rolled back: the graph matches its prior state.
    assert_eq!(canonical(&graph), before);
}

#[test]
fn command_sequence_round_trips_structurally() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();

    let empty = canonical(&graph);

    history
        .execute(&mut graph, Box::new(AddNodeCommand::new("T", Vec2::ZERO)))
        .unwrap();
    history
        .execute(&mut graph, Box::new(AddNodeCommand::new("T", Vec2::new(120.0, 0.0))))
        .unwrap();
    let ids: Vec<NodeId> = graph.nodes().map(|n| n.id).collect();
    let (_, out) = ports_of(&graph, ids[0]);
    let (inp, _) = ports_of(&graph, ids[1]);
    history
        .execute(&mut graph, Box::new(ConnectCommand::new(out, inp)))
        .unwrap();
    history
        .execute(
            &mut graph,
            Box::new(ChangeNodeDataCommand::new(ids[0], serde_json::json!({"hp": 3}))),
        )
        .unwrap();
    let edge = graph.edges().next().unwrap().id;
    history
        .execute(&mut graph, Box::new(DisconnectCommand::new(edge)))
        .unwrap();

    let applied = canonical(&graph);

    // Unwind everything, then replay everything.
    while history.undo(&mut graph).unwrap() {}
    assert_eq!(canonical(&graph), empty);

    while history.redo(&mut graph).unwrap() {}
    assert_eq!(canonical(&graph), applied);
}

#[test]
fn history_depth_drops_the_oldest_entry() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::new(2);

    for i in 0..3 {
        history
            .execute(
                &mut graph,
                Box::new(AddNodeCommand::new("T", Vec2::new(i as f32, 0.0))),
            )
            .unwrap();
    }
    assert_eq!(graph.node_count(), 3);

    assert!(history.undo(&mut graph).unwrap());
    assert!(history.undo(&mut graph).unwrap());
    // The first command fell off the stack.
    assert!(!history.undo(&mut graph).unwrap());
    assert_eq!(graph.node_count(), 1);
}

#[test]
fn history_changed_fires_on_execute_undo_redo() {
    let mut graph = Graph::new(settings());
    let mut history = CommandHistory::default();
    let hits = Rc::new(Cell::new(0));
    let h = hits.clone();
    let _sub = history.history_changed.connect(move |_| h.set(h.get() + 1));

    history
        .execute(&mut graph, Box::new(AddNodeCommand::new("T", Vec2::ZERO)))
        .unwrap();
    history.undo(&mut graph).unwrap();
    history.redo(&mut graph).unwrap();
    assert_eq!(hits.get(), 3);
}
