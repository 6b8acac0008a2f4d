use std::time::Instant;

use buildgraph::errors::BuildGraphError;
use buildgraph::graph::{BuildGraph, NodeId, NodeKind, NodeState};
use buildgraph_test_utils::init_tracing;

fn marker_graph(n: usize) -> (BuildGraph, Vec<NodeId>) {
    let mut graph = BuildGraph::new();
    let ids = (0..n)
        .map(|i| graph.add_node(NodeKind::Marker, format!("node-{i}")))
        .collect();
    (graph, ids)
}

#[test]
fn new_nodes_start_uninitialized_and_parentless() {
    init_tracing();
    let (graph, ids) = marker_graph(3);

    for id in &ids {
        assert_eq!(graph.state_of(*id), Some(NodeState::Uninitialized));
    }
    // Every node without incoming edges is a root, in id order.
    assert_eq!(graph.roots(), &ids[..]);
}

#[test]
fn connect_updates_adjacency_and_roots() {
    init_tracing();
    let (mut graph, ids) = marker_graph(3);

    graph.connect(ids[0], ids[1]).unwrap();
    graph.connect(ids[0], ids[2]).unwrap();

    assert_eq!(graph.roots(), &[ids[0]]);
    assert_eq!(graph.node(ids[0]).unwrap().children(), &[ids[1], ids[2]]);
    assert_eq!(graph.node(ids[1]).unwrap().parents(), &[ids[0]]);
    assert_eq!(graph.node(ids[2]).unwrap().parents(), &[ids[0]]);
}

#[test]
fn rebuild_is_idempotent() {
    init_tracing();
    let (mut graph, ids) = marker_graph(4);
    graph.connect(ids[0], ids[1]).unwrap();
    graph.connect(ids[1], ids[3]).unwrap();
    graph.connect(ids[0], ids[2]).unwrap();

    let snapshot = |g: &BuildGraph| {
        let mut out = Vec::new();
        for id in &ids {
            let node = g.node(*id).unwrap();
            out.push((node.parents().to_vec(), node.children().to_vec()));
        }
        (out, g.roots().to_vec())
    };

    let before = snapshot(&graph);
    graph.rebuild();
    graph.rebuild();
    assert_eq!(snapshot(&graph), before);
}

#[test]
fn self_edges_are_rejected() {
    init_tracing();
    let (mut graph, ids) = marker_graph(1);

    let err = graph.connect(ids[0], ids[0]).unwrap_err();
    assert!(matches!(err, BuildGraphError::EdgeRejected(_)));
    assert!(graph.node(ids[0]).unwrap().children().is_empty());
}

#[test]
fn duplicate_edges_are_rejected_in_either_direction() {
    init_tracing();
    let (mut graph, ids) = marker_graph(2);
    graph.connect(ids[0], ids[1]).unwrap();

    let err = graph.connect(ids[0], ids[1]).unwrap_err();
    assert!(matches!(err, BuildGraphError::EdgeRejected(_)));
    let err = graph.connect(ids[1], ids[0]).unwrap_err();
    assert!(matches!(err, BuildGraphError::EdgeRejected(_)));

    assert_eq!(graph.node(ids[0]).unwrap().children(), &[ids[1]]);
    assert!(graph.node(ids[1]).unwrap().children().is_empty());
}

#[test]
fn closing_a_cycle_is_rejected_and_leaves_graph_unchanged() {
    init_tracing();
    let (mut graph, ids) = marker_graph(3);
    graph.connect(ids[0], ids[1]).unwrap();
    graph.connect(ids[1], ids[2]).unwrap();

    let err = graph.connect(ids[2], ids[0]).unwrap_err();
    assert!(matches!(err, BuildGraphError::GraphCycle(_)));

    // Structure unchanged: node 0 is still the sole root.
    assert_eq!(graph.roots(), &[ids[0]]);
    assert!(graph.node(ids[2]).unwrap().children().is_empty());
    graph.validate().unwrap();
}

#[test]
fn diamond_shapes_are_accepted() {
    init_tracing();
    let (mut graph, ids) = marker_graph(4);
    graph.connect(ids[0], ids[1]).unwrap();
    graph.connect(ids[0], ids[2]).unwrap();
    graph.connect(ids[1], ids[3]).unwrap();
    graph.connect(ids[2], ids[3]).unwrap();

    assert_eq!(graph.roots(), &[ids[0]]);
    assert_eq!(graph.node(ids[3]).unwrap().parents(), &[ids[1], ids[2]]);
    graph.validate().unwrap();
}

#[test]
fn connecting_unknown_nodes_fails() {
    init_tracing();
    let (mut graph, ids) = marker_graph(1);
    let ghost = NodeId(999);

    assert!(matches!(
        graph.connect(ids[0], ghost),
        Err(BuildGraphError::NodeNotFound(_))
    ));
    assert!(matches!(
        graph.connect(ghost, ids[0]),
        Err(BuildGraphError::NodeNotFound(_))
    ));
}

#[test]
fn remove_node_drops_incident_edges() {
    init_tracing();
    let (mut graph, ids) = marker_graph(3);
    graph.connect(ids[0], ids[1]).unwrap();
    graph.connect(ids[1], ids[2]).unwrap();

    graph.remove_node(ids[1]);

    assert_eq!(graph.len(), 2);
    assert!(graph.node(ids[0]).unwrap().children().is_empty());
    assert!(graph.node(ids[2]).unwrap().parents().is_empty());
    // Both survivors are now roots.
    assert_eq!(graph.roots(), &[ids[0], ids[2]]);
}

#[test]
fn disconnect_restores_root_status() {
    init_tracing();
    let (mut graph, ids) = marker_graph(2);
    graph.connect(ids[0], ids[1]).unwrap();
    assert_eq!(graph.roots(), &[ids[0]]);

    graph.disconnect(ids[0], ids[1]);
    assert_eq!(graph.roots(), &ids[..]);
}

#[test]
fn reset_returns_every_node_to_uninitialized() {
    init_tracing();
    let (mut graph, ids) = marker_graph(2);
    let now = Instant::now();

    graph.reset(now);
    for id in &ids {
        assert_eq!(graph.state_of(*id), Some(NodeState::Uninitialized));
    }
}

#[test]
fn can_activate_requires_all_parents_finished() {
    init_tracing();
    let (mut graph, ids) = marker_graph(3);
    graph.connect(ids[0], ids[2]).unwrap();
    graph.connect(ids[1], ids[2]).unwrap();

    // Uninitialized nodes are never eligible.
    assert!(!graph.can_activate(ids[2]));
    assert!(!graph.can_activate(NodeId(999)));
}
