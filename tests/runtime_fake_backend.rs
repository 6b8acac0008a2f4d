use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use buildgraph::config::EngineConfig;
use buildgraph::engine::{EngineEvent, Runtime};
use buildgraph::exec::BuildRequest;
use buildgraph::graph::{BuildGraph, NodeKind, NodeState};
use buildgraph::manager::BuildManager;
use buildgraph::spawn_runtime;
use buildgraph_test_utils::builders::{BuildInfoBuilder, StaticTargetSource, TargetBuilder};
use buildgraph_test_utils::fake_backend::FakeBackend;
use buildgraph_test_utils::{init_tracing, with_timeout};

type Requests = Arc<Mutex<Vec<BuildRequest>>>;

fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_secs: 0.01,
        ..EngineConfig::default()
    }
}

#[tokio::test]
async fn runtime_drives_a_chain_to_completion() {
    init_tracing();

    let (tx, rx) = mpsc::channel::<EngineEvent>(64);

    let mut graph = BuildGraph::new();
    let a = graph.add_node(BuildInfoBuilder::new().tag("terrain").into_kind(), "terrain");
    let b = graph.add_node(NodeKind::Marker, "done");
    graph.connect(a, b).unwrap();

    let targets = vec![
        TargetBuilder::new(1, "hill").tag("terrain").asset("hda").build(),
    ];

    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    // Every started build reports success straight back into the loop.
    let backend = FakeBackend::completing(Arc::clone(&requests), tx.clone(), true);
    let manager = BuildManager::new(
        graph,
        backend,
        StaticTargetSource::new(targets),
        fast_config(),
    );

    let handle = tokio::spawn(Runtime::new(manager, rx).run());

    tx.send(EngineEvent::RunRequested).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    tx.send(EngineEvent::Shutdown).await.unwrap();

    let manager = with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(manager.graph().state_of(a), Some(NodeState::Finished));
    assert_eq!(manager.graph().state_of(b), Some(NodeState::Finished));
    assert!(!manager.is_running());
    assert_eq!(requests.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn runtime_exits_when_the_event_channel_closes() {
    init_tracing();

    let mut graph = BuildGraph::new();
    let a = graph.add_node(NodeKind::Marker, "only");

    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    let manager = BuildManager::new(
        graph,
        FakeBackend::new(Arc::clone(&requests)),
        StaticTargetSource::empty(),
        fast_config(),
    );

    let (tx, handle) = spawn_runtime(manager);
    tx.send(EngineEvent::RunRequested).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(tx);

    let manager = with_timeout(handle).await.unwrap().unwrap();
    assert_eq!(manager.graph().state_of(a), Some(NodeState::Finished));
}

#[tokio::test]
async fn cancel_event_stops_the_run() {
    init_tracing();

    let mut graph = BuildGraph::new();
    let a = graph.add_node(BuildInfoBuilder::new().tag("t").into_kind(), "seq");

    let targets = vec![TargetBuilder::new(1, "x").tag("t").asset("hda").build()];
    let requests: Requests = Arc::new(Mutex::new(Vec::new()));
    // Record-only backend: the build never completes on its own.
    let manager = BuildManager::new(
        graph,
        FakeBackend::new(Arc::clone(&requests)),
        StaticTargetSource::new(targets),
        fast_config(),
    );

    let (tx, handle) = spawn_runtime(manager);
    tx.send(EngineEvent::RunRequested).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(EngineEvent::CancelRequested).await.unwrap();
    tx.send(EngineEvent::Shutdown).await.unwrap();

    let manager = with_timeout(handle).await.unwrap().unwrap();
    assert!(!manager.is_running());
    // The build had started before the cancel landed.
    assert_eq!(requests.lock().unwrap().len(), 1);
    assert_eq!(manager.graph().state_of(a), Some(NodeState::Active));
}
