// src/manager/build_manager.rs

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::config::EngineConfig;
use crate::errors::{BuildGraphError, Result};
use crate::exec::{BuildBackend, BuildCompletion, WorkTicket};
use crate::graph::{BuildGraph, GraphNode, NodeId, NodeKind, NodeState};
use crate::target::{DiscoveredTargets, TargetId, TargetSource};

/// Snapshot of one node's state for a presentation layer.
#[derive(Debug, Clone)]
pub struct NodeStatus {
    pub state: NodeState,
    pub message: String,
    pub elapsed: Option<Duration>,
}

/// Owns a live graph instance and advances it to completion through a
/// fixed-interval poll loop.
///
/// The manager is responsible for:
/// - discovering targets and initializing every node reachable from the
///   root set (idempotent; re-run before every build pass)
/// - seeding the active set with the graph's roots on [`run`]
/// - polling the active set, activating nodes whose dependencies have all
///   finished and dropping terminal ones
/// - routing build completions to the owning work item
///
/// All entry points take an explicit `now` so the host tick owns the
/// clock.
///
/// [`run`]: BuildManager::run
#[derive(Debug)]
pub struct BuildManager<B, S> {
    graph: BuildGraph,
    backend: B,
    source: S,
    config: EngineConfig,
    /// Nodes currently eligible for polling. Membership changes only
    /// inside one poll pass; a node enters at most once per run.
    active: HashSet<NodeId>,
    last_polled: Option<Instant>,
    next_ticket: u64,
}

impl<B: BuildBackend, S: TargetSource> BuildManager<B, S> {
    pub fn new(graph: BuildGraph, backend: B, source: S, config: EngineConfig) -> Self {
        Self {
            graph,
            backend,
            source,
            config,
            active: HashSet::new(),
            last_polled: None,
            next_ticket: 0,
        }
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut BuildGraph {
        &mut self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a build run is currently in progress.
    pub fn is_running(&self) -> bool {
        !self.active.is_empty()
    }

    /// Nodes currently in the active set, in id order.
    pub fn active_nodes(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.active.iter().copied().collect();
        ids.sort();
        ids
    }

    /// State + status line + elapsed time for one node.
    pub fn status_of(&self, id: NodeId, now: Instant) -> Option<NodeStatus> {
        let node = self.graph.node(id)?;
        Some(NodeStatus {
            state: node.state(),
            message: node.status_message(now),
            elapsed: node.elapsed(now),
        })
    }

    /// Start a new build pass.
    ///
    /// Refuses while nodes are still actively building; otherwise re-runs
    /// initialization (refreshing target discovery) and seeds the active
    /// set with the graph's root set.
    pub fn run(&mut self, now: Instant) -> Result<()> {
        if !self.active.is_empty() {
            warn!("run requested but nodes are already actively building");
            return Err(BuildGraphError::RunInProgress);
        }

        self.initialize(now)?;
        self.active.extend(self.graph.roots().iter().copied());

        info!(roots = self.active.len(), "build run started");
        Ok(())
    }

    /// Abort polling immediately.
    ///
    /// Discards the active set and the rate limiter without touching node
    /// states, and issues no cancellation to in-flight asynchronous work;
    /// late completions for no-longer-tracked items are ignored.
    pub fn cancel(&mut self) {
        info!(active = self.active.len(), "build run cancelled");
        self.active.clear();
        self.last_polled = None;
    }

    /// Discover targets and initialize every node reachable from the root
    /// set. Idempotent: safe to call repeatedly; [`run`] calls it before
    /// every pass.
    ///
    /// Performs an iterative DFS carrying a per-path ancestor set, an
    /// independent cycle check over the already-validated structure. On
    /// detection the whole graph is reset and an error surfaced; no
    /// partial initialization is committed. A global visited set ensures a
    /// shared descendant in a diamond is initialized exactly once.
    ///
    /// [`run`]: BuildManager::run
    pub fn initialize(&mut self, now: Instant) -> Result<()> {
        if self.graph.is_empty() {
            debug!("graph is empty; nothing to initialize");
            return Ok(());
        }

        self.graph.reset(now);

        let discovered = DiscoveredTargets::index(self.source.discover());
        debug!(targets = discovered.all().len(), "discovered target population");

        let mut stack: Vec<(NodeId, HashSet<NodeId>)> = self
            .graph
            .roots()
            .iter()
            .map(|id| (*id, HashSet::new()))
            .collect();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut claimed: HashSet<TargetId> = HashSet::new();

        while let Some((id, mut ancestors)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            ancestors.insert(id);

            let Some(node) = self.graph.node_mut(id) else {
                warn!(node = %id, "node in root set traversal is missing; skipping");
                continue;
            };

            if matches!(node.kind(), NodeKind::Sequence(_)) {
                initialize_sequence_node(node, &discovered, &mut claimed, now);
            } else if matches!(node.kind(), NodeKind::Action(_)) {
                initialize_action_node(node, &discovered, now);
            } else {
                node.ready(now);
            }

            let children = node.children().to_vec();
            for child in children {
                if ancestors.contains(&child) {
                    error!(
                        node = %id,
                        child = %child,
                        "a cycle exists in the build graph; aborting initialization"
                    );
                    self.graph.reset(now);
                    return Err(BuildGraphError::GraphCycle(format!(
                        "initialization re-entered {child}"
                    )));
                }
                stack.push((child, ancestors.clone()));
            }
        }

        Ok(())
    }

    /// Advance the frontier of runnable nodes by one pass.
    ///
    /// Rate-limited: calls within `poll_interval` of the previous pass are
    /// no-ops. For each active node: `Active` nodes are left alone,
    /// `Standby` nodes are activated, `Finished` nodes activate every
    /// child whose dependencies are now satisfied and are then dropped,
    /// and `Error`/`Expired` nodes are dropped without propagating to
    /// their descendants (the subtree simply never becomes eligible for
    /// this run).
    pub fn poll(&mut self, now: Instant) {
        if let Some(last) = self.last_polled {
            if now.duration_since(last) < self.config.poll_interval() {
                return;
            }
        }

        let current: Vec<NodeId> = self.active.iter().copied().collect();
        let mut to_add: Vec<NodeId> = Vec::new();
        let mut to_remove: Vec<NodeId> = Vec::new();

        for id in current {
            let Some(state) = self.graph.node_mut(id).map(|n| n.poll_state(now)) else {
                error!(node = %id, "active node no longer exists; dropping");
                to_remove.push(id);
                continue;
            };

            match state {
                NodeState::Active => {}
                NodeState::Standby => {
                    self.activate_node(id, now);
                }
                NodeState::Finished => {
                    let children = self
                        .graph
                        .node(id)
                        .map(|n| n.children().to_vec())
                        .unwrap_or_default();

                    for child in children {
                        if self.graph.can_activate(child) && self.activate_node(child, now) {
                            to_add.push(child);
                        }
                    }

                    to_remove.push(id);
                }
                NodeState::Expired | NodeState::Error => {
                    to_remove.push(id);
                }
                NodeState::Uninitialized => {
                    error!(node = %id, state = %state, "unexpected state for active node; dropping");
                    to_remove.push(id);
                }
            }
        }

        self.active.extend(to_add);
        for id in &to_remove {
            self.active.remove(id);
        }

        self.last_polled = Some(now);
    }

    /// Route a completion callback from the build subsystem to the owning
    /// work item. Stale or unknown tickets are dropped.
    pub fn apply_completion(&mut self, completion: BuildCompletion) {
        let Some(node) = self.graph.node_mut(completion.node) else {
            debug!(node = %completion.node, "completion for unknown node; ignoring");
            return;
        };

        match node.kind_mut() {
            NodeKind::Sequence(seq) => {
                if !seq.complete(completion.ticket, completion.success) {
                    debug!(
                        node = %completion.node,
                        ticket = %completion.ticket,
                        "no work item accepted completion; ignoring as stale"
                    );
                }
            }
            _ => {
                warn!(node = %completion.node, "completion for non-sequence node; ignoring");
            }
        }
    }

    /// Drive a `Standby` node into `Active` (or straight to a terminal
    /// state for leaf kinds). Returns whether the transition happened.
    fn activate_node(&mut self, id: NodeId, now: Instant) -> bool {
        let BuildManager {
            graph,
            backend,
            next_ticket,
            ..
        } = self;

        let Some(node) = graph.node_mut(id) else {
            error!(node = %id, "can't activate unknown node");
            return false;
        };

        if node.state() != NodeState::Standby {
            debug!(node = %id, state = %node.state(), "activation refused; node is not on standby");
            return false;
        }

        if matches!(node.kind(), NodeKind::Marker) {
            // Leaf default: nothing to do, complete immediately.
            node.set_state(NodeState::Finished, now);
            return true;
        }

        if matches!(node.kind(), NodeKind::Action(_)) {
            node.set_state(NodeState::Active, now);
            let result = match node.kind_mut() {
                NodeKind::Action(action) => action.run(),
                _ => unreachable!(),
            };
            return match result {
                Ok(()) => {
                    node.set_state(NodeState::Finished, now);
                    true
                }
                Err(e) => {
                    error!(node = %id, error = %e, "action node failed");
                    node.set_state(NodeState::Error, now);
                    false
                }
            };
        }

        node.set_state(NodeState::Active, now);

        let mut alloc = || {
            *next_ticket += 1;
            WorkTicket(*next_ticket)
        };

        let result = match node.kind_mut() {
            NodeKind::Sequence(seq) => seq.start_all(id, now, &mut alloc, backend),
            _ => unreachable!(),
        };

        match result {
            Ok(()) => true,
            Err(e) => {
                // No rollback: items that already started keep running;
                // the next poll observes the failure.
                error!(node = %id, error = %e, "failed to start sequence node");
                false
            }
        }
    }
}

/// Match the target population against a sequence node's selectors and
/// claim every not-yet-claimed target for it, first node wins. Tag
/// selectors are scanned before asset-type selectors.
fn initialize_sequence_node(
    node: &mut GraphNode,
    discovered: &DiscoveredTargets,
    claimed: &mut HashSet<TargetId>,
    now: Instant,
) {
    let (checked, tags, asset_types) = match node.kind() {
        NodeKind::Sequence(seq) => (
            seq.info.validate(),
            seq.info.tags.clone(),
            seq.info.asset_types.clone(),
        ),
        _ => return,
    };

    // Timeouts are host-suppliable; a node with unusable thresholds must
    // fail here rather than when the poll pass first reads them.
    if let Err(e) = checked {
        error!(node = %node.id(), error = %e, "rejecting sequence node configuration");
        node.set_state(NodeState::Error, now);
        return;
    }

    let mut initialized = true;

    for tag in &tags {
        for target in discovered.with_tag(tag) {
            if claimed.insert(target.id) {
                if let Err(e) = node.add_target(target) {
                    error!(node = %node.id(), target = %target.name, error = %e, "failed to add target");
                    initialized = false;
                }
            }
        }
    }
    for asset in &asset_types {
        for target in discovered.with_asset(asset) {
            if claimed.insert(target.id) {
                if let Err(e) = node.add_target(target) {
                    error!(node = %node.id(), target = %target.name, error = %e, "failed to add target");
                    initialized = false;
                }
            }
        }
    }

    if initialized {
        node.ready(now);
    } else {
        error!(node = %node.id(), "failed to initialize sequence node");
        node.set_state(NodeState::Error, now);
    }
}

/// Run an action node's own setup; failure marks the node `Error` without
/// aborting sibling subtrees.
fn initialize_action_node(node: &mut GraphNode, discovered: &DiscoveredTargets, now: Instant) {
    let result = match node.kind_mut() {
        NodeKind::Action(action) => action.initialize(discovered),
        _ => return,
    };

    match result {
        Ok(()) => node.ready(now),
        Err(e) => {
            error!(node = %node.id(), error = %e, "action node failed to initialize");
            node.set_state(NodeState::Error, now);
        }
    }
}
