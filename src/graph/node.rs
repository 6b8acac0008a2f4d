// src/graph/node.rs

//! Per-node lifecycle state machine.
//!
//! Every vertex in a [`crate::graph::BuildGraph`] carries a [`NodeState`]
//! plus start/finish timestamps, and one of a closed set of [`NodeKind`]s:
//!
//! - `Marker`: leaf default; activation completes immediately.
//! - `Sequence`: composite that fans out one work item per claimed target.
//! - `Action`: a host-supplied synchronous action behind the [`ActionNode`]
//!   trait.
//!
//! All state-transitioning methods take an explicit `now: Instant` so that
//! callers (and tests) control the clock.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::errors::{BuildGraphError, Result};
use crate::sequence::work_item::WorkItem;
use crate::sequence::SequenceNode;
use crate::target::{DiscoveredTargets, Target};

/// Lifecycle state of a graph node.
///
/// `Finished`, `Error` and `Expired` are all terminal for a run; they differ
/// only for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Uninitialized,
    Standby,
    Active,
    Finished,
    Expired,
    Error,
}

impl NodeState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            NodeState::Finished | NodeState::Error | NodeState::Expired
        )
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Uninitialized => "uninitialized",
            NodeState::Standby => "standby",
            NodeState::Active => "active",
            NodeState::Finished => "finished",
            NodeState::Expired => "expired",
            NodeState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Stable arena index of a node within its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// A host-supplied leaf action (e.g. clearing a cache, running a console
/// command). Runs synchronously during activation.
pub trait ActionNode: fmt::Debug + Send {
    /// Resolve whatever external state the action needs. Called once per
    /// initialization pass; an error marks the node `Error`.
    fn initialize(&mut self, targets: &DiscoveredTargets) -> anyhow::Result<()>;

    /// Perform the action. `Ok` finishes the node, `Err` fails it.
    fn run(&mut self) -> anyhow::Result<()>;
}

/// The closed set of node kinds.
#[derive(Debug)]
pub enum NodeKind {
    /// Pass-through leaf: activates straight to `Finished`.
    Marker,
    /// Composite node driving per-target asynchronous work.
    Sequence(SequenceNode),
    /// Pluggable synchronous action.
    Action(Box<dyn ActionNode>),
}

/// A vertex in the automation graph.
///
/// Parent/child sets are derived data, recomputed wholesale by
/// [`crate::graph::BuildGraph::rebuild`]; the graph container owns every
/// node and neighbors are referenced by id only.
#[derive(Debug)]
pub struct GraphNode {
    id: NodeId,
    pub title: String,
    state: NodeState,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
    pub(crate) parents: Vec<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
}

impl GraphNode {
    pub(crate) fn new(id: NodeId, kind: NodeKind, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            state: NodeState::Uninitialized,
            started_at: None,
            finished_at: None,
            parents: Vec::new(),
            children: Vec::new(),
            kind,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Transition to `state`, applying the timestamp side effects:
    /// entering `Active` stamps the start time, entering a terminal state
    /// stamps the finish time, and returning to `Uninitialized`/`Standby`
    /// clears both.
    pub(crate) fn set_state(&mut self, state: NodeState, now: Instant) {
        self.state = state;

        match state {
            NodeState::Uninitialized | NodeState::Standby => {
                self.started_at = None;
                self.finished_at = None;
            }
            NodeState::Active => {
                self.started_at = Some(now);
            }
            NodeState::Finished | NodeState::Error | NodeState::Expired => {
                self.finished_at = Some(now);
            }
        }
    }

    /// Move to `Standby`; no-op while the node is actively doing something.
    pub(crate) fn ready(&mut self, now: Instant) {
        if self.state == NodeState::Active {
            return;
        }
        self.set_state(NodeState::Standby, now);
    }

    /// Return to `Uninitialized`, discarding per-run state. Sequence nodes
    /// also drop their work items, forcing re-matching of targets before
    /// the node can run again.
    pub(crate) fn reset(&mut self, now: Instant) {
        if let NodeKind::Sequence(seq) = &mut self.kind {
            seq.clear();
        }
        self.set_state(NodeState::Uninitialized, now);
    }

    /// Bind a discovered target to this node's work-item collection.
    ///
    /// Only legal for sequence nodes, and only while the node is
    /// `Uninitialized` or `Standby`; the item set is frozen once the node
    /// is `Active`.
    pub(crate) fn add_target(&mut self, target: &Arc<Target>) -> Result<()> {
        if !matches!(self.state, NodeState::Uninitialized | NodeState::Standby) {
            return Err(BuildGraphError::InitFailed(format!(
                "{}: can't add targets while {}",
                self.id, self.state
            )));
        }

        match &mut self.kind {
            NodeKind::Sequence(seq) => {
                let item = WorkItem::initialize(target)?;
                seq.push_item(item);
                Ok(())
            }
            _ => Err(BuildGraphError::InitFailed(format!(
                "{} is not a sequence node",
                self.id
            ))),
        }
    }

    /// Current state, recomputing composite aggregation for sequence nodes.
    ///
    /// For `Marker` and `Action` kinds this is just the stored state; a
    /// sequence node re-derives its state from its work items on every
    /// query (timeout expiry is observed here, not on a timer).
    pub(crate) fn poll_state(&mut self, now: Instant) -> NodeState {
        let next = match &mut self.kind {
            NodeKind::Sequence(seq) => seq.observe(self.state, now),
            NodeKind::Marker | NodeKind::Action(_) => None,
        };

        if let Some(next) = next {
            if next != self.state {
                self.set_state(next, now);
            }
        }

        self.state
    }

    /// Elapsed run time: since activation while `Active`, total while
    /// terminal, `None` otherwise.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.state {
            NodeState::Active => self.started_at.map(|start| now - start),
            NodeState::Finished | NodeState::Error | NodeState::Expired => {
                match (self.started_at, self.finished_at) {
                    (Some(start), Some(finish)) => Some(finish - start),
                    // Leaf nodes can jump Standby -> Finished without ever
                    // being Active.
                    (None, Some(_)) => Some(Duration::ZERO),
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// Short status line for a presentation layer.
    pub fn status_message(&self, now: Instant) -> String {
        match self.state {
            NodeState::Active => match self.elapsed(now) {
                Some(elapsed) => format!("active for {:.2}s", elapsed.as_secs_f64()),
                None => "active".to_string(),
            },
            NodeState::Finished => match self.elapsed(now) {
                Some(elapsed) => format!("finished in {:.2}s", elapsed.as_secs_f64()),
                None => "finished".to_string(),
            },
            NodeState::Expired => "expired".to_string(),
            _ => String::new(),
        }
    }
}
