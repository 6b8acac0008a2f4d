// src/graph/structure.rs

//! The editable automation graph.
//!
//! [`BuildGraph`] owns every node in an arena keyed by [`NodeId`] and keeps
//! the authoritative edge list. Per-node parent/child sets and the root set
//! are derived data, recomputed wholesale by [`BuildGraph::rebuild`] after
//! every structural edit; rebuilding twice with no edge changes yields
//! identical adjacency.
//!
//! Cycles are rejected at connection-proposal time ([`BuildGraph::connect`])
//! by walking the ancestors of the source node. [`BuildGraph::validate`]
//! additionally offers a whole-graph acyclicity check via a topological
//! sort, for hosts that assemble edges out-of-band.

use std::collections::{HashMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::errors::{BuildGraphError, Result};
use crate::graph::node::{GraphNode, NodeId, NodeKind, NodeState};

/// A directed dependency edge: `from` must finish before `to` may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}

#[derive(Debug, Default)]
pub struct BuildGraph {
    nodes: HashMap<NodeId, GraphNode>,
    edges: Vec<Edge>,
    /// Nodes with an empty parent set after the last rebuild, in id order.
    roots: Vec<NodeId>,
    next_id: u64,
}

impl BuildGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node and recompute the root set.
    pub fn add_node(&mut self, kind: NodeKind, title: impl Into<String>) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, GraphNode::new(id, kind, title));
        self.rebuild();
        id
    }

    /// Remove a node along with its incident edges.
    pub fn remove_node(&mut self, id: NodeId) {
        if self.nodes.remove(&id).is_none() {
            warn!(node = %id, "remove_node: unknown node; ignoring");
            return;
        }
        self.edges.retain(|e| e.from != id && e.to != id);
        self.rebuild();
    }

    /// Propose and commit a new dependency edge `from -> to`.
    ///
    /// Rejected (leaving the graph unchanged) if:
    /// - either endpoint is unknown,
    /// - the edge would connect a node to itself,
    /// - the nodes are already connected in either direction,
    /// - `to` is an ancestor of `from` (the edge would close a cycle).
    pub fn connect(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        if !self.nodes.contains_key(&from) {
            return Err(BuildGraphError::NodeNotFound(from));
        }
        if !self.nodes.contains_key(&to) {
            return Err(BuildGraphError::NodeNotFound(to));
        }
        if from == to {
            return Err(BuildGraphError::EdgeRejected(format!(
                "can't connect {from} to itself"
            )));
        }

        let from_node = &self.nodes[&from];
        let to_node = &self.nodes[&to];
        if from_node.children.contains(&to) || to_node.children.contains(&from) {
            return Err(BuildGraphError::EdgeRejected(format!(
                "{from} and {to} are already connected"
            )));
        }

        // Walk all ancestors of `from` and make sure `to` isn't one of them.
        // Only set membership matters, so traversal order is arbitrary; the
        // visited set bounds the walk to O(V+E) on diamond-shaped graphs.
        let mut stack: Vec<NodeId> = from_node.parents.clone();
        let mut visited: HashSet<NodeId> = HashSet::new();

        while let Some(ancestor) = stack.pop() {
            if visited.insert(ancestor) {
                if let Some(node) = self.nodes.get(&ancestor) {
                    stack.extend_from_slice(&node.parents);
                }
            }
        }

        if visited.contains(&to) {
            return Err(BuildGraphError::GraphCycle(format!(
                "edge {from} -> {to} would close a cycle"
            )));
        }

        self.edges.push(Edge { from, to });
        self.rebuild();
        Ok(())
    }

    /// Remove the edge `from -> to` if present.
    pub fn disconnect(&mut self, from: NodeId, to: NodeId) {
        let before = self.edges.len();
        self.edges.retain(|e| !(e.from == from && e.to == to));
        if self.edges.len() == before {
            warn!(%from, %to, "disconnect: no such edge; ignoring");
            return;
        }
        self.rebuild();
    }

    /// Full recompute of every node's parent/child sets and of the root set
    /// from the edge list. Self-edges and duplicate relationships are
    /// skipped with a warning. Idempotent.
    pub fn rebuild(&mut self) {
        let mut parents: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        let mut children: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

        for edge in &self.edges {
            if edge.from == edge.to {
                warn!(node = %edge.from, "rebuild: node connected to itself; ignoring edge");
                continue;
            }
            if !self.nodes.contains_key(&edge.from) || !self.nodes.contains_key(&edge.to) {
                warn!(from = %edge.from, to = %edge.to, "rebuild: edge references missing node; ignoring");
                continue;
            }

            let kids = children.entry(edge.from).or_default();
            if kids.contains(&edge.to) {
                warn!(
                    from = %edge.from,
                    to = %edge.to,
                    "rebuild: duplicate parent/child relationship; ignoring edge"
                );
                continue;
            }
            kids.push(edge.to);
            parents.entry(edge.to).or_default().push(edge.from);
        }

        for node in self.nodes.values_mut() {
            let id = node.id();
            node.parents = parents.remove(&id).unwrap_or_default();
            node.children = children.remove(&id).unwrap_or_default();
        }

        let mut roots: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parents.is_empty())
            .map(|n| n.id())
            .collect();
        roots.sort();
        self.roots = roots;
    }

    /// Whole-graph acyclicity check over the edge list.
    ///
    /// This is independent of the per-edge proposal check in [`connect`]:
    /// a topological sort fails iff the committed structure has a cycle.
    ///
    /// [`connect`]: BuildGraph::connect
    pub fn validate(&self) -> Result<()> {
        let mut graph: DiGraphMap<NodeId, ()> = DiGraphMap::new();

        for id in self.nodes.keys() {
            graph.add_node(*id);
        }
        for edge in &self.edges {
            graph.add_edge(edge.from, edge.to, ());
        }

        match toposort(&graph, None) {
            Ok(_order) => Ok(()),
            Err(cycle) => Err(BuildGraphError::GraphCycle(format!(
                "cycle involving {}",
                cycle.node_id()
            ))),
        }
    }

    /// Clear transient per-run state on every node without touching
    /// structure.
    pub fn reset(&mut self, now: std::time::Instant) {
        for node in self.nodes.values_mut() {
            node.reset(now);
        }
    }

    /// A node may run only after all of its declared dependencies have
    /// completed: true iff the node is neither `Uninitialized` nor `Active`
    /// and every parent is `Finished`. Parentless nodes are always eligible
    /// once `Standby`.
    pub fn can_activate(&self, id: NodeId) -> bool {
        let Some(node) = self.nodes.get(&id) else {
            return false;
        };

        if matches!(node.state(), NodeState::Uninitialized | NodeState::Active) {
            return false;
        }

        node.parents.iter().all(|parent| {
            self.nodes
                .get(parent)
                .map(|p| p.state() == NodeState::Finished)
                .unwrap_or(false)
        })
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&GraphNode> {
        self.nodes.get(&id)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        self.nodes.get_mut(&id)
    }

    pub fn state_of(&self, id: NodeId) -> Option<NodeState> {
        self.nodes.get(&id).map(|n| n.state())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
