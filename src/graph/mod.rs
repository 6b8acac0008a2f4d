// src/graph/mod.rs

//! Automation graph representation.
//!
//! - [`node`] holds the per-node state machine and the closed set of node
//!   kinds.
//! - [`structure`] owns the node arena, the edge list, the rebuild pass and
//!   both structural cycle checks.

pub mod node;
pub mod structure;

pub use node::{ActionNode, GraphNode, NodeId, NodeKind, NodeState};
pub use structure::{BuildGraph, Edge};
