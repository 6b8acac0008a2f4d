// src/sequence/mod.rs

//! Composite build-sequence nodes and their per-target work items.
//!
//! - [`node`] holds [`SequenceNode`] and its [`BuildInfo`] query.
//! - [`work_item`] holds the timeout-supervised async work unit.

pub mod node;
pub mod work_item;

pub use node::{BuildInfo, SequenceNode};
pub use work_item::{WorkItem, WorkState};
