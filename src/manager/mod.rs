// src/manager/mod.rs

//! The build manager: target discovery, node initialization and the
//! polling scheduler that drives the graph to completion.

pub mod build_manager;

pub use build_manager::{BuildManager, NodeStatus};
