// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::graph::NodeId;

#[derive(Error, Debug)]
pub enum BuildGraphError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge rejected: {0}")]
    EdgeRejected(String),

    #[error("Cycle detected in build graph: {0}")]
    GraphCycle(String),

    #[error("A build run is already in progress")]
    RunInProgress,

    #[error("Node initialization failed: {0}")]
    InitFailed(String),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildGraphError>;
