// src/lib.rs

//! Dependency-graph build automation.
//!
//! The crate is split into a pure, synchronous core and a thin async
//! shell:
//!
//! - [`graph`] holds the node arena, edge list and cycle checks.
//! - [`sequence`] is the composite node that fans a build out over
//!   matched targets, with timeout supervision per work item.
//! - [`manager`] owns the graph and drives the build pass by polling.
//! - [`exec`] is the seam to the actual build subsystem.
//! - [`engine`] is the optional tokio loop for hosts without their own
//!   tick source.
//!
//! Every state-transitioning call takes an explicit `now: Instant`, so
//! hosts and tests control time directly.

pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod graph;
pub mod logging;
pub mod manager;
pub mod sequence;
pub mod target;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use crate::errors::{BuildGraphError, Result};

use crate::engine::{EngineEvent, Runtime};
use crate::exec::BuildBackend;
use crate::manager::BuildManager;
use crate::target::TargetSource;

/// Spawn the async runtime around a fully constructed manager.
///
/// Returns the event sender the host uses to request runs, feed build
/// completions and shut the loop down, plus the join handle. The handle
/// resolves to the manager so final graph state can be inspected.
pub fn spawn_runtime<B, S>(
    manager: BuildManager<B, S>,
) -> (mpsc::Sender<EngineEvent>, JoinHandle<Result<BuildManager<B, S>>>)
where
    B: BuildBackend + 'static,
    S: TargetSource + Send + 'static,
{
    let (tx, rx) = mpsc::channel::<EngineEvent>(64);
    let runtime = Runtime::new(manager, rx);
    let handle = tokio::spawn(runtime.run());
    (tx, handle)
}
