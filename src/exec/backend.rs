// src/exec/backend.rs

//! Pluggable build backend abstraction.
//!
//! The manager talks to a [`BuildBackend`] instead of a concrete build
//! subsystem. Production hosts wire in a [`ChannelBackend`] that forwards
//! requests to their asynchronous build machinery; tests can provide their
//! own implementation that records requests and completes them on demand.
//!
//! Completion is delivered out-of-band: the backend (or whatever sits
//! behind it) reports exactly one [`BuildCompletion`] per started ticket,
//! which the host feeds back into
//! [`crate::manager::BuildManager::apply_completion`]. A completion whose
//! ticket no longer matches a `Building` work item is stale and is dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::graph::NodeId;
use crate::target::Target;

/// One-shot token identifying a single started build.
///
/// Tickets are allocated monotonically by the manager; a work item only
/// honours a completion carrying the ticket of its current in-flight build,
/// which is what makes late callbacks from cancelled or reset runs
/// harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorkTicket(pub u64);

impl fmt::Display for WorkTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ticket#{}", self.0)
    }
}

/// A request to start building one target.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub node: NodeId,
    pub ticket: WorkTicket,
    pub target: Arc<Target>,
}

/// Result of one started build, reported exactly once per ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildCompletion {
    pub node: NodeId,
    pub ticket: WorkTicket,
    pub success: bool,
}

/// Trait abstracting how build requests reach the asynchronous build
/// subsystem.
///
/// `start_build` must not block: the manager calls it from its poll pass.
pub trait BuildBackend: Send {
    fn start_build(&mut self, request: BuildRequest) -> Result<()>;
}

/// Production backend: forwards requests over an unbounded channel to the
/// host's build subsystem.
pub struct ChannelBackend {
    tx: mpsc::UnboundedSender<BuildRequest>,
}

impl ChannelBackend {
    /// Create a backend plus the receiving end the build subsystem should
    /// consume.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BuildRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl BuildBackend for ChannelBackend {
    fn start_build(&mut self, request: BuildRequest) -> Result<()> {
        debug!(
            node = %request.node,
            ticket = %request.ticket,
            target = %request.target.name,
            "forwarding build request"
        );
        self.tx
            .send(request)
            .map_err(|e| anyhow::anyhow!("build subsystem hung up: {e}"))?;
        Ok(())
    }
}
