// src/sequence/work_item.rs

//! A single asynchronous unit of work bound to one target.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::errors::{BuildGraphError, Result};
use crate::exec::{BuildBackend, BuildRequest, WorkTicket};
use crate::graph::NodeId;
use crate::target::Target;

/// Build state of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkState {
    Uninitialized,
    Standby,
    Building,
    Finished,
    Expired,
    Error,
}

/// Binds one target to a build state and the ticket of its in-flight
/// build. Owned exclusively by its parent sequence node.
///
/// The target reference is weak: the host may destroy the target at any
/// time, in which case the next [`observe`] call reports `Error` instead of
/// keeping the target alive.
///
/// [`observe`]: WorkItem::observe
#[derive(Debug)]
pub struct WorkItem {
    target: Weak<Target>,
    /// Copy of the target name so logs stay useful after the target dies.
    target_name: String,
    state: WorkState,
    started_at: Option<Instant>,
    ticket: Option<WorkTicket>,
}

impl WorkItem {
    /// Bind a new work item to `target`, moving it to `Standby`.
    ///
    /// Fails if the target carries no buildable asset.
    pub(crate) fn initialize(target: &Arc<Target>) -> Result<Self> {
        if target.asset.is_none() {
            return Err(BuildGraphError::InitFailed(format!(
                "target '{}' has no buildable asset",
                target.name
            )));
        }

        Ok(Self {
            target: Arc::downgrade(target),
            target_name: target.name.clone(),
            state: WorkState::Standby,
            started_at: None,
            ticket: None,
        })
    }

    pub fn state(&self) -> WorkState {
        self.state
    }

    pub fn target(&self) -> Weak<Target> {
        self.target.clone()
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    /// Start the asynchronous build for this item.
    ///
    /// Records the start timestamp, transitions to `Building` and hands a
    /// request carrying `ticket` to the backend. Starting an item that is
    /// already `Building` is a warning-level no-op; starting an
    /// uninitialized item is an error.
    pub(crate) fn start(
        &mut self,
        node: NodeId,
        ticket: WorkTicket,
        now: Instant,
        backend: &mut dyn BuildBackend,
    ) -> Result<()> {
        match self.state {
            WorkState::Uninitialized => {
                error!(
                    target = %self.target_name,
                    "attempted to build uninitialized work item"
                );
                return Err(BuildGraphError::InitFailed(format!(
                    "work item for '{}' is uninitialized",
                    self.target_name
                )));
            }
            WorkState::Building => {
                warn!(
                    target = %self.target_name,
                    "attempted to build work item already in progress"
                );
                return Ok(());
            }
            _ => {}
        }

        let Some(target) = self.target.upgrade() else {
            error!(target = %self.target_name, "target is gone; can't start build");
            self.state = WorkState::Error;
            return Err(BuildGraphError::InitFailed(format!(
                "target '{}' no longer exists",
                self.target_name
            )));
        };

        self.state = WorkState::Building;
        self.started_at = Some(now);
        self.ticket = Some(ticket);

        backend.start_build(BuildRequest {
            node,
            ticket,
            target,
        })
    }

    /// Re-derive the current state, observing target loss and timeout
    /// expiry. Exceeding the warn threshold only logs; exceeding the fail
    /// threshold is terminal.
    pub(crate) fn observe(
        &mut self,
        now: Instant,
        warn_timeout: Duration,
        fail_timeout: Duration,
    ) -> WorkState {
        if self.target.upgrade().is_none() {
            if self.state != WorkState::Error {
                error!(target = %self.target_name, "target is gone; marking work item failed");
                self.state = WorkState::Error;
            }
            return self.state;
        }

        if self.state == WorkState::Building {
            if let Some(started) = self.started_at {
                let elapsed = now - started;
                if elapsed >= fail_timeout {
                    error!(
                        target = %self.target_name,
                        elapsed_secs = elapsed.as_secs_f64(),
                        "build exceeded fail timeout; marking expired"
                    );
                    self.state = WorkState::Expired;
                } else if elapsed >= warn_timeout {
                    warn!(
                        target = %self.target_name,
                        elapsed_secs = elapsed.as_secs_f64(),
                        "build is taking a long time"
                    );
                }
            }
        }

        self.state
    }

    /// Apply a completion callback from the build subsystem.
    ///
    /// The callback is honoured only while the item is `Building` and the
    /// ticket matches the current in-flight build; anything else is a
    /// stale or duplicate notification and is ignored. Returns whether the
    /// completion was applied.
    pub(crate) fn complete(&mut self, ticket: WorkTicket, success: bool) -> bool {
        if self.state != WorkState::Building || self.ticket != Some(ticket) {
            debug!(
                target = %self.target_name,
                %ticket,
                state = ?self.state,
                "ignoring stale build completion"
            );
            return false;
        }

        if success {
            self.state = WorkState::Finished;
        } else {
            error!(target = %self.target_name, "build reported failure");
            self.state = WorkState::Error;
        }
        true
    }
}
