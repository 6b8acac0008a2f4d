// src/sequence/node.rs

//! The composite build-sequence node: fans one logical step out into one
//! work item per claimed target and aggregates their states into its own.

use std::collections::BTreeSet;
use std::sync::Weak;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tracing::error;

use crate::config::EngineConfig;
use crate::errors::{BuildGraphError, Result};
use crate::exec::{BuildBackend, WorkTicket};
use crate::graph::{NodeId, NodeState};
use crate::sequence::work_item::{WorkItem, WorkState};
use crate::target::Target;

/// Target query and timeout thresholds for one sequence node.
///
/// Selector sets are ordered so the claim pass is deterministic across
/// runs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuildInfo {
    /// Asset-type selectors: claim every target instanced from one of
    /// these.
    pub asset_types: BTreeSet<String>,
    /// Tag selectors: claim every target carrying one of these tags.
    pub tags: BTreeSet<String>,
    /// Elapsed building time after which a warning is logged.
    pub warn_timeout_secs: f64,
    /// Elapsed building time after which the item (and the whole node)
    /// expires.
    pub fail_timeout_secs: f64,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            asset_types: BTreeSet::new(),
            tags: BTreeSet::new(),
            warn_timeout_secs: 15.0,
            fail_timeout_secs: 60.0,
        }
    }
}

impl BuildInfo {
    /// Start from the engine-wide timeout defaults; selectors are filled
    /// in by the caller.
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            asset_types: BTreeSet::new(),
            tags: BTreeSet::new(),
            warn_timeout_secs: config.build_warn_timeout_secs,
            fail_timeout_secs: config.build_fail_timeout_secs,
        }
    }

    /// Reject thresholds that cannot be used as timeouts.
    ///
    /// The fields are host-suppliable (public, deserializable), so this is
    /// checked before a node built from them is initialized: thresholds
    /// must be positive, finite, representable as a `Duration`, and the
    /// warn threshold must not exceed the fail threshold.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("warn_timeout_secs", self.warn_timeout_secs),
            ("fail_timeout_secs", self.fail_timeout_secs),
        ] {
            if !(value > 0.0) || Duration::try_from_secs_f64(value).is_err() {
                return Err(BuildGraphError::ConfigError(format!(
                    "{name} must be a positive duration (got {value})"
                )));
            }
        }

        if self.warn_timeout_secs > self.fail_timeout_secs {
            return Err(BuildGraphError::ConfigError(format!(
                "warn_timeout_secs ({}) must not exceed fail_timeout_secs ({})",
                self.warn_timeout_secs, self.fail_timeout_secs
            )));
        }

        Ok(())
    }

    pub fn warn_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.warn_timeout_secs)
    }

    pub fn fail_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.fail_timeout_secs)
    }
}

/// Work-item collection plus its target query.
///
/// Work items are (re)populated only while the owning node is
/// `Uninitialized` or `Standby`; once `Active`, the set is frozen until the
/// node is reset.
#[derive(Debug)]
pub struct SequenceNode {
    pub info: BuildInfo,
    items: Vec<WorkItem>,
}

impl SequenceNode {
    pub fn new(info: BuildInfo) -> Self {
        Self {
            info,
            items: Vec::new(),
        }
    }

    pub fn items(&self) -> &[WorkItem] {
        &self.items
    }

    /// Weak references to every bound target, in registration order.
    pub fn targets(&self) -> Vec<Weak<Target>> {
        self.items.iter().map(WorkItem::target).collect()
    }

    pub(crate) fn push_item(&mut self, item: WorkItem) {
        self.items.push(item);
    }

    pub(crate) fn clear(&mut self) {
        self.items.clear();
    }

    /// Start every work item in registration order.
    ///
    /// The first item that fails to start aborts the pass; already-started
    /// items keep running (no rollback).
    pub(crate) fn start_all(
        &mut self,
        node: NodeId,
        now: Instant,
        next_ticket: &mut dyn FnMut() -> WorkTicket,
        backend: &mut dyn BuildBackend,
    ) -> Result<()> {
        for item in &mut self.items {
            let ticket = next_ticket();
            item.start(node, ticket, now, backend)?;
        }
        Ok(())
    }

    /// Aggregate work-item states into the owning node's state.
    ///
    /// Returns the state the node should transition to, or `None` to stay
    /// put. Only meaningful input states are `Uninitialized` (empty item
    /// set forces it) and `Active` (aggregation): one expired item poisons
    /// the whole node immediately; a `Standby` or failed item is an error;
    /// the node finishes only once every item has finished.
    pub(crate) fn observe(&mut self, current: NodeState, now: Instant) -> Option<NodeState> {
        if self.items.is_empty() {
            return (current != NodeState::Uninitialized).then_some(NodeState::Uninitialized);
        }

        if current != NodeState::Active {
            return None;
        }

        let warn_timeout = self.info.warn_timeout();
        let fail_timeout = self.info.fail_timeout();
        let mut num_finished = 0;

        for item in &mut self.items {
            match item.observe(now, warn_timeout, fail_timeout) {
                WorkState::Building => {}
                WorkState::Finished => num_finished += 1,
                WorkState::Expired => return Some(NodeState::Expired),
                WorkState::Standby | WorkState::Uninitialized | WorkState::Error => {
                    error!(
                        target = %item.target_name(),
                        state = ?item.state(),
                        "work item can't make progress; failing sequence node"
                    );
                    return Some(NodeState::Error);
                }
            }
        }

        (num_finished == self.items.len()).then_some(NodeState::Finished)
    }

    /// Route a completion callback to the matching work item. Returns
    /// whether any item applied it.
    pub(crate) fn complete(&mut self, ticket: WorkTicket, success: bool) -> bool {
        self.items
            .iter_mut()
            .any(|item| item.complete(ticket, success))
    }
}
