// src/target.rs

//! Build targets and the discovery boundary.
//!
//! The core never scans a live scene itself. The host implements
//! [`TargetSource`] and hands the manager a population of targets; the
//! manager indexes them once per initialization pass and matches them
//! against sequence-node selectors.
//!
//! Targets are owned by the host (as `Arc<Target>`); the core only ever
//! keeps weak references inside work items, so a target destroyed by the
//! host mid-run is observed as an error rather than kept alive.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Stable identity of a target, assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u64);

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// One buildable (or at least discoverable) world instance.
#[derive(Debug, Clone)]
pub struct Target {
    pub id: TargetId,
    /// Human-readable name, used only in logs and status text.
    pub name: String,
    /// Free-form tags attached by the host (e.g. "terrain", "props").
    pub tags: Vec<String>,
    /// The asset type this target was instanced from. Targets without one
    /// are discoverable by tag but cannot be built.
    pub asset: Option<String>,
}

/// Enumerates the current target population.
///
/// Must be cheap and stable enough to be called twice per run; the manager
/// calls it on every initialization pass.
pub trait TargetSource {
    fn discover(&self) -> Vec<Arc<Target>>;
}

/// The two lookup indices built from one pass over the population:
/// target-by-tag and target-by-asset-type.
#[derive(Debug, Default)]
pub struct DiscoveredTargets {
    all: Vec<Arc<Target>>,
    by_tag: HashMap<String, Vec<Arc<Target>>>,
    by_asset: HashMap<String, Vec<Arc<Target>>>,
}

impl DiscoveredTargets {
    pub fn index(targets: Vec<Arc<Target>>) -> Self {
        let mut by_tag: HashMap<String, Vec<Arc<Target>>> = HashMap::new();
        let mut by_asset: HashMap<String, Vec<Arc<Target>>> = HashMap::new();

        for target in &targets {
            for tag in &target.tags {
                by_tag.entry(tag.clone()).or_default().push(Arc::clone(target));
            }
            if let Some(asset) = &target.asset {
                by_asset
                    .entry(asset.clone())
                    .or_default()
                    .push(Arc::clone(target));
            }
        }

        Self {
            all: targets,
            by_tag,
            by_asset,
        }
    }

    pub fn all(&self) -> &[Arc<Target>] {
        &self.all
    }

    pub fn with_tag(&self, tag: &str) -> &[Arc<Target>] {
        self.by_tag.get(tag).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn with_asset(&self, asset: &str) -> &[Arc<Target>] {
        self.by_asset.get(asset).map(Vec::as_slice).unwrap_or(&[])
    }
}
