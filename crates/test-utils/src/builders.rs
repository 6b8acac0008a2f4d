#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use buildgraph::sequence::{BuildInfo, SequenceNode};
use buildgraph::graph::NodeKind;
use buildgraph::target::{Target, TargetId, TargetSource};

/// Builder for `Target` to simplify test setup.
pub struct TargetBuilder {
    target: Target,
}

impl TargetBuilder {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            target: Target {
                id: TargetId(id),
                name: name.to_string(),
                tags: vec![],
                asset: None,
            },
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.target.tags.push(tag.to_string());
        self
    }

    pub fn asset(mut self, asset: &str) -> Self {
        self.target.asset = Some(asset.to_string());
        self
    }

    pub fn build(self) -> Arc<Target> {
        Arc::new(self.target)
    }
}

/// Builder for `BuildInfo`.
pub struct BuildInfoBuilder {
    info: BuildInfo,
}

impl BuildInfoBuilder {
    pub fn new() -> Self {
        Self {
            info: BuildInfo::default(),
        }
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.info.tags.insert(tag.to_string());
        self
    }

    pub fn asset_type(mut self, asset: &str) -> Self {
        self.info.asset_types.insert(asset.to_string());
        self
    }

    pub fn warn_timeout_secs(mut self, secs: f64) -> Self {
        self.info.warn_timeout_secs = secs;
        self
    }

    pub fn fail_timeout_secs(mut self, secs: f64) -> Self {
        self.info.fail_timeout_secs = secs;
        self
    }

    pub fn build(self) -> BuildInfo {
        self.info
    }

    /// Shorthand for wrapping the built info in a node kind.
    pub fn into_kind(self) -> NodeKind {
        NodeKind::Sequence(SequenceNode::new(self.build()))
    }
}

impl Default for BuildInfoBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A target source backed by a fixed population.
pub struct StaticTargetSource {
    targets: Vec<Arc<Target>>,
}

impl StaticTargetSource {
    pub fn new(targets: Vec<Arc<Target>>) -> Self {
        Self { targets }
    }

    pub fn empty() -> Self {
        Self { targets: vec![] }
    }
}

impl TargetSource for StaticTargetSource {
    fn discover(&self) -> Vec<Arc<Target>> {
        self.targets.clone()
    }
}

/// A target source whose population the test can mutate after the manager
/// has taken ownership of the source (e.g. to simulate a target being
/// destroyed mid-run).
pub struct SharedTargetSource {
    targets: Arc<Mutex<Vec<Arc<Target>>>>,
}

impl SharedTargetSource {
    pub fn new(targets: Vec<Arc<Target>>) -> (Self, Arc<Mutex<Vec<Arc<Target>>>>) {
        let targets = Arc::new(Mutex::new(targets));
        let handle = Arc::clone(&targets);
        (Self { targets }, handle)
    }
}

impl TargetSource for SharedTargetSource {
    fn discover(&self) -> Vec<Arc<Target>> {
        self.targets.lock().unwrap().clone()
    }
}
