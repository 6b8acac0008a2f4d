// src/config/mod.rs

//! Engine configuration.
//!
//! The core is a library, so configuration is intentionally small: the poll
//! cadence and the default build timeouts. Hosts may construct an
//! [`EngineConfig`] directly, or load one from TOML via [`loader`].

pub mod loader;
pub mod validate;

use std::time::Duration;

use serde::Deserialize;

/// Tunables for [`crate::manager::BuildManager`].
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Minimum interval between poll passes, in seconds. Calls to `poll`
    /// inside this window are no-ops.
    pub poll_interval_secs: f64,
    /// Default warn threshold for work items, in seconds.
    pub build_warn_timeout_secs: f64,
    /// Default fail threshold for work items, in seconds.
    pub build_fail_timeout_secs: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 0.1,
            build_warn_timeout_secs: 15.0,
            build_fail_timeout_secs: 60.0,
        }
    }
}

impl EngineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs_f64(self.poll_interval_secs)
    }

    pub fn warn_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.build_warn_timeout_secs)
    }

    pub fn fail_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.build_fail_timeout_secs)
    }
}
