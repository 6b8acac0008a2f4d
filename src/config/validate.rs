// src/config/validate.rs

use std::time::Duration;

use crate::config::EngineConfig;
use crate::errors::{BuildGraphError, Result};

/// A threshold in seconds is usable iff it is positive and representable
/// as a `Duration` (finite, no overflow).
fn valid_secs(value: f64) -> bool {
    value > 0.0 && Duration::try_from_secs_f64(value).is_ok()
}

pub fn validate_config(cfg: &EngineConfig) -> Result<()> {
    if !valid_secs(cfg.poll_interval_secs) {
        return Err(BuildGraphError::ConfigError(format!(
            "poll_interval_secs must be a positive duration (got {})",
            cfg.poll_interval_secs
        )));
    }

    if !valid_secs(cfg.build_warn_timeout_secs) || !valid_secs(cfg.build_fail_timeout_secs) {
        return Err(BuildGraphError::ConfigError(format!(
            "timeout thresholds must be positive durations (got warn={}, fail={})",
            cfg.build_warn_timeout_secs, cfg.build_fail_timeout_secs
        )));
    }

    if cfg.build_warn_timeout_secs > cfg.build_fail_timeout_secs {
        return Err(BuildGraphError::ConfigError(format!(
            "build_warn_timeout_secs ({}) must not exceed build_fail_timeout_secs ({})",
            cfg.build_warn_timeout_secs, cfg.build_fail_timeout_secs
        )));
    }

    Ok(())
}
