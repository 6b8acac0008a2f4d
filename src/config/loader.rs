// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::EngineConfig;
use crate::errors::Result;

/// Load an [`EngineConfig`] from a given path.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation (positive intervals, etc.). Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: EngineConfig = toml::from_str(&contents)?;

    Ok(config)
}

/// Load an [`EngineConfig`] from a path and run basic validation.
///
/// This is the recommended entry point for hosts:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - non-positive poll interval,
///   - non-positive or inverted timeout thresholds.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let config = load_from_path(&path)?;
    crate::config::validate::validate_config(&config)?;
    Ok(config)
}

/// Parse an [`EngineConfig`] from a TOML string and validate it.
pub fn from_toml_str(contents: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(contents)?;
    crate::config::validate::validate_config(&config)?;
    Ok(config)
}
