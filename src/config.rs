//! Converter configuration.
//!
//! Loaded from an optional TOML file given with `--config`. Stock defaults
//! are the base layer; the user file is merged on top, so it only needs the
//! keys it wants to change. Command-line flags override both.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Stock values; every key may be left out
//!
//! [pipeline]
//! retries = 1                  # Extra passes over files that failed (0 = none)
//!
//! [manifest]
//! file_name = "manifest.json"  # Written inside the output folder
//! pretty = false               # Indented JSON instead of a single line
//! ```
//!
//! A key that no section defines is a parse error, not a silent no-op.

use crate::types::Tier;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file is not valid TOML for raw-thumbs: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot render stock config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    /// Retry behaviour for failed files.
    pub pipeline: PipelineConfig,
    /// Manifest file settings.
    pub manifest: ManifestConfig,
}

impl ConverterConfig {
    /// Validate values the type system cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.manifest.file_name.as_str();
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "manifest.file_name must not be empty".into(),
            ));
        }
        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "manifest.file_name must be a plain file name, got {name:?}"
            )));
        }
        if Tier::ALL.iter().any(|tier| tier.folder() == name) {
            return Err(ConfigError::Validation(format!(
                "manifest.file_name {name:?} collides with a tier folder"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Passes over files that failed in the previous pass.
    pub retries: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { retries: 1 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    pub file_name: String,
    pub pretty: bool,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            file_name: "manifest.json".to_string(),
            pretty: false,
        }
    }
}

// =============================================================================
// Layering
// =============================================================================

/// `ConverterConfig::default()` as a TOML table, the bottom layer.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConverterConfig::default())?)
}

/// Lay `overlay` over `base`.
///
/// Sections merge key by key, so `[pipeline] retries = 0` leaves the
/// `[manifest]` settings alone. Any other value in `overlay` wins outright.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Build the final config from the stock layer and an optional user layer.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load the config file at `path`, or the stock defaults when `None`.
///
/// A path that was given but cannot be read is an error.
pub fn load_config(path: Option<&Path>) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            Some(toml::from_str::<toml::Value>(&content)?)
        }
        None => None,
    };
    resolve_config(base, overlay)
}

/// Text printed by `--gen-config`. Parses back to the defaults.
pub fn stock_config_toml() -> &'static str {
    r##"# raw-thumbs configuration
# ========================
# Every value below is the built-in default; delete the lines you keep as is.
# Load with --config. --retries and --pretty win over this file.
# Misspelled keys are reported instead of ignored.

# ---------------------------------------------------------------------------
# Pipeline
# ---------------------------------------------------------------------------
[pipeline]
# Files that fail are retried after every other file has been tried.
# Each retry pass runs every still-failing file once more.
# 0 disables retries.
retries = 1

# ---------------------------------------------------------------------------
# Manifest
# ---------------------------------------------------------------------------
[manifest]
# File name of the manifest, written next to the full/gallery/thumbnail
# folders. Must be a plain file name.
file_name = "manifest.json"

# Write indented JSON instead of a single line.
pretty = false
"##
}
