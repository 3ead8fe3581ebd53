//! Engine configuration via `stratified.toml`
//!
//! A small TOML file that sets load defaults and registers extra load
//! strata into the global stratum order at startup. Missing fields fall
//! back to their defaults, so an empty file is a valid configuration.

use crate::serializer::LoadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use stratified_core::{global_order_mut, Result, TraitError, MAX_NESTING_DEPTH};
use tracing::debug;

/// Config file name
pub const CONFIG_FILE_NAME: &str = "stratified.toml";

/// Engine configuration loaded from `stratified.toml`.
///
/// # Example
///
/// ```toml
/// strict_load = false
/// max_nesting_depth = 64
/// load_strata = ["getCapabilities", "describeLayer"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Reject unknown JSON keys during loads.
    #[serde(default)]
    pub strict_load: bool,
    /// Maximum nesting depth of loaded JSON documents.
    #[serde(default = "default_max_nesting_depth")]
    pub max_nesting_depth: usize,
    /// Load strata to register, lowest priority first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_strata: Vec<String>,
}

fn default_max_nesting_depth() -> usize {
    MAX_NESTING_DEPTH
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_load: false,
            max_nesting_depth: default_max_nesting_depth(),
            load_strata: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Stratified engine configuration
#
# Reject JSON keys that no trait defines instead of skipping them (default: false)
strict_load = false

# Maximum nesting depth of loaded JSON documents (default: 64)
max_nesting_depth = 64

# Extra load strata, registered lowest priority first. They rank above
# "defaults" and below "underride".
# load_strata = ["getCapabilities", "describeLayer"]
"#
    }

    fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(TraitError::Config(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        if let Some(empty) = self.load_strata.iter().position(|id| id.trim().is_empty()) {
            return Err(TraitError::Config(format!(
                "load_strata[{}] is empty",
                empty
            )));
        }
        Ok(())
    }

    /// Parse config from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| TraitError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TraitError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: EngineConfig = toml::from_str(&content).map_err(|e| {
            TraitError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TraitError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load options derived from this config
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict_load,
            max_depth: self.max_nesting_depth,
        }
    }

    /// Register the configured load strata into the global stratum order
    pub fn apply(&self) -> Result<()> {
        self.validate()?;
        let mut order = global_order_mut();
        for id in &self.load_strata {
            let priority = order.add_load_stratum(id)?;
            debug!(
                target: "stratified::schema",
                stratum = %id,
                priority,
                "Registered load stratum"
            );
        }
        Ok(())
    }
}
