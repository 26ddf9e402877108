//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/lineage/lineage.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `LINEAGE_*` prefix

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::services::ClosureStrategy;
use crate::application::ApplicationError;
use crate::util::path::expand_env_vars;

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub store: Option<String>,
    pub closure_strategy: Option<ClosureStrategy>,
}

/// Unified configuration for lineage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Store descriptor, e.g. `memory:` or `file:~/.lineage/forest.toml`
    pub store: String,
    /// How ancestor/descendant closures are computed
    pub closure_strategy: ClosureStrategy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: "memory:".to_string(),
            closure_strategy: ClosureStrategy::default(),
        }
    }
}

/// Get the XDG config directory for lineage.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "lineage").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("lineage.toml"))
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in the store descriptor.
    fn expand_paths(&mut self) {
        self.store = expand_env_vars(&self.store);
    }

    /// Overlay wins where it specifies a value.
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            store: overlay.store.clone().unwrap_or_else(|| self.store.clone()),
            closure_strategy: overlay.closure_strategy.unwrap_or(self.closure_strategy),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `config_file` - Optional explicit config file; must exist if given
    pub fn load(config_file: Option<&Path>) -> Result<Self, ApplicationError> {
        // 1. Start with defaults
        let mut current = Self::default();

        // 2. Global config
        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!(path = %global_path.display(), "loading global config");
                current = current.merge_with(&load_raw_settings(&global_path)?);
            }
        }

        // 3. Explicit config file
        if let Some(path) = config_file {
            debug!(path = %path.display(), "loading config file");
            current = current.merge_with(&load_raw_settings(path)?);
        }

        // 4. Environment variables
        current = Self::apply_env_overrides(current)?;

        current.expand_paths();
        Ok(current)
    }

    /// Apply LINEAGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("LINEAGE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("store") {
            settings.store = val;
        }
        if let Ok(val) = config.get_string("closure_strategy") {
            settings.closure_strategy = val.parse()?;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# lineage configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/lineage/lineage.toml
#   File:   lineage --config <file>
#   Env:    LINEAGE_* environment variables (LINEAGE_STORE, LINEAGE_CLOSURE_STRATEGY)
#   Flag:   lineage --store <descriptor>

# Where the forest lives:
#   "memory:"                       volatile, gone when the process exits
#   "file:~/.lineage/forest.toml"   TOML file, rewritten on every committed change
# store = "memory:"

# How ancestor/descendant closures are computed:
#   "walk"  hop by hop through parent/children lookups
#   "scan"  one native closure scan per query
# closure_strategy = "walk"
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
