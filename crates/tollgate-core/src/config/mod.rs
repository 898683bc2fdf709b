//! Configuration and persisted document types for Tollgate.
//!
//! This module provides the document types shared by every Tollgate crate.
//! Engine settings are loaded from YAML (`tollgate.yaml`); profiles and scheduled
//! rules are persisted as JSON documents.
//!
//! # Configuration Files
//!
//! - **tollgate.yaml**: Engine settings, schema catalog and profile locations
//! - **profiles/*.json**: Translation profile documents (format version 2)
//! - **scheduled rules file**: JSON array of scheduled rule documents

pub mod profile;
pub mod scheduled_rule;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use profile::{
    ActionDefinition, ConditionDefinition, PROFILE_FORMAT_VERSION, ProfileDefinition, ProfileKind,
    RuleDefinition,
};
pub use scheduled_rule::{ScheduledRuleDefinition, ScheduledRuleParam};

/// Complete engine configuration loaded from `tollgate.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory scanned for `*.json` profile documents.
    #[serde(default)]
    pub profiles_dir: Option<PathBuf>,

    /// Individual profile documents.
    #[serde(default)]
    pub profile_files: Vec<PathBuf>,

    /// JSON file holding an array of scheduled rule documents.
    #[serde(default)]
    pub scheduled_rules_file: Option<PathBuf>,

    /// Attribute and identity types actions may reference.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Translation engine settings.
    #[serde(default)]
    pub engine: EngineSettings,

    /// Tracing filter directive used by the CLI when `--log` is not given.
    #[serde(default)]
    pub log_filter: Option<String>,
}

/// Known attribute and identity types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Attribute type names.
    #[serde(default)]
    pub attribute_types: Vec<String>,

    /// Identity type names.
    #[serde(default = "default_identity_types")]
    pub identity_types: Vec<String>,

    /// Accept any attribute/identity type name (syntax is still checked).
    #[serde(default)]
    pub permissive: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            attribute_types: Vec::new(),
            identity_types: default_identity_types(),
            permissive: false,
        }
    }
}

/// Translation engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Maximum nesting of included profiles.
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,

    /// Install the synthesized `sys:default` output profile at startup.
    #[serde(default = "default_true")]
    pub install_default_output_profile: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_include_depth: default_max_include_depth(),
            install_default_output_profile: true,
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_include_depth() -> usize {
    8
}

fn default_identity_types() -> Vec<String> {
    [
        "userName",
        "identifier",
        "email",
        "x500Name",
        "persistent",
        "transient",
        "targetedPersistent",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Error type for configuration and document loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve every path against the file's directory.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        config.profiles_dir = config.profiles_dir.map(|p| resolve(&base_dir, p));
        config.profile_files = config
            .profile_files
            .into_iter()
            .map(|p| resolve(&base_dir, p))
            .collect();
        config.scheduled_rules_file = config.scheduled_rules_file.map(|p| resolve(&base_dir, p));

        if config.engine.max_include_depth == 0 {
            return Err(ConfigError::Config(
                "engine.max_include_depth must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }

    /// All profile document paths: `*.json` under `profiles_dir` (sorted) then `profile_files`.
    pub fn profile_paths(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut paths = Vec::new();
        if let Some(dir) = &self.profiles_dir {
            if dir.is_dir() {
                let mut found = Vec::new();
                for entry in fs::read_dir(dir)? {
                    let path = entry?.path();
                    if path.extension().map(|e| e == "json").unwrap_or(false) {
                        found.push(path);
                    }
                }
                found.sort();
                paths.extend(found);
            }
        }
        paths.extend(self.profile_files.iter().cloned());
        Ok(paths)
    }

    /// Load the scheduled rule documents, if a file is configured.
    pub fn scheduled_rules(&self) -> Result<Vec<ScheduledRuleDefinition>, ConfigError> {
        match &self.scheduled_rules_file {
            Some(path) => {
                let content = fs::read_to_string(path)?;
                ScheduledRuleDefinition::list_from_json(&content)
            }
            None => Ok(Vec::new()),
        }
    }
}

fn resolve(base_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        base_dir.join(path)
    }
}
