//! Installed translation profiles.
//!
//! Profiles are compiled on install and swapped in atomically. A document that
//! fails to compile never replaces the profile already installed under its name.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use tollgate_core::{ConfigError, ProfileDefinition, ProfileKind, RuleDefinition};

use crate::catalog::SchemaCatalog;
use crate::engine::ProfileResolver;
use crate::error::ConfigurationError;
use crate::profile::Profile;
use crate::registry::ActionRegistry;

/// Name of the synthesized output profile used when none is configured.
pub const DEFAULT_OUTPUT_PROFILE: &str = "sys:default";

/// Outcome of loading a set of profile documents.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Names of the profiles installed, in load order.
    pub installed: Vec<String>,
    pub failures: Vec<(PathBuf, ConfigurationError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Thread-safe map of profile name to compiled profile.
pub struct ProfileRepository {
    registry: Arc<ActionRegistry>,
    catalog: Arc<dyn SchemaCatalog>,
    profiles: RwLock<HashMap<String, Arc<Profile>>>,
}

impl ProfileRepository {
    pub fn new(registry: Arc<ActionRegistry>, catalog: Arc<dyn SchemaCatalog>) -> Self {
        Self {
            registry,
            catalog,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Repository with the default output profile already installed.
    pub fn with_default_output(
        registry: Arc<ActionRegistry>,
        catalog: Arc<dyn SchemaCatalog>,
    ) -> Result<Self, ConfigurationError> {
        let repository = Self::new(registry, catalog);
        repository.install_default_output()?;
        Ok(repository)
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &dyn SchemaCatalog {
        self.catalog.as_ref()
    }

    /// Compile and install `definition`, replacing any profile of the same name.
    pub fn install(&self, definition: ProfileDefinition) -> Result<Arc<Profile>, ConfigurationError> {
        let name = definition.name.clone();
        let profile = match Profile::compile(definition, &self.registry, self.catalog.as_ref()) {
            Ok(profile) => Arc::new(profile),
            Err(e) => {
                tracing::warn!("Rejected translation profile '{}': {}", name, e);
                return Err(e);
            }
        };
        let previous = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::clone(&profile));
        tracing::info!(
            "{} translation profile '{}' ({}, {} rules)",
            if previous.is_some() { "Replaced" } else { "Installed" },
            name,
            profile.kind(),
            profile.rules().len()
        );
        Ok(profile)
    }

    pub fn install_json(&self, content: &str) -> Result<Arc<Profile>, ConfigurationError> {
        self.install(ProfileDefinition::from_json(content)?)
    }

    /// Install the synthesized output profile that releases group membership.
    pub fn install_default_output(&self) -> Result<Arc<Profile>, ConfigurationError> {
        self.install(default_output_definition())
    }

    pub fn get(&self, name: &str) -> Option<Arc<Profile>> {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Profile>> {
        let removed = self
            .profiles
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        if removed.is_some() {
            tracing::info!("Removed translation profile '{}'", name);
        }
        removed
    }

    /// Installed profile names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Installed profiles of `kind`, sorted by name.
    pub fn profiles_of(&self, kind: ProfileKind) -> Vec<Arc<Profile>> {
        let mut profiles: Vec<Arc<Profile>> = self
            .profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|p| p.kind() == kind)
            .cloned()
            .collect();
        profiles.sort_by(|a, b| a.name().cmp(b.name()));
        profiles
    }

    pub fn len(&self) -> usize {
        self.profiles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Install every document in `paths`. Failures are collected, not fatal.
    pub fn load_paths<P: AsRef<Path>>(&self, paths: &[P]) -> LoadReport {
        let mut report = LoadReport::default();
        for path in paths {
            let path = path.as_ref();
            let result = ProfileDefinition::from_file(path)
                .map_err(ConfigurationError::from)
                .and_then(|definition| self.install(definition));
            match result {
                Ok(profile) => report.installed.push(profile.name().to_string()),
                Err(e) => {
                    tracing::warn!("Failed to load profile {}: {}", path.display(), e);
                    report.failures.push((path.to_path_buf(), e));
                }
            }
        }
        report
    }

    /// Install every `*.json` file directly under `dir`, in file name order.
    pub fn load_dir(&self, dir: impl AsRef<Path>) -> Result<LoadReport, ConfigError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "json") {
                paths.push(path);
            }
        }
        paths.sort();
        let report = self.load_paths(&paths);
        tracing::info!(
            "Loaded {} profiles from {} ({} failed)",
            report.installed.len(),
            dir.as_ref().display(),
            report.failures.len()
        );
        Ok(report)
    }
}

impl ProfileResolver for ProfileRepository {
    fn resolve(&self, name: &str) -> Option<Arc<Profile>> {
        self.get(name)
    }
}

fn default_output_definition() -> ProfileDefinition {
    ProfileDefinition::new(
        DEFAULT_OUTPUT_PROFILE,
        ProfileKind::Output,
        vec![RuleDefinition::new("true", "createAttribute", &["memberOf", "groups"])],
    )
    .with_description("Default output profile releasing group membership")
}
