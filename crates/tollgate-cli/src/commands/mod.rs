//! CLI command implementations for Tollgate.

pub mod actions;
pub mod bulk;
pub mod check;
pub mod translate;

use std::sync::Arc;

use anyhow::{Context, Result};
use tollgate_core::{EngineConfig, EngineSettings};
use tollgate_engine::{
    ActionRegistry, LoadReport, ProfileRepository, SchemaCatalog, StaticCatalog, TranslationEngine,
};

/// Registry, catalog and installed profiles shared by the commands.
pub struct Workspace {
    pub registry: Arc<ActionRegistry>,
    pub repository: Arc<ProfileRepository>,
    pub settings: EngineSettings,
    pub load_report: LoadReport,
}

impl Workspace {
    /// Build from the configuration, or a permissive catalog with no profiles when there is none.
    pub fn open(config: Option<&EngineConfig>) -> Result<Self> {
        let mut workspace = Self::empty(config)?;
        workspace.load_report = match config {
            Some(config) => {
                let paths = config.profile_paths().context("Failed to list profile documents")?;
                workspace.repository.load_paths(&paths)
            }
            None => LoadReport::default(),
        };
        Ok(workspace)
    }

    /// Like [`Workspace::open`] but without loading the configured profiles.
    pub fn empty(config: Option<&EngineConfig>) -> Result<Self> {
        let registry = Arc::new(ActionRegistry::with_builtins()?);
        let catalog: Arc<dyn SchemaCatalog> = match config {
            Some(config) => Arc::new(StaticCatalog::from_config(&config.catalog)),
            None => Arc::new(StaticCatalog::permissive()),
        };
        let settings = config.map(|c| c.engine.clone()).unwrap_or_default();

        let repository = Arc::new(ProfileRepository::new(Arc::clone(&registry), catalog));
        if settings.install_default_output_profile {
            repository.install_default_output()?;
        }

        Ok(Self {
            registry,
            repository,
            settings,
            load_report: LoadReport::default(),
        })
    }

    pub fn engine(&self) -> TranslationEngine {
        TranslationEngine::from_settings(&self.settings).with_resolver(self.repository.clone())
    }
}
