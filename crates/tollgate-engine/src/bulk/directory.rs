//! In-memory entity directory.
//!
//! Backs the CLI and tests. Snapshots are JSON arrays of [`DirectoryEntry`].

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, anyhow, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::{
    Attribute, Entity, EntityId, EntityScheduledChange, EntityState, ROOT_GROUP, ScheduledOperation,
    group_path,
};

use super::{EntityManagement, IdentityDataProvider};

/// One entity with its attributes and group memberships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub entity: Entity,
    #[serde(default)]
    pub attributes: Vec<Attribute>,
    #[serde(default)]
    pub groups: Vec<String>,
}

impl DirectoryEntry {
    /// Entry that is only a member of the root group.
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            attributes: Vec::new(),
            groups: vec![ROOT_GROUP.to_string()],
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    entries: RwLock<BTreeMap<EntityId, DirectoryEntry>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<DirectoryEntry>) -> Self {
        let directory = Self::new();
        for entry in entries {
            directory.insert(entry);
        }
        directory
    }

    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        let entries: Vec<DirectoryEntry> =
            serde_json::from_str(content).context("malformed directory snapshot")?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read directory snapshot {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries())?)
    }

    /// Add or replace an entry.
    pub fn insert(&self, entry: DirectoryEntry) {
        self.write().insert(entry.entity.id, entry);
    }

    pub fn entry(&self, entity: EntityId) -> Option<DirectoryEntry> {
        self.read().get(&entity).cloned()
    }

    pub fn entries(&self) -> Vec<DirectoryEntry> {
        self.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<EntityId, DirectoryEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<EntityId, DirectoryEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<F>(&self, entity: EntityId, change: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut DirectoryEntry) -> anyhow::Result<()>,
    {
        let mut entries = self.write();
        let entry = entries
            .get_mut(&entity)
            .ok_or_else(|| anyhow!("entity {} does not exist", entity))?;
        change(entry)
    }
}

impl IdentityDataProvider for InMemoryDirectory {
    fn list_entities(&self) -> anyhow::Result<Vec<EntityId>> {
        Ok(self.read().keys().copied().collect())
    }

    fn get_entity(&self, entity: EntityId) -> anyhow::Result<Entity> {
        self.read()
            .get(&entity)
            .map(|e| e.entity.clone())
            .ok_or_else(|| anyhow!("entity {} does not exist", entity))
    }

    fn get_attributes(&self, entity: EntityId, group: &str) -> anyhow::Result<Vec<Attribute>> {
        let entries = self.read();
        let entry = entries
            .get(&entity)
            .ok_or_else(|| anyhow!("entity {} does not exist", entity))?;
        Ok(entry
            .attributes
            .iter()
            .filter(|a| a.group == group)
            .cloned()
            .collect())
    }

    fn get_groups(&self, entity: EntityId) -> anyhow::Result<Vec<String>> {
        self.read()
            .get(&entity)
            .map(|e| e.groups.clone())
            .ok_or_else(|| anyhow!("entity {} does not exist", entity))
    }
}

impl EntityManagement for InMemoryDirectory {
    fn set_status(&self, entity: EntityId, status: EntityState) -> anyhow::Result<()> {
        self.update(entity, |entry| {
            entry.entity.state = status;
            Ok(())
        })
    }

    fn schedule_operation(
        &self,
        entity: EntityId,
        operation: ScheduledOperation,
        due: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.update(entity, |entry| {
            entry.entity.scheduled_change = Some(EntityScheduledChange { operation, due });
            Ok(())
        })
    }

    fn remove_entity(&self, entity: EntityId) -> anyhow::Result<()> {
        match self.write().remove(&entity) {
            Some(_) => Ok(()),
            None => bail!("entity {} does not exist", entity),
        }
    }

    fn set_credential_requirement(&self, entity: EntityId, requirement: &str) -> anyhow::Result<()> {
        self.update(entity, |entry| {
            entry.entity.credential_requirement = Some(requirement.to_string());
            Ok(())
        })
    }

    /// Removes the entity from `group` and every group below it.
    fn remove_from_group(&self, entity: EntityId, group: &str) -> anyhow::Result<()> {
        if group == ROOT_GROUP {
            bail!("entity {} cannot leave the root group", entity);
        }
        self.update(entity, |entry| {
            if !entry.groups.iter().any(|g| g == group) {
                bail!("entity {} is not a member of {}", entity, group);
            }
            let leaves = |path: &str| path == group || group_path::is_descendant(path, group);
            entry.groups.retain(|g| !leaves(g.as_str()));
            entry.attributes.retain(|a| !leaves(a.group.as_str()));
            Ok(())
        })
    }
}
