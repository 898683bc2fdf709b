//! Scheduled bulk processing over local entities.
//!
//! A [`ScheduledRule`] pairs one condition with one entity action. A
//! [`BulkProcessor`] evaluates it for every entity the
//! [`IdentityDataProvider`] lists, building a separate context per entity.
//! Unlike translation, a failure for one entity is recorded and processing
//! moves on to the next.

pub mod cron;
pub mod directory;
pub mod processor;
pub mod scheduled;

pub use cron::CronExpression;
pub use directory::{DirectoryEntry, InMemoryDirectory};
pub use processor::{BulkProcessor, BulkRunReport, EntityFailure};
pub use scheduled::ScheduledRule;

use chrono::{DateTime, Utc};
use tollgate_core::{Attribute, Entity, EntityId, EntityState, ROOT_GROUP, ScheduledOperation};

use crate::context::TranslationContext;
use crate::error::BulkError;

/// Read access to local entities.
pub trait IdentityDataProvider: Send + Sync {
    fn list_entities(&self) -> anyhow::Result<Vec<EntityId>>;

    fn get_entity(&self, entity: EntityId) -> anyhow::Result<Entity>;

    /// Attributes of `entity` in `group`.
    fn get_attributes(&self, entity: EntityId, group: &str) -> anyhow::Result<Vec<Attribute>>;

    /// Group paths the entity is a member of.
    fn get_groups(&self, entity: EntityId) -> anyhow::Result<Vec<String>>;
}

/// Mutations entity actions may perform.
pub trait EntityManagement: Send + Sync {
    fn set_status(&self, entity: EntityId, status: EntityState) -> anyhow::Result<()>;

    fn schedule_operation(
        &self,
        entity: EntityId,
        operation: ScheduledOperation,
        due: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    fn remove_entity(&self, entity: EntityId) -> anyhow::Result<()>;

    fn set_credential_requirement(&self, entity: EntityId, requirement: &str) -> anyhow::Result<()>;

    fn remove_from_group(&self, entity: EntityId, group: &str) -> anyhow::Result<()>;
}

/// Builds the per-entity context a scheduled rule is evaluated against.
pub struct EntityContextBuilder<'a> {
    provider: &'a dyn IdentityDataProvider,
}

impl<'a> EntityContextBuilder<'a> {
    pub fn new(provider: &'a dyn IdentityDataProvider) -> Self {
        Self { provider }
    }

    /// Entity, identities, root-group attributes and group memberships.
    pub fn build(&self, entity: EntityId) -> Result<TranslationContext, BulkError> {
        let context_error = |e: anyhow::Error| BulkError::Context {
            entity,
            message: format!("{:#}", e),
        };
        let loaded = self.provider.get_entity(entity).map_err(context_error)?;
        let attributes = self
            .provider
            .get_attributes(entity, ROOT_GROUP)
            .map_err(context_error)?;
        let groups = self.provider.get_groups(entity).map_err(context_error)?;

        let mut context = TranslationContext::new()
            .with_entity(loaded.id, loaded.state)
            .with_groups(groups);
        context.identities = loaded.identities;
        context.attributes = attributes;
        Ok(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_core::Identity;
    use tollgate_expr::{Value, Variable};

    fn directory() -> InMemoryDirectory {
        let directory = InMemoryDirectory::new();
        directory.insert(DirectoryEntry {
            entity: Entity::new(5).with_identity(Identity::new("userName", "bob")),
            attributes: vec![
                Attribute::root("cn", &["Bob"]),
                Attribute::new("cn", "/staff", vec!["Robert".into()]),
            ],
            groups: vec!["/".into(), "/staff".into()],
        });
        directory
    }

    #[test]
    fn test_context_for_entity() {
        let directory = directory();
        let context = EntityContextBuilder::new(&directory).build(5).unwrap();
        assert_eq!(context.entity_id, Some(5));
        assert_eq!(context.status, Some(EntityState::Valid));
        assert_eq!(context.attributes, vec![Attribute::root("cn", &["Bob"])]);

        let bindings = context.bindings();
        assert_eq!(bindings.get(Variable::Id), Some(&Value::from("bob")));
        assert_eq!(bindings.get(Variable::Groups), Some(&Value::from(vec!["/", "/staff"])));
    }

    #[test]
    fn test_context_for_unknown_entity() {
        let err = EntityContextBuilder::new(&directory()).build(99).unwrap_err();
        assert!(matches!(err, BulkError::Context { entity: 99, .. }));
    }
}
