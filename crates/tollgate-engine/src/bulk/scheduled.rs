//! Compiled scheduled rules.

use std::sync::Arc;

use tollgate_core::{ProfileKind, ScheduledRuleDefinition};

use super::{CronExpression, EntityManagement};
use crate::action::{Action, EntityAction};
use crate::catalog::SchemaCatalog;
use crate::condition::Condition;
use crate::context::TranslationContext;
use crate::error::{BulkError, ConfigurationError};
use crate::registry::ActionRegistry;

/// A scheduled rule ready to run against entities.
#[derive(Debug, Clone)]
pub struct ScheduledRule {
    definition: ScheduledRuleDefinition,
    schedule: CronExpression,
    condition: Arc<Condition>,
    action: Arc<dyn EntityAction>,
}

impl ScheduledRule {
    /// Compile a persisted rule. Errors report rule index 0.
    pub fn compile(
        definition: ScheduledRuleDefinition,
        registry: &ActionRegistry,
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, ConfigurationError> {
        let schedule = CronExpression::parse(&definition.cron_expression)?;
        let condition = Condition::compile(definition.condition.as_str()).map_err(|cause| {
            ConfigurationError::InvalidCondition {
                rule_index: 0,
                expression: definition.condition.clone(),
                cause,
            }
        })?;

        let factory = registry
            .get_by_name(&definition.action)
            .map_err(|source| ConfigurationError::UnknownAction { rule_index: 0, source })?;
        let not_applicable = || ConfigurationError::ActionNotApplicable {
            rule_index: 0,
            action: definition.action.clone(),
            kind: ProfileKind::BulkEntityOps,
        };
        if !factory.action_type().scope.applies_to(ProfileKind::BulkEntityOps) {
            return Err(not_applicable());
        }

        let params: Vec<Option<String>> = definition.action_params.iter().cloned().map(Some).collect();
        let action = match factory.new_instance(&params, catalog) {
            Ok(Action::Entity(action)) => action,
            Ok(Action::Translation(_)) => return Err(not_applicable()),
            Err(cause) => {
                return Err(ConfigurationError::InvalidParameters {
                    rule_index: 0,
                    action: definition.action.clone(),
                    cause,
                });
            }
        };

        Ok(Self {
            definition,
            schedule,
            condition: Arc::new(condition),
            action,
        })
    }

    pub fn from_json(
        content: &str,
        registry: &ActionRegistry,
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, ConfigurationError> {
        Self::compile(ScheduledRuleDefinition::from_json(content)?, registry, catalog)
    }

    pub fn id(&self) -> &str {
        &self.definition.id
    }

    pub fn schedule(&self) -> &CronExpression {
        &self.schedule
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn action_name(&self) -> &str {
        &self.definition.action
    }

    pub fn definition(&self) -> &ScheduledRuleDefinition {
        &self.definition
    }

    /// Evaluate the rule for the entity named by `context`.
    ///
    /// Returns `Ok(false)` when the condition does not hold.
    pub fn apply(
        &self,
        context: &TranslationContext,
        management: &dyn EntityManagement,
    ) -> Result<bool, BulkError> {
        let entity = context.entity_id.ok_or(BulkError::MissingEntity)?;
        let bindings = context.bindings();

        let matched = self
            .condition
            .evaluate(&bindings)
            .map_err(|cause| BulkError::Condition { entity, cause })?;
        if !matched {
            tracing::debug!(rule = %self.id(), entity, "condition not met");
            return Ok(false);
        }

        self.action
            .invoke(entity, &bindings, management)
            .map_err(|cause| BulkError::Action {
                entity,
                action: self.action_name().to_string(),
                cause,
            })?;
        tracing::debug!(rule = %self.id(), entity, action = %self.action_name(), "entity action applied");
        Ok(true)
    }
}

impl PartialEq for ScheduledRule {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}
