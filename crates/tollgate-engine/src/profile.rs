//! Compiled translation profiles.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tollgate_core::{ConfigError, ProfileDefinition, ProfileKind};

use crate::action::{Action, ActionInstance, TranslationAction};
use crate::catalog::SchemaCatalog;
use crate::condition::Condition;
use crate::error::{ConfigurationError, InvalidActionParameters};
use crate::registry::ActionRegistry;

/// A condition paired with the action it guards.
#[derive(Debug, Clone)]
pub struct Rule {
    condition: Arc<Condition>,
    instance: ActionInstance<dyn TranslationAction>,
}

impl Rule {
    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn action_name(&self) -> &str {
        self.instance.type_name()
    }

    pub fn instance(&self) -> &ActionInstance<dyn TranslationAction> {
        &self.instance
    }

    pub fn action(&self) -> &dyn TranslationAction {
        self.instance.action()
    }
}

/// A named, ordered list of rules, compiled and ready to translate.
///
/// Immutable once built. The definition it was compiled from is kept so the
/// profile serializes back to the same document.
#[derive(Debug, Clone)]
pub struct Profile {
    definition: ProfileDefinition,
    rules: Vec<Rule>,
}

impl PartialEq for Profile {
    fn eq(&self, other: &Self) -> bool {
        self.definition == other.definition
    }
}

impl Profile {
    /// Compile `definition`, resolving every action through `registry`.
    ///
    /// Fails on the first invalid rule. Conditions with identical text are
    /// compiled once and shared.
    pub fn compile(
        definition: ProfileDefinition,
        registry: &ActionRegistry,
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, ConfigurationError> {
        definition.check_version()?;
        if definition.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        if definition.kind == ProfileKind::BulkEntityOps {
            return Err(ConfigurationError::UnsupportedKind(definition.kind));
        }

        let mut conditions: HashMap<String, Arc<Condition>> = HashMap::new();
        let mut rules = Vec::with_capacity(definition.rules.len());

        for (rule_index, rule) in definition.rules.iter().enumerate() {
            let expression = rule.condition.condition_value.as_str();
            let condition = match conditions.get(expression) {
                Some(existing) => Arc::clone(existing),
                None => {
                    let compiled = Condition::compile(expression).map_err(|cause| {
                        ConfigurationError::InvalidCondition {
                            rule_index,
                            expression: expression.to_string(),
                            cause,
                        }
                    })?;
                    let compiled = Arc::new(compiled);
                    conditions.insert(expression.to_string(), Arc::clone(&compiled));
                    compiled
                }
            };

            let action_name = rule.action.name.as_str();
            let factory = registry
                .get_by_name(action_name)
                .map_err(|source| ConfigurationError::UnknownAction { rule_index, source })?;
            if !factory.action_type().scope.applies_to(definition.kind) {
                return Err(ConfigurationError::ActionNotApplicable {
                    rule_index,
                    action: action_name.to_string(),
                    kind: definition.kind,
                });
            }

            let invalid = |cause: InvalidActionParameters| ConfigurationError::InvalidParameters {
                rule_index,
                action: action_name.to_string(),
                cause,
            };
            let Action::Translation(action) = factory
                .new_instance(&rule.action.parameters, catalog)
                .map_err(invalid)?
            else {
                return Err(ConfigurationError::ActionNotApplicable {
                    rule_index,
                    action: action_name.to_string(),
                    kind: definition.kind,
                });
            };

            rules.push(Rule {
                condition,
                instance: ActionInstance::new(action_name, rule.action.parameters.clone(), action),
            });
        }

        tracing::debug!(
            profile = %definition.name,
            kind = %definition.kind,
            rules = rules.len(),
            "compiled translation profile"
        );
        Ok(Self { definition, rules })
    }

    pub fn from_json(
        content: &str,
        registry: &ActionRegistry,
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, ConfigurationError> {
        Self::compile(ProfileDefinition::from_json(content)?, registry, catalog)
    }

    pub fn from_file(
        path: impl AsRef<Path>,
        registry: &ActionRegistry,
        catalog: &dyn SchemaCatalog,
    ) -> Result<Self, ConfigurationError> {
        Self::compile(ProfileDefinition::from_file(path)?, registry, catalog)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        self.definition.to_json()
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn description(&self) -> &str {
        &self.definition.description
    }

    pub fn kind(&self) -> ProfileKind {
        self.definition.kind
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn definition(&self) -> &ProfileDefinition {
        &self.definition
    }
}
