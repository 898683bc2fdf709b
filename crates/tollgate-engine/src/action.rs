//! Action types, factories and executable actions.

use std::fmt;
use std::sync::Arc;

use tollgate_core::{EntityId, ProfileKind};
use tollgate_expr::Bindings;

use crate::bulk::EntityManagement;
use crate::catalog::SchemaCatalog;
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::{ActionParameterSpec, ValidatedParameters};
use crate::result::TranslationResult;

/// Profile kinds an action type may appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionScope {
    Input,
    Output,
    /// Registration and enquiry forms.
    Form,
    /// Scheduled bulk entity operations.
    Entity,
    /// Any translation profile (input, output, registration, enquiry).
    AnyProfile,
}

impl ActionScope {
    pub fn applies_to(&self, kind: ProfileKind) -> bool {
        match self {
            ActionScope::Input => kind == ProfileKind::Input,
            ActionScope::Output => kind == ProfileKind::Output,
            ActionScope::Form => {
                matches!(kind, ProfileKind::Registration | ProfileKind::Enquiry)
            }
            ActionScope::Entity => kind == ProfileKind::BulkEntityOps,
            ActionScope::AnyProfile => kind != ProfileKind::BulkEntityOps,
        }
    }
}

impl fmt::Display for ActionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionScope::Input => "input",
            ActionScope::Output => "output",
            ActionScope::Form => "form",
            ActionScope::Entity => "entity",
            ActionScope::AnyProfile => "any profile",
        };
        f.write_str(s)
    }
}

/// Metadata of a pluggable action: name, scope and ordered parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionType {
    pub name: &'static str,
    pub description: &'static str,
    pub scope: ActionScope,
    pub params: &'static [ActionParameterSpec],
}

impl ActionType {
    pub fn validate(
        &self,
        raw: &[Option<String>],
        catalog: &dyn SchemaCatalog,
    ) -> Result<ValidatedParameters, InvalidActionParameters> {
        ValidatedParameters::validate(self.name, self.params, raw, catalog)
    }
}

/// An action that contributes to a [`TranslationResult`].
pub trait TranslationAction: Send + Sync + fmt::Debug {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError>;

    /// Profile whose rules run after this action, against the same context and result.
    fn included_profile(&self) -> Option<&str> {
        None
    }
}

/// An action that changes one entity as a side effect.
pub trait EntityAction: Send + Sync + fmt::Debug {
    fn invoke(
        &self,
        entity: EntityId,
        bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError>;
}

/// Executable action produced by a factory.
#[derive(Debug, Clone)]
pub enum Action {
    Translation(Arc<dyn TranslationAction>),
    Entity(Arc<dyn EntityAction>),
}

/// Validates raw parameters for one action type and builds its actions.
pub trait ActionFactory: Send + Sync {
    fn action_type(&self) -> &ActionType;

    fn new_instance(
        &self,
        params: &[Option<String>],
        catalog: &dyn SchemaCatalog,
    ) -> Result<Action, InvalidActionParameters>;
}

/// An action bound into a rule, with the raw parameters it was built from.
#[derive(Debug)]
pub struct ActionInstance<A: ?Sized> {
    type_name: String,
    parameters: Vec<Option<String>>,
    action: Arc<A>,
}

impl<A: ?Sized> Clone for ActionInstance<A> {
    fn clone(&self) -> Self {
        Self {
            type_name: self.type_name.clone(),
            parameters: self.parameters.clone(),
            action: Arc::clone(&self.action),
        }
    }
}

impl<A: ?Sized> ActionInstance<A> {
    pub fn new(type_name: impl Into<String>, parameters: Vec<Option<String>>, action: Arc<A>) -> Self {
        Self {
            type_name: type_name.into(),
            parameters,
            action,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parameters(&self) -> &[Option<String>] {
        &self.parameters
    }

    pub fn action(&self) -> &A {
        &self.action
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_applicability() {
        assert!(ActionScope::Input.applies_to(ProfileKind::Input));
        assert!(!ActionScope::Input.applies_to(ProfileKind::Output));
        assert!(ActionScope::Form.applies_to(ProfileKind::Enquiry));
        assert!(ActionScope::Form.applies_to(ProfileKind::Registration));
        assert!(ActionScope::Entity.applies_to(ProfileKind::BulkEntityOps));
        assert!(ActionScope::AnyProfile.applies_to(ProfileKind::Output));
        assert!(!ActionScope::AnyProfile.applies_to(ProfileKind::BulkEntityOps));
    }
}
