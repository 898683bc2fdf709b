//! Registry of action factories.
//!
//! The registry is built once at startup from a list of factories and is
//! read-only afterwards; share it behind an `Arc`. Registering two factories
//! under the same name is a startup error.

use std::collections::BTreeMap;
use std::sync::Arc;

use tollgate_core::ProfileKind;

use crate::action::{ActionFactory, ActionType};
use crate::actions::builtin_factories;
use crate::error::RegistryError;

/// Action factories indexed by action type name.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    factories: BTreeMap<String, Arc<dyn ActionFactory>>,
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}

impl ActionRegistry {
    /// Build a registry from `factories`, failing on the first duplicate name.
    pub fn new(factories: Vec<Arc<dyn ActionFactory>>) -> Result<Self, RegistryError> {
        let mut registry = Self::empty();
        for factory in factories {
            registry.register(factory)?;
        }
        tracing::info!(actions = registry.len(), "action registry initialized");
        Ok(registry)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding every built-in action type.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        Self::new(builtin_factories())
    }

    /// Add a factory. The name must not be taken.
    pub fn register(&mut self, factory: Arc<dyn ActionFactory>) -> Result<(), RegistryError> {
        let name = factory.action_type().name;
        if self.factories.contains_key(name) {
            return Err(RegistryError::DuplicateActionType(name.to_string()));
        }
        self.factories.insert(name.to_string(), factory);
        Ok(())
    }

    pub fn get_by_name(&self, name: &str) -> Result<&Arc<dyn ActionFactory>, RegistryError> {
        self.factories
            .get(name)
            .ok_or_else(|| RegistryError::UnknownActionType(name.to_string()))
    }

    /// Factories whose actions may appear in profiles of `kind`.
    pub fn factories_for(&self, kind: ProfileKind) -> Vec<&Arc<dyn ActionFactory>> {
        self.factories
            .values()
            .filter(|f| f.action_type().scope.applies_to(kind))
            .collect()
    }

    /// Action types usable in profiles of `kind`, sorted by name.
    pub fn types_for(&self, kind: ProfileKind) -> Vec<&ActionType> {
        self.factories_for(kind)
            .into_iter()
            .map(|f| f.action_type())
            .collect()
    }

    pub fn types(&self) -> Vec<&ActionType> {
        self.factories.values().map(|f| f.action_type()).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;
    use crate::catalog::SchemaCatalog;
    use crate::error::InvalidActionParameters;

    struct Dummy(ActionType);

    impl ActionFactory for Dummy {
        fn action_type(&self) -> &ActionType {
            &self.0
        }

        fn new_instance(
            &self,
            _params: &[Option<String>],
            _catalog: &dyn SchemaCatalog,
        ) -> Result<Action, InvalidActionParameters> {
            Err(InvalidActionParameters::wrong_kind(self.0.name, 0, "nothing"))
        }
    }

    #[test]
    fn test_builtins_registered() {
        let registry = ActionRegistry::with_builtins().unwrap();
        assert_eq!(registry.len(), 23);
        assert!(registry.get_by_name("mapIdentity").is_ok());
        assert_eq!(
            registry.get_by_name("nope").err(),
            Some(RegistryError::UnknownActionType("nope".into()))
        );
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut factories = builtin_factories();
        factories.push(Arc::new(Dummy(crate::actions::common::STOP)));
        let err = ActionRegistry::new(factories).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateActionType("stop".into()));
    }

    #[test]
    fn test_types_for_kind() {
        let registry = ActionRegistry::with_builtins().unwrap();
        let output: Vec<&str> = registry
            .types_for(ProfileKind::Output)
            .iter()
            .map(|t| t.name)
            .collect();
        assert!(output.contains(&"createAttribute"));
        assert!(output.contains(&"stop"));
        assert!(!output.contains(&"mapIdentity"));
        assert_eq!(registry.factories_for(ProfileKind::Output).len(), output.len());

        let bulk: Vec<&str> = registry
            .types_for(ProfileKind::BulkEntityOps)
            .iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            bulk,
            vec![
                "changeCredentialRequirement",
                "changeStatus",
                "removeEntity",
                "removeFromGroup",
                "scheduleOperation",
            ]
        );
    }
}
