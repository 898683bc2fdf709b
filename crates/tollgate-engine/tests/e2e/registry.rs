//! Action registry tests.
//!
//! Tests registering actions beyond the builtins:
//! - Duplicate names are rejected
//! - A custom action is usable from a profile once registered

use std::sync::Arc;

use super::common::*;
use pretty_assertions::assert_eq;
use tollgate_core::{ProfileDefinition, ProfileKind, RuleDefinition};
use tollgate_engine::{
    Action, ActionExecutionError, ActionFactory, ActionParameterSpec, ActionRegistry, ActionScope,
    ActionType, InvalidActionParameters, MappedAttribute, ParameterKind, Profile, RegistryError,
    SchemaCatalog, TranslationAction, TranslationResult,
};
use tollgate_expr::Bindings;

/// Releases a fixed value under a configured attribute name.
struct ConstantFactory(ActionType);

#[derive(Debug)]
struct Constant {
    name: String,
    value: String,
}

const CONSTANT_PARAMS: &[ActionParameterSpec] = &[
    ActionParameterSpec::required("attributeName", ParameterKind::Text),
    ActionParameterSpec::required("value", ParameterKind::Text),
];

impl ConstantFactory {
    fn named(name: &'static str) -> Arc<dyn ActionFactory> {
        Arc::new(Self(ActionType {
            name,
            description: "Releases a constant attribute",
            scope: ActionScope::Output,
            params: CONSTANT_PARAMS,
        }))
    }
}

impl ActionFactory for ConstantFactory {
    fn action_type(&self) -> &ActionType {
        &self.0
    }

    fn new_instance(
        &self,
        params: &[Option<String>],
        catalog: &dyn SchemaCatalog,
    ) -> Result<Action, InvalidActionParameters> {
        self.0.validate(params, catalog)?;
        let text = |i: usize| params[i].clone().unwrap_or_default();
        Ok(Action::Translation(Arc::new(Constant {
            name: text(0),
            value: text(1),
        })))
    }
}

impl TranslationAction for Constant {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        result.put_attribute(MappedAttribute {
            name: self.name.clone(),
            group: "/".to_string(),
            values: vec![self.value.clone()],
            effect: None,
            visibility: None,
            persistent: false,
        });
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

/// A second "createAttribute" cannot be registered.
pub fn test_duplicate_registration(_ctx: &TestContext) {
    println!("  🧪 test_duplicate_registration");

    let mut registry = ActionRegistry::with_builtins().expect("builtins register");
    let err = registry
        .register(ConstantFactory::named("createAttribute"))
        .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateActionType("createAttribute".into()));
    assert_eq!(registry.len(), 23);

    let err = ActionRegistry::new(vec![
        ConstantFactory::named("constant"),
        ConstantFactory::named("constant"),
    ])
    .unwrap_err();
    assert_eq!(err, RegistryError::DuplicateActionType("constant".into()));

    println!("    ✅ Duplicate action names rejected");
}

pub fn test_custom_action(ctx: &TestContext) {
    println!("  🧪 test_custom_action");

    let mut registry = ActionRegistry::with_builtins().expect("builtins register");
    registry
        .register(ConstantFactory::named("constant"))
        .expect("new name registers");
    assert!(registry.names().contains(&"constant"));

    let definition = ProfileDefinition::new(
        "constants",
        ProfileKind::Output,
        vec![RuleDefinition::new("true", "constant", &["eduPersonAffiliation", "member"])],
    );
    let profile = Profile::compile(definition.clone(), &registry, ctx.repository.catalog())
        .expect("custom action compiles");
    let result = ctx
        .engine
        .translate(&profile, &release_context("sp"))
        .expect("translation should succeed");
    assert_eq!(
        result.attribute_values("eduPersonAffiliation"),
        Some(&["member".to_string()][..])
    );

    // the shared registry does not know the custom action
    assert!(Profile::compile(definition, &ctx.registry, ctx.repository.catalog()).is_err());

    println!("    ✅ Registered action usable from an output profile");
}

pub fn run_all_tests(ctx: &TestContext) {
    println!("\n📦 Registry tests");
    test_duplicate_registration(ctx);
    test_custom_action(ctx);
}
