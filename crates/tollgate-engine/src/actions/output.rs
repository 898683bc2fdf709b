//! Output actions: shape the attribute set released to a relying party.

use std::sync::Arc;

use regex::Regex;
use tollgate_core::ROOT_GROUP;
use tollgate_expr::{Bindings, CompiledExpression};

use super::input::IncludeProfile;
use super::{BuiltinFactory, anchored, evaluate};
use crate::action::{Action, ActionFactory, ActionScope, ActionType, TranslationAction};
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::{ActionParameterSpec, ParameterKind, ValidatedParameters};
use crate::result::{AttributeEffect, IdentityEffect, MappedAttribute, MappedIdentity, TranslationResult};

pub const CREATE_ATTRIBUTE: ActionType = ActionType {
    name: "createAttribute",
    description: "Releases an attribute computed from an expression",
    scope: ActionScope::Output,
    params: &[
        ActionParameterSpec::required("attributeName", ParameterKind::Text),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
    ],
};

pub const CREATE_PERSISTENT_ATTRIBUTE: ActionType = ActionType {
    name: "createPersistentAttribute",
    description: "Releases an attribute and stores it on the local entity",
    scope: ActionScope::Output,
    params: &[
        ActionParameterSpec::required("attributeType", ParameterKind::AttributeType),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
        ActionParameterSpec::required("group", ParameterKind::GroupPath),
    ],
};

pub const CREATE_PERSISTENT_IDENTITY: ActionType = ActionType {
    name: "createPersistentIdentity",
    description: "Releases an identity and stores it on the local entity",
    scope: ActionScope::Output,
    params: &[
        ActionParameterSpec::required("identityType", ParameterKind::IdentityType),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
    ],
};

pub const FILTER_ATTRIBUTE: ActionType = ActionType {
    name: "filterAttribute",
    description: "Withholds attributes whose name matches a regex",
    scope: ActionScope::Output,
    params: &[ActionParameterSpec::required("attributeRegex", ParameterKind::Regex)],
};

pub const FILTER_ATTRIBUTE_VALUES: ActionType = ActionType {
    name: "filterAttributeValues",
    description: "Withholds the values of an attribute that match a regex",
    scope: ActionScope::Output,
    params: &[
        ActionParameterSpec::required("attributeName", ParameterKind::Text),
        ActionParameterSpec::required("valueRegex", ParameterKind::Regex),
    ],
};

pub const INCLUDE_OUTPUT_PROFILE: ActionType = ActionType {
    name: "includeOutputProfile",
    description: "Runs the rules of another output profile",
    scope: ActionScope::Output,
    params: &[ActionParameterSpec::required("profile", ParameterKind::ProfileName)],
};

pub(crate) fn factories() -> Vec<Arc<dyn ActionFactory>> {
    vec![
        BuiltinFactory::new(CREATE_ATTRIBUTE, CreateAttribute::build),
        BuiltinFactory::new(CREATE_PERSISTENT_ATTRIBUTE, CreateAttribute::build_persistent),
        BuiltinFactory::new(CREATE_PERSISTENT_IDENTITY, CreatePersistentIdentity::build),
        BuiltinFactory::new(FILTER_ATTRIBUTE, FilterAttribute::build),
        BuiltinFactory::new(FILTER_ATTRIBUTE_VALUES, FilterAttributeValues::build),
        BuiltinFactory::new(INCLUDE_OUTPUT_PROFILE, |p| {
            Ok(Action::Translation(Arc::new(IncludeProfile {
                profile: p.text(0)?.to_string(),
            })))
        }),
    ]
}

#[derive(Debug)]
struct CreateAttribute {
    name: String,
    group: String,
    expression: CompiledExpression,
    persistent: bool,
}

impl CreateAttribute {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            name: p.text(0)?.to_string(),
            group: ROOT_GROUP.to_string(),
            expression: p.expression(1)?.clone(),
            persistent: false,
        })))
    }

    fn build_persistent(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            name: p.text(0)?.to_string(),
            group: p.text(2)?.to_string(),
            expression: p.expression(1)?.clone(),
            persistent: true,
        })))
    }
}

impl TranslationAction for CreateAttribute {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let value = evaluate(&self.expression, "expression", bindings)?;
        if value.is_null() {
            tracing::debug!(attribute = %self.name, "attribute expression is null, skipping");
            return Ok(());
        }
        result.put_attribute(MappedAttribute {
            name: self.name.clone(),
            group: self.group.clone(),
            values: value.to_strings(),
            effect: self.persistent.then_some(AttributeEffect::CreateOrUpdate),
            visibility: None,
            persistent: self.persistent,
        });
        Ok(())
    }
}

#[derive(Debug)]
struct CreatePersistentIdentity {
    identity_type: String,
    expression: CompiledExpression,
}

impl CreatePersistentIdentity {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            identity_type: p.text(0)?.to_string(),
            expression: p.expression(1)?.clone(),
        })))
    }
}

impl TranslationAction for CreatePersistentIdentity {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let value = evaluate(&self.expression, "expression", bindings)?;
        if value.is_null() {
            tracing::debug!(identity_type = %self.identity_type, "identity expression is null, skipping");
            return Ok(());
        }
        for identity in value.to_strings() {
            result.put_identity(MappedIdentity {
                type_id: self.identity_type.clone(),
                value: identity,
                effect: IdentityEffect::CreateOrMatch,
                credential_requirement: None,
                persistent: true,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FilterAttribute {
    source: String,
    pattern: Regex,
}

impl FilterAttribute {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let regex = p.regex(0)?;
        Ok(Action::Translation(Arc::new(Self {
            source: regex.as_str().to_string(),
            pattern: anchored(FILTER_ATTRIBUTE.name, "attributeRegex", regex)?,
        })))
    }
}

impl TranslationAction for FilterAttribute {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let before = result.attributes.len();
        result.attributes.retain(|a| !self.pattern.is_match(&a.name));
        tracing::debug!(
            pattern = %self.source,
            removed = before - result.attributes.len(),
            "filtered attributes"
        );
        if !result.attribute_filters.contains(&self.source) {
            result.attribute_filters.push(self.source.clone());
        }
        Ok(())
    }
}

#[derive(Debug)]
struct FilterAttributeValues {
    attribute: String,
    pattern: Regex,
}

impl FilterAttributeValues {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            attribute: p.text(0)?.to_string(),
            pattern: anchored(FILTER_ATTRIBUTE_VALUES.name, "valueRegex", p.regex(1)?)?,
        })))
    }
}

impl TranslationAction for FilterAttributeValues {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        for attribute in result
            .attributes
            .iter_mut()
            .filter(|a| a.name == self.attribute)
        {
            attribute.values.retain(|v| !self.pattern.is_match(v));
        }
        Ok(())
    }
}
