//! Input actions: map a remote authentication response into local identity state.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tollgate_core::{EntityScheduledChange, ScheduledOperation, group_path};
use tollgate_expr::{Bindings, CompiledExpression, Value};

use super::{BuiltinFactory, evaluate};
use crate::action::{Action, ActionFactory, ActionScope, ActionType, TranslationAction};
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::{ActionParameterSpec, ParameterKind, ValidatedParameters};
use crate::result::{
    AttributeEffect, AttributeVisibility, GroupEffect, IdentityEffect, MappedAttribute,
    MappedGroup, MappedIdentity, TranslationResult,
};

const IDENTITY_EFFECTS: &[&str] = &["CREATE_OR_MATCH", "MATCH", "REQUIRE_MATCH", "UPDATE_OR_MATCH"];
const ATTRIBUTE_EFFECTS: &[&str] = &["CREATE_ONLY", "CREATE_OR_UPDATE", "UPDATE_ONLY"];
const VISIBILITIES: &[&str] = &["full", "local"];
const GROUP_EFFECTS: &[&str] = &["REQUIRE_EXISTING_GROUP", "CREATE_GROUP_IF_MISSING", "ADD_IF_EXISTS"];
pub(crate) const OPERATIONS: &[&str] = &["REMOVE", "DISABLE"];

pub const MAP_IDENTITY: ActionType = ActionType {
    name: "mapIdentity",
    description: "Maps remote data to a local identity of the given type",
    scope: ActionScope::Input,
    params: &[
        ActionParameterSpec::required("identityType", ParameterKind::IdentityType),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
        ActionParameterSpec::optional("credentialRequirement", ParameterKind::Text),
        ActionParameterSpec::required("effect", ParameterKind::Choice(IDENTITY_EFFECTS)),
    ],
};

pub const MAP_ATTRIBUTE: ActionType = ActionType {
    name: "mapAttribute",
    description: "Maps remote data to a local attribute in a group",
    scope: ActionScope::Input,
    params: &[
        ActionParameterSpec::required("attributeType", ParameterKind::AttributeType),
        ActionParameterSpec::required("group", ParameterKind::GroupPath),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
        ActionParameterSpec::required("visibility", ParameterKind::Choice(VISIBILITIES)),
        ActionParameterSpec::required("effect", ParameterKind::Choice(ATTRIBUTE_EFFECTS)),
    ],
};

pub const MAP_GROUP: ActionType = ActionType {
    name: "mapGroup",
    description: "Adds the entity to the group paths produced by the expression",
    scope: ActionScope::Input,
    params: &[
        ActionParameterSpec::required("expression", ParameterKind::Expression),
        ActionParameterSpec::required("effect", ParameterKind::Choice(GROUP_EFFECTS)),
    ],
};

pub const ENTITY_CHANGE: ActionType = ActionType {
    name: "entityChange",
    description: "Schedules removal or disabling of the entity after a number of days",
    scope: ActionScope::Input,
    params: &[
        ActionParameterSpec::required("operation", ParameterKind::Choice(OPERATIONS)),
        ActionParameterSpec::required("days", ParameterKind::Integer),
    ],
};

pub const REMOVE_STALE_DATA: ActionType = ActionType {
    name: "removeStaleData",
    description: "Removes previously imported data not present in this translation",
    scope: ActionScope::Input,
    params: &[],
};

pub const INCLUDE_INPUT_PROFILE: ActionType = ActionType {
    name: "includeInputProfile",
    description: "Runs the rules of another input profile",
    scope: ActionScope::Input,
    params: &[ActionParameterSpec::required("profile", ParameterKind::ProfileName)],
};

pub(crate) fn factories() -> Vec<Arc<dyn ActionFactory>> {
    vec![
        BuiltinFactory::new(MAP_IDENTITY, MapIdentity::build),
        BuiltinFactory::new(MAP_ATTRIBUTE, MapAttribute::build),
        BuiltinFactory::new(MAP_GROUP, MapGroup::build),
        BuiltinFactory::new(ENTITY_CHANGE, EntityChange::build),
        BuiltinFactory::new(REMOVE_STALE_DATA, |_| Ok(Action::Translation(Arc::new(RemoveStaleData)))),
        BuiltinFactory::new(INCLUDE_INPUT_PROFILE, |p| {
            Ok(Action::Translation(Arc::new(IncludeProfile {
                profile: p.text(0)?.to_string(),
            })))
        }),
    ]
}

#[derive(Debug)]
struct MapIdentity {
    identity_type: String,
    expression: CompiledExpression,
    credential_requirement: Option<String>,
    effect: IdentityEffect,
}

impl MapIdentity {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let effect = match p.text(3)? {
            "CREATE_OR_MATCH" => IdentityEffect::CreateOrMatch,
            "MATCH" => IdentityEffect::Match,
            "REQUIRE_MATCH" => IdentityEffect::RequireMatch,
            "UPDATE_OR_MATCH" => IdentityEffect::UpdateOrMatch,
            other => {
                return Err(InvalidActionParameters::invalid_choice(
                    MAP_IDENTITY.name,
                    "effect",
                    other,
                    IDENTITY_EFFECTS,
                ));
            }
        };
        Ok(Action::Translation(Arc::new(Self {
            identity_type: p.text(0)?.to_string(),
            expression: p.expression(1)?.clone(),
            credential_requirement: p.opt_text(2)?.map(str::to_string),
            effect,
        })))
    }
}

impl TranslationAction for MapIdentity {
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
                effect: self.effect,
                credential_requirement: self.credential_requirement.clone(),
                persistent: false,
            });
        }
        Ok(())
    }
}

#[derive(Debug)]
struct MapAttribute {
    attribute_type: String,
    group: String,
    expression: CompiledExpression,
    visibility: AttributeVisibility,
    effect: AttributeEffect,
}

impl MapAttribute {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let visibility = match p.text(3)? {
            "full" => AttributeVisibility::Full,
            "local" => AttributeVisibility::Local,
            other => {
                return Err(InvalidActionParameters::invalid_choice(
                    MAP_ATTRIBUTE.name,
                    "visibility",
                    other,
                    VISIBILITIES,
                ));
            }
        };
        Ok(Action::Translation(Arc::new(Self {
            attribute_type: p.text(0)?.to_string(),
            group: p.text(1)?.to_string(),
            expression: p.expression(2)?.clone(),
            visibility,
            effect: attribute_effect(MAP_ATTRIBUTE.name, p.text(4)?)?,
        })))
    }
}

pub(crate) fn attribute_effect(
    action: &str,
    value: &str,
) -> Result<AttributeEffect, InvalidActionParameters> {
    match value {
        "CREATE_ONLY" => Ok(AttributeEffect::CreateOnly),
        "CREATE_OR_UPDATE" => Ok(AttributeEffect::CreateOrUpdate),
        "UPDATE_ONLY" => Ok(AttributeEffect::UpdateOnly),
        other => Err(InvalidActionParameters::invalid_choice(
            action,
            "effect",
            other,
            ATTRIBUTE_EFFECTS,
        )),
    }
}

impl TranslationAction for MapAttribute {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let value = evaluate(&self.expression, "expression", bindings)?;
        if value.is_null() {
            tracing::debug!(attribute = %self.attribute_type, "attribute expression is null, skipping");
            return Ok(());
        }
        result.put_attribute(MappedAttribute {
            name: self.attribute_type.clone(),
            group: self.group.clone(),
            values: value.to_strings(),
            effect: Some(self.effect),
            visibility: Some(self.visibility),
            persistent: false,
        });
        Ok(())
    }
}

#[derive(Debug)]
struct MapGroup {
    expression: CompiledExpression,
    effect: GroupEffect,
}

impl MapGroup {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let effect = match p.text(1)? {
            "REQUIRE_EXISTING_GROUP" => GroupEffect::RequireExistingGroup,
            "CREATE_GROUP_IF_MISSING" => GroupEffect::CreateGroupIfMissing,
            "ADD_IF_EXISTS" => GroupEffect::AddIfExists,
            other => {
                return Err(InvalidActionParameters::invalid_choice(
                    MAP_GROUP.name,
                    "effect",
                    other,
                    GROUP_EFFECTS,
                ));
            }
        };
        Ok(Action::Translation(Arc::new(Self {
            expression: p.expression(0)?.clone(),
            effect,
        })))
    }
}

impl TranslationAction for MapGroup {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let value = evaluate(&self.expression, "expression", bindings)?;
        add_groups(value, self.effect, result)
    }
}

/// Add every group path in `value`, rejecting malformed paths.
pub(crate) fn add_groups(
    value: Value,
    effect: GroupEffect,
    result: &mut TranslationResult,
) -> Result<(), ActionExecutionError> {
    let paths = value.to_strings();
    if let Some(bad) = paths.iter().find(|p| !group_path::is_valid(p)) {
        return Err(ActionExecutionError::InvalidValue {
            parameter: "expression",
            message: format!("'{}' is not a group path", bad),
        });
    }
    for path in paths {
        result.put_group(MappedGroup { path, effect });
    }
    Ok(())
}

#[derive(Debug)]
struct EntityChange {
    operation: ScheduledOperation,
    days: i64,
}

impl EntityChange {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            operation: scheduled_operation(ENTITY_CHANGE.name, p.text(0)?)?,
            days: p.integer(1)?,
        })))
    }
}

pub(crate) fn scheduled_operation(
    action: &str,
    value: &str,
) -> Result<ScheduledOperation, InvalidActionParameters> {
    value
        .parse()
        .map_err(|_| InvalidActionParameters::invalid_choice(action, "operation", value, OPERATIONS))
}

/// `now + days`, failing when the date is out of range.
pub(crate) fn due_after_days(days: i64) -> Result<chrono::DateTime<Utc>, ActionExecutionError> {
    TimeDelta::try_days(days)
        .and_then(|delta| Utc::now().checked_add_signed(delta))
        .ok_or_else(|| ActionExecutionError::InvalidValue {
            parameter: "days",
            message: format!("{} days is out of range", days),
        })
}

impl TranslationAction for EntityChange {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        result.entity_change = Some(EntityScheduledChange {
            operation: self.operation,
            due: due_after_days(self.days)?,
        });
        Ok(())
    }
}

#[derive(Debug)]
struct RemoveStaleData;

impl TranslationAction for RemoveStaleData {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        result.remove_stale_data = true;
        Ok(())
    }
}

/// Shared by `includeInputProfile` and `includeOutputProfile`.
#[derive(Debug)]
pub(crate) struct IncludeProfile {
    pub(crate) profile: String,
}

impl TranslationAction for IncludeProfile {
    fn invoke(
        &self,
        _bindings: &Bindings,
        _result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        Ok(())
    }

    fn included_profile(&self) -> Option<&str> {
        Some(&self.profile)
    }
}
