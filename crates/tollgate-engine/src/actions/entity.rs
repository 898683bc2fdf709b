//! Entity actions run by scheduled bulk rules.

use std::sync::Arc;

use tollgate_core::{EntityId, EntityState, ScheduledOperation};
use tollgate_expr::Bindings;

use super::BuiltinFactory;
use super::input::{OPERATIONS, due_after_days, scheduled_operation};
use crate::action::{Action, ActionFactory, ActionScope, ActionType, EntityAction};
use crate::bulk::EntityManagement;
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::{ActionParameterSpec, ParameterKind, ValidatedParameters};

const STATES: &[&str] = &["valid", "authenticationDisabled", "disabled", "onlyLoginPermitted"];

pub const CHANGE_STATUS: ActionType = ActionType {
    name: "changeStatus",
    description: "Sets the entity status",
    scope: ActionScope::Entity,
    params: &[ActionParameterSpec::required("status", ParameterKind::Choice(STATES))],
};

pub const REMOVE_ENTITY: ActionType = ActionType {
    name: "removeEntity",
    description: "Removes the entity",
    scope: ActionScope::Entity,
    params: &[],
};

pub const SCHEDULE_OPERATION: ActionType = ActionType {
    name: "scheduleOperation",
    description: "Schedules removal or disabling of the entity after a number of days",
    scope: ActionScope::Entity,
    params: &[
        ActionParameterSpec::required("operation", ParameterKind::Choice(OPERATIONS)),
        ActionParameterSpec::required("days", ParameterKind::Integer),
    ],
};

pub const CHANGE_CREDENTIAL_REQUIREMENT: ActionType = ActionType {
    name: "changeCredentialRequirement",
    description: "Sets the credential requirement of the entity",
    scope: ActionScope::Entity,
    params: &[ActionParameterSpec::required("requirement", ParameterKind::Text)],
};

pub const REMOVE_FROM_GROUP: ActionType = ActionType {
    name: "removeFromGroup",
    description: "Removes the entity from one or more groups",
    scope: ActionScope::Entity,
    params: &[ActionParameterSpec::required("group", ParameterKind::GroupPath).variadic()],
};

pub(crate) fn factories() -> Vec<Arc<dyn ActionFactory>> {
    vec![
        BuiltinFactory::new(CHANGE_STATUS, ChangeStatus::build),
        BuiltinFactory::new(REMOVE_ENTITY, |_| Ok(Action::Entity(Arc::new(RemoveEntity)))),
        BuiltinFactory::new(SCHEDULE_OPERATION, ScheduleOperation::build),
        BuiltinFactory::new(CHANGE_CREDENTIAL_REQUIREMENT, |p| {
            Ok(Action::Entity(Arc::new(ChangeCredentialRequirement {
                requirement: p.text(0)?.to_string(),
            })))
        }),
        BuiltinFactory::new(REMOVE_FROM_GROUP, |p| {
            Ok(Action::Entity(Arc::new(RemoveFromGroup {
                groups: p.texts_from(0)?,
            })))
        }),
    ]
}

#[derive(Debug)]
struct ChangeStatus {
    status: EntityState,
}

impl ChangeStatus {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let value = p.text(0)?;
        let status = value.parse().map_err(|_| {
            InvalidActionParameters::invalid_choice(CHANGE_STATUS.name, "status", value, STATES)
        })?;
        Ok(Action::Entity(Arc::new(Self { status })))
    }
}

impl EntityAction for ChangeStatus {
    fn invoke(
        &self,
        entity: EntityId,
        _bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError> {
        tracing::info!(entity, status = %self.status, "changing entity status");
        management.set_status(entity, self.status)?;
        Ok(())
    }
}

#[derive(Debug)]
struct RemoveEntity;

impl EntityAction for RemoveEntity {
    fn invoke(
        &self,
        entity: EntityId,
        _bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError> {
        tracing::info!(entity, "removing entity");
        management.remove_entity(entity)?;
        Ok(())
    }
}

#[derive(Debug)]
struct ScheduleOperation {
    operation: ScheduledOperation,
    days: i64,
}

impl ScheduleOperation {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Entity(Arc::new(Self {
            operation: scheduled_operation(SCHEDULE_OPERATION.name, p.text(0)?)?,
            days: p.integer(1)?,
        })))
    }
}

impl EntityAction for ScheduleOperation {
    fn invoke(
        &self,
        entity: EntityId,
        _bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError> {
        let due = due_after_days(self.days)?;
        tracing::info!(entity, operation = %self.operation, %due, "scheduling entity operation");
        management.schedule_operation(entity, self.operation, due)?;
        Ok(())
    }
}

#[derive(Debug)]
struct ChangeCredentialRequirement {
    requirement: String,
}

impl EntityAction for ChangeCredentialRequirement {
    fn invoke(
        &self,
        entity: EntityId,
        _bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError> {
        management.set_credential_requirement(entity, &self.requirement)?;
        Ok(())
    }
}

#[derive(Debug)]
struct RemoveFromGroup {
    groups: Vec<String>,
}

impl EntityAction for RemoveFromGroup {
    fn invoke(
        &self,
        entity: EntityId,
        _bindings: &Bindings,
        management: &dyn EntityManagement,
    ) -> Result<(), ActionExecutionError> {
        for group in &self.groups {
            tracing::debug!(entity, group = %group, "removing entity from group");
            management.remove_from_group(entity, group)?;
        }
        Ok(())
    }
}
