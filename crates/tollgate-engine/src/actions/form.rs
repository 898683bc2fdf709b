//! Registration and enquiry form actions.

use std::sync::Arc;

use regex::Regex;
use tollgate_expr::{Bindings, CompiledExpression};

use super::input::add_groups;
use super::{BuiltinFactory, anchored, evaluate, evaluate_single};
use crate::action::{Action, ActionFactory, ActionScope, ActionType, TranslationAction};
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::{ActionParameterSpec, ParameterKind, ValidatedParameters};
use crate::result::{
    AttributeEffect, AutomaticRequestAction, GroupEffect, MappedAttribute, TranslationResult,
};

const AUTO_ACTIONS: &[&str] = &["accept", "reject", "drop"];

pub const AUTO_PROCESS: ActionType = ActionType {
    name: "autoProcess",
    description: "Accepts, rejects or drops the request without an administrator",
    scope: ActionScope::Form,
    params: &[ActionParameterSpec::required("action", ParameterKind::Choice(AUTO_ACTIONS))],
};

pub const REDIRECT: ActionType = ActionType {
    name: "redirect",
    description: "Redirects the user after submission",
    scope: ActionScope::Form,
    params: &[ActionParameterSpec::required("url", ParameterKind::Expression)],
};

pub const ADD_TO_GROUP: ActionType = ActionType {
    name: "addToGroup",
    description: "Adds the requester to the group paths produced by the expression",
    scope: ActionScope::Form,
    params: &[ActionParameterSpec::required("expression", ParameterKind::Expression)],
};

pub const ADD_ATTRIBUTE: ActionType = ActionType {
    name: "addAttribute",
    description: "Adds an attribute to the request",
    scope: ActionScope::Form,
    params: &[
        ActionParameterSpec::required("attributeType", ParameterKind::AttributeType),
        ActionParameterSpec::required("group", ParameterKind::GroupPath),
        ActionParameterSpec::required("expression", ParameterKind::Expression),
    ],
};

pub const FILTER_GROUP: ActionType = ActionType {
    name: "filterGroup",
    description: "Drops requested group memberships whose path matches the pattern",
    scope: ActionScope::Form,
    params: &[ActionParameterSpec::required("groupRegex", ParameterKind::Regex)],
};

pub(crate) fn factories() -> Vec<Arc<dyn ActionFactory>> {
    vec![
        BuiltinFactory::new(AUTO_PROCESS, AutoProcess::build),
        BuiltinFactory::new(REDIRECT, |p| {
            Ok(Action::Translation(Arc::new(Redirect {
                url: p.expression(0)?.clone(),
            })))
        }),
        BuiltinFactory::new(ADD_TO_GROUP, |p| {
            Ok(Action::Translation(Arc::new(AddToGroup {
                expression: p.expression(0)?.clone(),
            })))
        }),
        BuiltinFactory::new(ADD_ATTRIBUTE, AddAttribute::build),
        BuiltinFactory::new(FILTER_GROUP, |p| {
            Ok(Action::Translation(Arc::new(FilterGroup {
                pattern: anchored(FILTER_GROUP.name, "groupRegex", p.regex(0)?)?,
            })))
        }),
    ]
}

#[derive(Debug)]
struct AutoProcess {
    action: AutomaticRequestAction,
}

impl AutoProcess {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        let action = match p.text(0)? {
            "accept" => AutomaticRequestAction::Accept,
            "reject" => AutomaticRequestAction::Reject,
            "drop" => AutomaticRequestAction::Drop,
            other => {
                return Err(InvalidActionParameters::invalid_choice(
                    AUTO_PROCESS.name,
                    "action",
                    other,
                    AUTO_ACTIONS,
                ));
            }
        };
        Ok(Action::Translation(Arc::new(Self { action })))
    }
}

impl TranslationAction for AutoProcess {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        result.auto_action = Some(self.action);
        Ok(())
    }
}

#[derive(Debug)]
struct Redirect {
    url: CompiledExpression,
}

impl TranslationAction for Redirect {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        match evaluate_single(&self.url, "url", bindings)? {
            Some(url) => result.redirect_url = Some(url),
            None => tracing::debug!("redirect url is null, skipping"),
        }
        Ok(())
    }
}

#[derive(Debug)]
struct AddToGroup {
    expression: CompiledExpression,
}

impl TranslationAction for AddToGroup {
    fn invoke(
        &self,
        bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let value = evaluate(&self.expression, "expression", bindings)?;
        add_groups(value, GroupEffect::RequireExistingGroup, result)
    }
}

#[derive(Debug)]
struct AddAttribute {
    attribute_type: String,
    group: String,
    expression: CompiledExpression,
}

impl AddAttribute {
    fn build(p: &ValidatedParameters) -> Result<Action, InvalidActionParameters> {
        Ok(Action::Translation(Arc::new(Self {
            attribute_type: p.text(0)?.to_string(),
            group: p.text(1)?.to_string(),
            expression: p.expression(2)?.clone(),
        })))
    }
}

impl TranslationAction for AddAttribute {
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
            effect: Some(AttributeEffect::CreateOrUpdate),
            visibility: None,
            persistent: false,
        });
        Ok(())
    }
}

#[derive(Debug)]
struct FilterGroup {
    pattern: Regex,
}

impl TranslationAction for FilterGroup {
    fn invoke(
        &self,
        _bindings: &Bindings,
        result: &mut TranslationResult,
    ) -> Result<(), ActionExecutionError> {
        let removed = result.remove_groups(|path| self.pattern.is_match(path));
        if removed > 0 {
            tracing::debug!(pattern = %self.pattern, removed, "filtered requested groups");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::StaticCatalog;
    use crate::context::TranslationContext;
    use crate::error::ParameterErrorKind;

    fn build(name: &str, params: &[&str]) -> Result<Action, InvalidActionParameters> {
        let factory = factories()
            .into_iter()
            .find(|f| f.action_type().name == name)
            .unwrap();
        let raw: Vec<Option<String>> = params.iter().map(|p| Some(p.to_string())).collect();
        factory.new_instance(&raw, &StaticCatalog::new(["cn"], ["email"]))
    }

    fn run(name: &str, params: &[&str]) -> Result<TranslationResult, ActionExecutionError> {
        let Action::Translation(action) = build(name, params).unwrap() else {
            panic!("expected translation action");
        };
        let bindings = TranslationContext::new()
            .with_registration_request("signup", "req-1", "pending", false)
            .with_attribute(tollgate_core::Attribute::root("cn", &["Alice"]))
            .bindings();
        let mut result = TranslationResult::new();
        action.invoke(&bindings, &mut result)?;
        Ok(result)
    }

    #[test]
    fn test_auto_process() {
        let result = run("autoProcess", &["accept"]).unwrap();
        assert_eq!(result.auto_action, Some(AutomaticRequestAction::Accept));
        let err = build("autoProcess", &["approve"]).unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidChoice);
    }

    #[test]
    fn test_redirect_concatenates() {
        let result = run("redirect", &["'https://app.example.com/done?id=' + requestId"]).unwrap();
        assert_eq!(
            result.redirect_url.as_deref(),
            Some("https://app.example.com/done?id=req-1")
        );
    }

    #[test]
    fn test_redirect_rejects_list() {
        let err = run("redirect", &["['a', 'b']"]).unwrap_err();
        assert!(matches!(err, ActionExecutionError::InvalidValue { parameter: "url", .. }));
    }

    #[test]
    fn test_add_to_group_and_attribute() {
        let result = run("addToGroup", &["'/members'"]).unwrap();
        assert_eq!(result.groups[0].path, "/members");
        assert_eq!(result.groups[0].effect, GroupEffect::RequireExistingGroup);

        let result = run("addAttribute", &["cn", "/members", "attr['cn']"]).unwrap();
        let attr = result.attribute("cn").unwrap();
        assert_eq!(attr.group, "/members");
        assert_eq!(attr.values, vec!["Alice"]);
    }

    #[test]
    fn test_filter_group_records_removals() {
        let Action::Translation(add) = build("addToGroup", &["['/A/B', '/Z', '/AB']"]).unwrap() else {
            panic!("expected translation action");
        };
        let Action::Translation(filter) = build("filterGroup", &["/A.*"]).unwrap() else {
            panic!("expected translation action");
        };
        let bindings = TranslationContext::new().bindings();
        let mut result = TranslationResult::new();
        add.invoke(&bindings, &mut result).unwrap();
        filter.invoke(&bindings, &mut result).unwrap();

        assert_eq!(result.group_paths(), vec!["/Z"]);
        assert_eq!(result.removed_groups, vec!["/A/B", "/AB"]);

        let err = build("filterGroup", &["("]).unwrap_err();
        assert_eq!(err.kind, ParameterErrorKind::InvalidPattern);
    }
}
