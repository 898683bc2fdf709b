//! Built-in actions.
//!
//! Each action type is declared once as an [`ActionType`] constant and paired
//! with a builder that turns [`ValidatedParameters`] into a typed action.
//!
//! | Module | Scope |
//! |---|---|
//! | [`input`] | input profiles |
//! | [`output`] | output profiles |
//! | [`form`] | registration and enquiry profiles |
//! | [`entity`] | scheduled bulk rules |
//! | [`common`] | any translation profile |

pub mod common;
pub mod entity;
pub mod form;
pub mod input;
pub mod output;

use std::sync::Arc;

use regex::Regex;
use tollgate_expr::{Bindings, CompiledExpression, Value};

use crate::action::{Action, ActionFactory, ActionType};
use crate::catalog::SchemaCatalog;
use crate::error::{ActionExecutionError, InvalidActionParameters};
use crate::params::ValidatedParameters;

type Builder = fn(&ValidatedParameters) -> Result<Action, InvalidActionParameters>;

/// Factory for a built-in action type.
pub struct BuiltinFactory {
    action_type: ActionType,
    build: Builder,
}

impl BuiltinFactory {
    pub(crate) fn new(action_type: ActionType, build: Builder) -> Arc<dyn ActionFactory> {
        Arc::new(Self { action_type, build })
    }
}

impl ActionFactory for BuiltinFactory {
    fn action_type(&self) -> &ActionType {
        &self.action_type
    }

    fn new_instance(
        &self,
        params: &[Option<String>],
        catalog: &dyn SchemaCatalog,
    ) -> Result<Action, InvalidActionParameters> {
        let validated = self.action_type.validate(params, catalog)?;
        (self.build)(&validated)
    }
}

/// Factories for every built-in action type.
pub fn builtin_factories() -> Vec<Arc<dyn ActionFactory>> {
    let mut factories = Vec::new();
    factories.extend(input::factories());
    factories.extend(output::factories());
    factories.extend(form::factories());
    factories.extend(entity::factories());
    factories.extend(common::factories());
    factories
}

/// Compile `pattern` so that it must match the whole input.
pub(crate) fn anchored(
    action: &str,
    param: &str,
    pattern: &Regex,
) -> Result<Regex, InvalidActionParameters> {
    Regex::new(&format!("^(?:{})$", pattern.as_str()))
        .map_err(|e| InvalidActionParameters::invalid_pattern(action, param, &e))
}

/// Evaluate an expression parameter.
pub(crate) fn evaluate(
    expression: &CompiledExpression,
    parameter: &'static str,
    bindings: &Bindings,
) -> Result<Value, ActionExecutionError> {
    expression
        .evaluate(bindings)
        .map_err(|source| ActionExecutionError::Expression { parameter, source })
}

/// Evaluate an expression parameter that must produce one string (or null).
pub(crate) fn evaluate_single(
    expression: &CompiledExpression,
    parameter: &'static str,
    bindings: &Bindings,
) -> Result<Option<String>, ActionExecutionError> {
    match evaluate(expression, parameter, bindings)? {
        Value::Null => Ok(None),
        Value::List(items) if items.len() == 1 && !items[0].is_null() => {
            Ok(Some(items[0].to_string()))
        }
        Value::List(items) if items.is_empty() => Ok(None),
        value @ Value::List(_) | value @ Value::Map(_) => Err(ActionExecutionError::InvalidValue {
            parameter,
            message: format!("expected a single value, got {}", value.type_name()),
        }),
        other => Ok(Some(other.to_string())),
    }
}
