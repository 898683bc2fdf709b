//! Variable bindings an expression is evaluated against.

use std::collections::HashMap;

use crate::ast::Variable;
use crate::evaluator::EvalError;
use crate::value::Value;

/// Values for the variables available in one evaluation.
///
/// A variable that is not bound is unresolved: reading it fails evaluation.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<Variable, Value>,
}

impl Bindings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, variable: Variable, value: impl Into<Value>) -> Self {
        self.set(variable, value);
        self
    }

    pub fn set(&mut self, variable: Variable, value: impl Into<Value>) {
        self.values.insert(variable, value.into());
    }

    /// Bind only when a value is present.
    pub fn set_opt<T: Into<Value>>(&mut self, variable: Variable, value: Option<T>) {
        if let Some(v) = value {
            self.set(variable, v);
        }
    }

    pub fn get(&self, variable: Variable) -> Option<&Value> {
        self.values.get(&variable)
    }

    pub fn is_bound(&self, variable: Variable) -> bool {
        self.values.contains_key(&variable)
    }

    pub fn require(&self, variable: Variable) -> Result<&Value, EvalError> {
        self.values
            .get(&variable)
            .ok_or_else(|| EvalError::UnresolvedVariable(variable.name().to_string()))
    }
}
