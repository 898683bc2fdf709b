//! Rule conditions with compile-once caching.

use std::sync::OnceLock;

use tollgate_expr::{Bindings, CompiledExpression, EvalError, ParseError};

/// Failure to evaluate a condition.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("condition does not compile: {0}")]
    Parse(ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// A boolean expression and its lazily compiled form.
///
/// The first compilation wins and is never repeated; concurrent readers see either
/// nothing or the complete compiled expression.
#[derive(Debug)]
pub struct Condition {
    expression: String,
    compiled: OnceLock<Result<CompiledExpression, ParseError>>,
}

impl Condition {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            compiled: OnceLock::new(),
        }
    }

    /// Build and compile immediately, failing on a syntax error.
    pub fn compile(expression: impl Into<String>) -> Result<Self, ParseError> {
        let condition = Self::new(expression);
        condition.compiled().map_err(Clone::clone)?;
        Ok(condition)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    pub fn compiled(&self) -> Result<&CompiledExpression, &ParseError> {
        self.compiled
            .get_or_init(|| CompiledExpression::compile(&self.expression))
            .as_ref()
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<bool, ConditionError> {
        let compiled = self
            .compiled()
            .map_err(|e| ConditionError::Parse(e.clone()))?;
        Ok(compiled.evaluate_bool(bindings)?)
    }
}
