//! Expression language for translation rule conditions and action parameters.
//!
//! The language is a small, side-effect free evaluator over a fixed set of
//! variables. It has no access to the host beyond the values bound for one
//! evaluation.
//!
//! # Syntax
//!
//! ## Literals
//! - `'single'` or `"double"` quoted strings, integers, `true`, `false`, `null`
//! - list literals: `['a', 'b']`
//!
//! ## Operators (lowest precedence first)
//! - `||` / `or`
//! - `&&` / `and`
//! - `==`, `!=`
//! - `<`, `<=`, `>`, `>=`, `in`, `contains`
//! - `+` (string concatenation, integer addition, list concatenation)
//! - `!` / `not`, unary `-`
//! - indexing: `attrs['mail'][0]`
//!
//! ## Variables
//! `protocol`, `protocolSubtype`, `requester`, `idp`, `entityId`, `status`,
//! `usedGroup`, `id`, `idType`, `groups`, `subGroups`, `attr`, `attrs`,
//! `requesterAttr`, `requesterAttrs`, `idsByType`, `registrationForm`,
//! `requestId`, `requestStatus`, `triggered`.
//!
//! ## Functions
//! - `hasAttribute(name)`, `attr(name)`, `attrValues(name)`
//! - `group(path)`, `identityOfType(type)`
//! - `contains(haystack, needle)`, `startsWith(s, prefix)`, `endsWith(s, suffix)`
//! - `matches(s, 'regex')`, `size(x)`
//!
//! # Example
//!
//! ```rust
//! use tollgate_expr::{Bindings, CompiledExpression, Value, Variable};
//!
//! let expr = CompiledExpression::compile("protocol == 'SAML' && group('/staff')").unwrap();
//! let bindings = Bindings::new()
//!     .with(Variable::Protocol, "SAML")
//!     .with(Variable::Groups, vec!["/", "/staff"]);
//!
//! assert!(expr.evaluate_bool(&bindings).unwrap());
//! assert_eq!(expr.evaluate(&bindings).unwrap(), Value::Bool(true));
//! ```

pub mod ast;
pub mod bindings;
pub mod evaluator;
pub mod lexer;
pub mod parser;
pub mod value;

pub use ast::{BinaryOp, Expr, Function, UnaryOp, Variable};
pub use bindings::Bindings;
pub use evaluator::{EvalError, Evaluator};
pub use parser::{ParseError, Parser};
pub use value::Value;

/// A parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpression {
    source: String,
    root: Expr,
}

impl CompiledExpression {
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let root = Parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Expr {
        &self.root
    }

    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, EvalError> {
        Evaluator::new(bindings).evaluate(&self.root)
    }

    /// Evaluate as a condition; any non-boolean result is an error.
    pub fn evaluate_bool(&self, bindings: &Bindings) -> Result<bool, EvalError> {
        match self.evaluate(bindings)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::NotBoolean(other.type_name().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_keeps_source() {
        let expr = CompiledExpression::compile("  true ").unwrap();
        assert_eq!(expr.source(), "  true ");
        assert_eq!(expr.root(), &Expr::Literal(Value::Bool(true)));
    }

    #[test]
    fn test_condition_must_be_boolean() {
        let expr = CompiledExpression::compile("'yes'").unwrap();
        let err = expr.evaluate_bool(&Bindings::new()).unwrap_err();
        assert_eq!(err, EvalError::NotBoolean("string".into()));
    }

    #[test]
    fn test_same_source_same_semantics() {
        let a = CompiledExpression::compile("idp == 'x' || group('/a')").unwrap();
        let b = CompiledExpression::compile("idp == 'x' || group('/a')").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_compile_error_reports_position() {
        let err = CompiledExpression::compile("idp == ").unwrap_err();
        assert_eq!(err.position, 7);
    }
}
