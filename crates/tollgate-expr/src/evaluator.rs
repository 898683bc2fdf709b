//! Expression evaluator.
//!
//! Evaluation is a pure function of the expression and its [`Bindings`].

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::ast::{BinaryOp, Expr, Function, UnaryOp, Variable};
use crate::bindings::Bindings;
use crate::value::Value;

/// Error during expression evaluation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("variable '{0}' is not available in this context")]
    UnresolvedVariable(String),

    #[error("type mismatch in '{operation}': expected {expected}, got {actual}")]
    TypeMismatch {
        operation: String,
        expected: String,
        actual: String,
    },

    #[error("index {index} out of range for list of length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("expression must evaluate to a boolean, got {0}")]
    NotBoolean(String),

    #[error("integer overflow in '{0}'")]
    Overflow(String),

    #[error("function '{function}' expects {expected} argument(s), got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },
}

impl EvalError {
    fn mismatch(operation: impl ToString, expected: &str, actual: &Value) -> Self {
        EvalError::TypeMismatch {
            operation: operation.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name().to_string(),
        }
    }
}

pub struct Evaluator<'a> {
    bindings: &'a Bindings,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(bindings: &'a Bindings) -> Self {
        Self { bindings }
    }

    pub fn evaluate(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Variable(var) => self.bindings.require(*var).cloned(),
            Expr::List(items) => items
                .iter()
                .map(|e| self.evaluate(e))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            Expr::Index(target, index) => {
                let target = self.evaluate(target)?;
                let index = self.evaluate(index)?;
                Self::index(target, index)
            }
            Expr::Call(func, args) => self.call(*func, args),
            Expr::Matches(subject, pattern) => match self.evaluate(subject)? {
                Value::Str(s) => Ok(Value::Bool(pattern.0.is_match(&s))),
                Value::Null => Ok(Value::Bool(false)),
                other => Err(EvalError::mismatch("matches", "string", &other)),
            },
            Expr::Unary(op, inner) => {
                let value = self.evaluate(inner)?;
                match (op, value) {
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Not, other) => Err(EvalError::mismatch("!", "boolean", &other)),
                    (UnaryOp::Negate, Value::Int(i)) => i
                        .checked_neg()
                        .map(Value::Int)
                        .ok_or_else(|| EvalError::Overflow("-".to_string())),
                    (UnaryOp::Negate, other) => Err(EvalError::mismatch("-", "integer", &other)),
                }
            }
            Expr::Binary(op, left, right) => self.binary(*op, left, right),
        }
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Value, EvalError> {
        match op {
            BinaryOp::Or => {
                if self.boolean(op, left)? {
                    return Ok(Value::Bool(true));
                }
                self.boolean(op, right).map(Value::Bool)
            }
            BinaryOp::And => {
                if !self.boolean(op, left)? {
                    return Ok(Value::Bool(false));
                }
                self.boolean(op, right).map(Value::Bool)
            }
            BinaryOp::Add => Self::add(self.evaluate(left)?, self.evaluate(right)?),
            _ => {
                let l = self.evaluate(left)?;
                let r = self.evaluate(right)?;
                let result = match op {
                    BinaryOp::Equal => l == r,
                    BinaryOp::NotEqual => l != r,
                    BinaryOp::LessThan => Self::compare(op, &l, &r)? == Ordering::Less,
                    BinaryOp::LessThanOrEqual => Self::compare(op, &l, &r)? != Ordering::Greater,
                    BinaryOp::GreaterThan => Self::compare(op, &l, &r)? == Ordering::Greater,
                    BinaryOp::GreaterThanOrEqual => Self::compare(op, &l, &r)? != Ordering::Less,
                    BinaryOp::In => Self::contains(op, &r, &l)?,
                    // contains
                    _ => Self::contains(op, &l, &r)?,
                };
                Ok(Value::Bool(result))
            }
        }
    }

    fn boolean(&self, op: BinaryOp, expr: &Expr) -> Result<bool, EvalError> {
        match self.evaluate(expr)? {
            Value::Bool(b) => Ok(b),
            other => Err(EvalError::mismatch(op, "boolean", &other)),
        }
    }

    fn compare(op: BinaryOp, l: &Value, r: &Value) -> Result<Ordering, EvalError> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Int(_), other) => Err(EvalError::mismatch(op, "integer", other)),
            (Value::Str(_), other) => Err(EvalError::mismatch(op, "string", other)),
            (other, _) => Err(EvalError::mismatch(op, "integer or string", other)),
        }
    }

    /// Membership of `needle` in `haystack` (list element, substring or map key).
    fn contains(op: impl ToString, haystack: &Value, needle: &Value) -> Result<bool, EvalError> {
        match haystack {
            Value::List(items) => Ok(items.contains(needle)),
            Value::Str(s) => match needle {
                Value::Str(n) => Ok(s.contains(n.as_str())),
                other => Err(EvalError::mismatch(op, "string", other)),
            },
            Value::Map(map) => match needle {
                Value::Str(k) => Ok(map.contains_key(k)),
                other => Err(EvalError::mismatch(op, "string", other)),
            },
            Value::Null => Ok(false),
            other => Err(EvalError::mismatch(op, "list, string or map", other)),
        }
    }

    fn add(l: Value, r: Value) -> Result<Value, EvalError> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => a
                .checked_add(b)
                .map(Value::Int)
                .ok_or_else(|| EvalError::Overflow("+".to_string())),
            (Value::Str(a), Value::Str(b)) => Ok(Value::Str(a + &b)),
            (Value::Str(a), Value::Int(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::Int(a), Value::Str(b)) => Ok(Value::Str(format!("{a}{b}"))),
            (Value::List(mut a), Value::List(b)) => {
                a.extend(b);
                Ok(Value::List(a))
            }
            (Value::Str(_), other) | (Value::Int(_), other) => {
                Err(EvalError::mismatch("+", "string or integer", &other))
            }
            (Value::List(_), other) => Err(EvalError::mismatch("+", "list", &other)),
            (other, _) => Err(EvalError::mismatch("+", "string, integer or list", &other)),
        }
    }

    fn index(target: Value, index: Value) -> Result<Value, EvalError> {
        match (target, index) {
            (Value::List(items), Value::Int(i)) => {
                let len = items.len();
                usize::try_from(i)
                    .ok()
                    .and_then(|idx| items.into_iter().nth(idx))
                    .ok_or(EvalError::IndexOutOfRange { index: i, len })
            }
            (Value::Map(mut map), Value::Str(k)) => Ok(map.remove(&k).unwrap_or(Value::Null)),
            (Value::List(_), other) => Err(EvalError::mismatch("[]", "integer index", &other)),
            (Value::Map(_), other) => Err(EvalError::mismatch("[]", "string key", &other)),
            (other, _) => Err(EvalError::mismatch("[]", "list or map", &other)),
        }
    }

    fn call(&self, func: Function, args: &[Expr]) -> Result<Value, EvalError> {
        let args = args
            .iter()
            .map(|e| self.evaluate(e))
            .collect::<Result<Vec<_>, _>>()?;

        if args.len() != func.arity() {
            return Err(EvalError::Arity {
                function: func.name().to_string(),
                expected: func.arity(),
                actual: args.len(),
            });
        }

        match func {
            Function::HasAttribute => {
                let name = Self::string_arg(func, &args, 0)?;
                let attrs = self.map_variable(Variable::Attrs)?;
                Ok(Value::Bool(attrs.contains_key(name)))
            }
            Function::Attr => {
                let name = Self::string_arg(func, &args, 0)?;
                let attr = self.map_variable(Variable::Attr)?;
                Ok(attr.get(name).cloned().unwrap_or(Value::Null))
            }
            Function::AttrValues => {
                let name = Self::string_arg(func, &args, 0)?;
                let attrs = self.map_variable(Variable::Attrs)?;
                Ok(attrs
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| Value::List(Vec::new())))
            }
            Function::Group => {
                let path = Self::string_arg(func, &args, 0)?;
                match self.bindings.require(Variable::Groups)? {
                    Value::List(groups) => Ok(Value::Bool(
                        groups.iter().any(|g| g.as_str() == Some(path)),
                    )),
                    other => Err(EvalError::mismatch(Variable::Groups, "list", other)),
                }
            }
            Function::IdentityOfType => {
                let type_id = Self::string_arg(func, &args, 0)?;
                let ids = self.map_variable(Variable::IdsByType)?;
                Ok(match ids.get(type_id) {
                    Some(Value::List(values)) => values.first().cloned().unwrap_or(Value::Null),
                    Some(other) => other.clone(),
                    None => Value::Null,
                })
            }
            Function::Contains => Self::contains(func.name(), &args[0], &args[1]).map(Value::Bool),
            Function::StartsWith | Function::EndsWith => {
                let (s, p) = match (&args[0], &args[1]) {
                    (Value::Null, _) => return Ok(Value::Bool(false)),
                    (Value::Str(s), Value::Str(p)) => (s, p),
                    (Value::Str(_), other) | (other, _) => {
                        return Err(EvalError::mismatch(func.name(), "string", other));
                    }
                };
                Ok(Value::Bool(if func == Function::StartsWith {
                    s.starts_with(p.as_str())
                } else {
                    s.ends_with(p.as_str())
                }))
            }
            Function::Size => match &args[0] {
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Map(map) => Ok(Value::Int(map.len() as i64)),
                Value::Null => Ok(Value::Int(0)),
                other => Err(EvalError::mismatch(func.name(), "list, string or map", other)),
            },
            // compiled into Expr::Matches by the parser
            Function::Matches => Err(EvalError::mismatch(func.name(), "literal pattern", &args[1])),
        }
    }

    fn string_arg(func: Function, args: &[Value], idx: usize) -> Result<&str, EvalError> {
        match &args[idx] {
            Value::Str(s) => Ok(s),
            other => Err(EvalError::mismatch(func.name(), "string argument", other)),
        }
    }

    fn map_variable(&self, var: Variable) -> Result<&BTreeMap<String, Value>, EvalError> {
        let value = self.bindings.require(var)?;
        value
            .as_map()
            .ok_or_else(|| EvalError::mismatch(var, "map", value))
    }
}
