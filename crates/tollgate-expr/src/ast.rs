//! Abstract Syntax Tree for rule expressions.

use regex::Regex;
use std::fmt;

use crate::value::Value;

/// The fixed set of variables an expression may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Variable {
    /// Remote protocol name (`SAML`, `OAuth2`, ...).
    Protocol,
    /// Protocol binding or flavour.
    ProtocolSubtype,
    /// Identifier of the requesting relying party.
    Requester,
    /// Identifier of the remote identity provider.
    Idp,
    EntityId,
    /// Entity state as a string.
    Status,
    /// Group the authentication was performed for.
    UsedGroup,
    /// First identity value.
    Id,
    /// Type of `id`.
    IdType,
    /// Group paths the entity belongs to.
    Groups,
    /// Groups directly below `usedGroup` the entity belongs to.
    SubGroups,
    /// Attribute name to first value.
    Attr,
    /// Attribute name to all values.
    Attrs,
    RequesterAttr,
    RequesterAttrs,
    /// Identity type to values.
    IdsByType,
    RegistrationForm,
    RequestId,
    RequestStatus,
    /// Whether a form was submitted after an explicit user action.
    Triggered,
}

impl Variable {
    pub const ALL: [Variable; 20] = [
        Variable::Protocol,
        Variable::ProtocolSubtype,
        Variable::Requester,
        Variable::Idp,
        Variable::EntityId,
        Variable::Status,
        Variable::UsedGroup,
        Variable::Id,
        Variable::IdType,
        Variable::Groups,
        Variable::SubGroups,
        Variable::Attr,
        Variable::Attrs,
        Variable::RequesterAttr,
        Variable::RequesterAttrs,
        Variable::IdsByType,
        Variable::RegistrationForm,
        Variable::RequestId,
        Variable::RequestStatus,
        Variable::Triggered,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Variable::Protocol => "protocol",
            Variable::ProtocolSubtype => "protocolSubtype",
            Variable::Requester => "requester",
            Variable::Idp => "idp",
            Variable::EntityId => "entityId",
            Variable::Status => "status",
            Variable::UsedGroup => "usedGroup",
            Variable::Id => "id",
            Variable::IdType => "idType",
            Variable::Groups => "groups",
            Variable::SubGroups => "subGroups",
            Variable::Attr => "attr",
            Variable::Attrs => "attrs",
            Variable::RequesterAttr => "requesterAttr",
            Variable::RequesterAttrs => "requesterAttrs",
            Variable::IdsByType => "idsByType",
            Variable::RegistrationForm => "registrationForm",
            Variable::RequestId => "requestId",
            Variable::RequestStatus => "requestStatus",
            Variable::Triggered => "triggered",
        }
    }

    pub fn from_name(name: &str) -> Option<Variable> {
        Variable::ALL.into_iter().find(|v| v.name() == name)
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    HasAttribute,
    Attr,
    AttrValues,
    Group,
    IdentityOfType,
    Contains,
    StartsWith,
    EndsWith,
    Matches,
    Size,
}

impl Function {
    pub const ALL: [Function; 10] = [
        Function::HasAttribute,
        Function::Attr,
        Function::AttrValues,
        Function::Group,
        Function::IdentityOfType,
        Function::Contains,
        Function::StartsWith,
        Function::EndsWith,
        Function::Matches,
        Function::Size,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::HasAttribute => "hasAttribute",
            Function::Attr => "attr",
            Function::AttrValues => "attrValues",
            Function::Group => "group",
            Function::IdentityOfType => "identityOfType",
            Function::Contains => "contains",
            Function::StartsWith => "startsWith",
            Function::EndsWith => "endsWith",
            Function::Matches => "matches",
            Function::Size => "size",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Function::HasAttribute
            | Function::Attr
            | Function::AttrValues
            | Function::Group
            | Function::IdentityOfType
            | Function::Size => 1,
            Function::Contains | Function::StartsWith | Function::EndsWith | Function::Matches => 2,
        }
    }

    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    /// `needle in haystack`
    In,
    /// `haystack contains needle`
    Contains,
    Add,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::LessThan => "<",
            BinaryOp::LessThanOrEqual => "<=",
            BinaryOp::GreaterThan => ">",
            BinaryOp::GreaterThanOrEqual => ">=",
            BinaryOp::In => "in",
            BinaryOp::Contains => "contains",
            BinaryOp::Add => "+",
        };
        f.write_str(s)
    }
}

/// A regular expression compiled when the expression is parsed.
#[derive(Debug, Clone)]
pub struct Pattern(pub Regex);

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_str() == other.0.as_str()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(Variable),
    List(Vec<Expr>),
    Index(Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
    /// `matches(subject, 'literal')` with its pattern precompiled.
    Matches(Box<Expr>, Pattern),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    /// Variables referenced anywhere in the expression, including those read by functions.
    pub fn referenced_variables(&self) -> Vec<Variable> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<Variable>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Variable(v) => vars.push(*v),
            Expr::List(items) => items.iter().for_each(|e| e.collect_variables(vars)),
            Expr::Index(target, index) => {
                target.collect_variables(vars);
                index.collect_variables(vars);
            }
            Expr::Call(func, args) => {
                match func {
                    Function::HasAttribute | Function::AttrValues => vars.push(Variable::Attrs),
                    Function::Attr => vars.push(Variable::Attr),
                    Function::Group => vars.push(Variable::Groups),
                    Function::IdentityOfType => vars.push(Variable::IdsByType),
                    _ => {}
                }
                args.iter().for_each(|e| e.collect_variables(vars));
            }
            Expr::Matches(subject, _) => subject.collect_variables(vars),
            Expr::Unary(_, inner) => inner.collect_variables(vars),
            Expr::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }
        }
    }
}
