//! Expression nodes carried by the syntax tree.
//!
//! Only the handful of expression shapes the inheritance engine needs to look
//! at are modelled here. Everything else about expressions (filters, tests,
//! arithmetic) belongs to the evaluator and never reaches this crate.

use std::fmt;

/// Runtime value produced by evaluating an expression.
///
/// Values are plain JSON so that contexts can be built from `serde_json::json!`
/// literals and hashed through their canonical serialized form.
pub type Value = serde_json::Value;

/// An expression appearing in an output node, an `extends` target, an import
/// target, or a control-flow condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A constant such as `"base.html"`, `3` or `true`.
    Literal(Value),
    /// A bare variable reference: `layout`.
    Variable(String),
    /// Attribute access: `page.layout`.
    Attribute {
        object: Box<Expr>,
        attr: String,
    },
    /// Inline conditional: `then if condition else otherwise`.
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// A `super()` call.
    Super,
}

impl Expr {
    /// Build a string literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal(Value::String(value.into()))
    }

    /// Build a variable reference.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable(name.into())
    }

    /// Build `object.attr`.
    pub fn attr(object: Expr, attr: impl Into<String>) -> Self {
        Expr::Attribute {
            object: Box::new(object),
            attr: attr.into(),
        }
    }

    /// Build `then if condition else otherwise`.
    pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    /// Returns the literal string this expression holds, if it is one.
    #[must_use]
    pub fn as_literal_str(&self) -> Option<&str> {
        match self {
            Expr::Literal(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True when the expression is not a literal and needs a context to
    /// evaluate.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Expr::Literal(_))
    }

    /// True for a `super()` call.
    #[must_use]
    pub fn is_super(&self) -> bool {
        matches!(self, Expr::Super)
    }

    /// True when a `super()` call appears anywhere inside this expression.
    pub fn contains_super(&self) -> bool {
        match self {
            Expr::Super => true,
            Expr::Literal(_) | Expr::Variable(_) => false,
            Expr::Attribute { object, .. } => object.contains_super(),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => condition.contains_super() || then.contains_super() || otherwise.contains_super(),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal(value) => write!(f, "{value}"),
            Expr::Variable(name) => write!(f, "{name}"),
            Expr::Attribute { object, attr } => write!(f, "{object}.{attr}"),
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => write!(f, "{then} if {condition} else {otherwise}"),
            Expr::Super => write!(f, "super()"),
        }
    }
}
