//! Expression evaluation seam.
//!
//! Full expression semantics belong to the surrounding template engine. The
//! inheritance engine only evaluates one thing on its own: the target of a
//! dynamic `{% extends %}`. It does so through [`ExpressionEvaluator`], so hosts
//! plug in their real evaluator. [`ContextEvaluator`] covers the expression
//! shapes modelled in [`crate::ast::Expr`] and is the default.

use anyhow::{Result, anyhow, bail};

use crate::ast::{Expr, Value};
use crate::context::{RenderContext, json_type_name};

/// Evaluates an expression node against a render context.
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expr: &Expr, context: &RenderContext) -> Result<Value>;
}

/// Evaluator for literals, variable lookups, attribute access and inline
/// conditionals.
///
/// Undefined variables and missing attributes evaluate to `null`; the
/// inheritance engine then rejects a `null` extends target as a type error.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextEvaluator;

impl ContextEvaluator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionEvaluator for ContextEvaluator {
    fn evaluate(&self, expr: &Expr, context: &RenderContext) -> Result<Value> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => Ok(context.get(name).cloned().unwrap_or(Value::Null)),
            Expr::Attribute { object, attr } => match self.evaluate(object, context)? {
                Value::Object(map) => Ok(map.get(attr).cloned().unwrap_or(Value::Null)),
                Value::Null => Ok(Value::Null),
                other => Err(anyhow!(
                    "cannot read attribute '{attr}' of {} value",
                    json_type_name(&other)
                )),
            },
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => {
                if is_truthy(&self.evaluate(condition, context)?) {
                    self.evaluate(then, context)
                } else {
                    self.evaluate(otherwise, context)
                }
            }
            Expr::Super => bail!("super() cannot be evaluated as a value"),
        }
    }
}

/// Jinja-style truthiness: empty strings, collections, zero and null are false.
#[must_use]
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
