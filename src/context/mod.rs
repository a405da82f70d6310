//! Render context passed through inheritance resolution.
//!
//! The context is the set of variable bindings a template is rendered with.
//! Inheritance resolution reads it in two places: dynamic `extends` targets
//! are evaluated against it, and its digest becomes part of the resolved
//! template cache key (see [`ContextHasher`]).
//!
//! Bindings live behind an `Arc` so that handing a context to several
//! resolvers is cheap; mutation goes through [`Arc::make_mut`], which copies
//! the map only when another holder still shares it.

mod hasher;

pub use hasher::ContextHasher;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ast::Value;

/// Variable bindings for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    vars: Arc<BTreeMap<String, Value>>,
}

impl RenderContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    /// Bind `name` to `value`, copying the bindings first if they are shared.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        Arc::make_mut(&mut self.vars).insert(name.into(), value.into());
    }

    /// Builder-style variant of [`RenderContext::set`].
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        if !self.vars.contains_key(name) {
            return None;
        }
        Arc::make_mut(&mut self.vars).remove(name)
    }

    /// Bindings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.vars.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RenderContext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let vars = iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self {
            vars: Arc::new(vars),
        }
    }
}

impl TryFrom<Value> for RenderContext {
    type Error = anyhow::Error;

    /// Build a context from a JSON object; any other JSON shape is rejected.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(anyhow::anyhow!(
                "render context must be a JSON object, got {}",
                json_type_name(&other)
            )),
        }
    }
}

/// Short type name of a JSON value for error messages.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
