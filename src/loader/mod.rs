//! Template loading.
//!
//! The inheritance engine never reads template source itself; it asks a
//! [`TemplateLoader`] for already-parsed templates by name. Hosts implement the
//! trait on top of whatever storage and parser they use. [`MemoryLoader`] is a
//! concurrent in-memory registry suitable for tests and for hosts that parse up
//! front.

use dashmap::DashMap;
use std::sync::Arc;

use crate::ast::Template;
use crate::core::LoadError;

/// Source of parsed templates, looked up by name.
pub trait TemplateLoader: Send + Sync {
    /// Return the template registered under `name`.
    ///
    /// Implementations return [`LoadError::NotFound`] for unknown names and
    /// [`LoadError::Failed`] for anything else (I/O, parse errors).
    fn load_template(&self, name: &str) -> Result<Arc<Template>, LoadError>;
}

impl<T: TemplateLoader + ?Sized> TemplateLoader for Arc<T> {
    fn load_template(&self, name: &str) -> Result<Arc<Template>, LoadError> {
        (**self).load_template(name)
    }
}

/// Thread-safe in-memory template registry.
///
/// Templates are stored as `Arc<Template>`, so every load of the same name
/// hands out the same tree without copying it.
#[derive(Debug, Default)]
pub struct MemoryLoader {
    templates: DashMap<String, Arc<Template>>,
}

impl MemoryLoader {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template under its own name, replacing any previous one.
    ///
    /// Returns the shared handle that subsequent loads will return.
    pub fn insert(&self, template: Template) -> Arc<Template> {
        let template = Arc::new(template);
        self.templates.insert(template.name.clone(), Arc::clone(&template));
        template
    }

    /// Builder-style [`MemoryLoader::insert`].
    #[must_use]
    pub fn with(self, template: Template) -> Self {
        self.insert(template);
        self
    }

    pub fn remove(&self, name: &str) -> Option<Arc<Template>> {
        self.templates.remove(name).map(|(_, template)| template)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateLoader for MemoryLoader {
    fn load_template(&self, name: &str) -> Result<Arc<Template>, LoadError> {
        self.templates
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| LoadError::not_found(name))
    }
}
