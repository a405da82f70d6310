//! Inheritance chain construction.
//!
//! Starting from the requested template, follow `extends` declarations until a
//! template without one is reached. Targets are either literal names (static
//! inheritance) or expressions evaluated against the render context (dynamic
//! inheritance). A static chain depends only on template source and may be
//! cached by name; a dynamic one must be rebuilt for every context.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::ast::{Expr, Template, Value};
use crate::context::{RenderContext, json_type_name};
use crate::core::{InheritanceError, Result};
use crate::eval::ExpressionEvaluator;
use crate::loader::TemplateLoader;

use super::blocks::{BlockDefinition, BlockMap, ExtractionRole, extract_blocks};

/// The ordered chain of templates from the requested one to its root.
///
/// Invariants: `templates()[0]` is the requested template, the last element is
/// the root (the only one without `extends`), and no name appears twice.
#[derive(Debug, Clone)]
pub struct InheritanceHierarchy {
    templates: Vec<Arc<Template>>,
    block_map: BlockMap,
    template_map: HashMap<String, Arc<Template>>,
    dynamic: bool,
}

impl InheritanceHierarchy {
    /// Templates in child-to-root order.
    #[must_use]
    pub fn templates(&self) -> &[Arc<Template>] {
        &self.templates
    }

    /// The requested template.
    #[must_use]
    pub fn leaf(&self) -> Option<&Arc<Template>> {
        self.templates.first()
    }

    /// The template at the top of the chain.
    #[must_use]
    pub fn root(&self) -> Option<&Arc<Template>> {
        self.templates.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// True when the chain is a lone template with no parent.
    #[must_use]
    pub fn is_single(&self) -> bool {
        self.templates.len() == 1
    }

    /// True when any link of the chain was resolved from the render context.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    /// Most-derived definition of `name` in the chain.
    #[must_use]
    pub fn block(&self, name: &str) -> Option<&BlockDefinition> {
        self.block_map.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.template_map.contains_key(name)
    }

    /// Template names in child-to-root order.
    #[must_use]
    pub fn chain_names(&self) -> Vec<String> {
        self.templates.iter().map(|t| t.name.clone()).collect()
    }

    #[cfg(test)]
    pub(crate) fn from_templates(templates: Vec<Arc<Template>>) -> Self {
        let mut block_map = BlockMap::new();
        let mut template_map = HashMap::new();
        for (depth, template) in templates.iter().enumerate() {
            let role = if depth == 0 {
                ExtractionRole::Child
            } else {
                ExtractionRole::Parent
            };
            extract_blocks(template, depth, role, &mut block_map);
            template_map.insert(template.name.clone(), Arc::clone(template));
        }
        Self {
            templates,
            block_map,
            template_map,
            dynamic: false,
        }
    }
}

/// Walks `extends` declarations through a loader.
pub struct HierarchyBuilder<'a> {
    loader: &'a dyn TemplateLoader,
    evaluator: &'a dyn ExpressionEvaluator,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(loader: &'a dyn TemplateLoader, evaluator: &'a dyn ExpressionEvaluator) -> Self {
        Self { loader, evaluator }
    }

    /// Build the chain for `template`.
    ///
    /// `context` is only consulted for dynamic `extends` targets.
    ///
    /// # Errors
    ///
    /// - [`InheritanceError::CircularInheritance`] when a name repeats
    /// - [`InheritanceError::ParentLoad`] when the loader fails
    /// - [`InheritanceError::DynamicExtendsEvaluation`] / [`InheritanceError::DynamicExtendsType`]
    ///   when a dynamic target cannot be turned into a template name
    pub fn build(&self, template: &Arc<Template>, context: &RenderContext) -> Result<InheritanceHierarchy> {
        tracing::debug!("Building inheritance hierarchy for '{}'", template.name);

        let mut hierarchy = InheritanceHierarchy {
            templates: Vec::new(),
            block_map: BlockMap::new(),
            template_map: HashMap::new(),
            dynamic: false,
        };
        let mut seen = HashSet::new();
        let mut current = Arc::clone(template);

        loop {
            if !seen.insert(current.name.clone()) {
                return Err(InheritanceError::CircularInheritance {
                    name: current.name.clone(),
                    chain: hierarchy.chain_names(),
                });
            }

            let depth = hierarchy.templates.len();
            let role = if depth == 0 {
                ExtractionRole::Child
            } else {
                ExtractionRole::Parent
            };
            extract_blocks(&current, depth, role, &mut hierarchy.block_map);
            hierarchy.template_map.insert(current.name.clone(), Arc::clone(&current));
            hierarchy.templates.push(Arc::clone(&current));

            let Some(parent_name) = self.parent_name(&current, context, &mut hierarchy.dynamic)? else {
                break;
            };

            tracing::trace!("'{}' extends '{}'", current.name, parent_name);
            let parent = self.loader.load_template(&parent_name).map_err(|source| {
                InheritanceError::ParentLoad {
                    parent: parent_name.clone(),
                    child: current.name.clone(),
                    source,
                }
            })?;
            current = parent;
        }

        tracing::debug!(
            "Resolved hierarchy for '{}': {} ({})",
            template.name,
            hierarchy.chain_names().join(" -> "),
            if hierarchy.dynamic {
                "dynamic"
            } else {
                "static"
            }
        );
        Ok(hierarchy)
    }

    /// Name of the parent `template` extends, or `None` for a root.
    fn parent_name(
        &self,
        template: &Template,
        context: &RenderContext,
        dynamic: &mut bool,
    ) -> Result<Option<String>> {
        let Some(extends) = template.extends() else {
            return Ok(None);
        };

        if let Some(name) = extends.target.as_literal_str() {
            return Ok(Some(trim_quotes(name).to_string()));
        }

        if extends.target.is_dynamic() {
            *dynamic = true;
        }
        self.evaluate_target(&extends.target, template, context).map(Some)
    }

    fn evaluate_target(&self, target: &Expr, template: &Template, context: &RenderContext) -> Result<String> {
        let value = self.evaluator.evaluate(target, context).map_err(|source| {
            InheritanceError::DynamicExtendsEvaluation {
                template: template.name.clone(),
                source,
            }
        })?;

        match value {
            Value::String(name) => Ok(name),
            other => Err(InheritanceError::DynamicExtendsType {
                template: template.name.clone(),
                found: json_type_name(&other),
            }),
        }
    }
}

/// Literal names may still carry the quotes of their source spelling.
fn trim_quotes(name: &str) -> &str {
    name.trim_matches(|c| c == '"' || c == '\'')
}
