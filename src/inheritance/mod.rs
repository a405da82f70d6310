//! Template inheritance resolution.
//!
//! [`InheritanceProcessor::resolve_inheritance`] turns a template that
//! `extends` a parent into one self-contained tree:
//!
//! 1. Templates with neither `extends` nor `super()` are returned as-is.
//! 2. The resolved-template cache is consulted.
//! 3. The chain is built by [`HierarchyBuilder`], or taken from the hierarchy
//!    cache when it is static.
//! 4. [`merge_traced`] layers each level's blocks on a clone of the root.
//! 5. [`SuperResolver`] substitutes `super()` calls.
//! 6. Both cache tiers are updated.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tpl_inherit::ast::{Node, Template};
//! use tpl_inherit::context::RenderContext;
//! use tpl_inherit::inheritance::InheritanceProcessor;
//! use tpl_inherit::loader::MemoryLoader;
//!
//! let loader = Arc::new(MemoryLoader::new());
//! loader.insert(Template::new(
//!     "base.html",
//!     vec![Node::block("content", vec![Node::text("Base")])],
//! ));
//! let page = loader.insert(Template::new(
//!     "page.html",
//!     vec![
//!         Node::extends("base.html"),
//!         Node::block("content", vec![Node::text("Page "), Node::super_call()]),
//!     ],
//! ));
//!
//! let processor = InheritanceProcessor::new(loader);
//! let resolved = processor.resolve_inheritance(&page, &RenderContext::new())?;
//! assert_eq!(resolved.to_string(), "{% block content %}Page Base{% endblock %}");
//! # Ok::<(), tpl_inherit::core::InheritanceError>(())
//! ```

pub mod blocks;
pub mod hierarchy;
pub mod merge;
pub mod super_resolver;

pub use blocks::{BlockDefinition, BlockMap, ExtractionRole, extract_blocks, find_block};
pub use hierarchy::{HierarchyBuilder, InheritanceHierarchy};
pub use merge::{BlockOrigin, merge, merge_traced};
pub use super_resolver::{SuperResolver, has_super_calls};

use std::sync::Arc;

use crate::ast::Template;
use crate::cache::{CacheStats, InheritanceCache, ResolvedEntry};
use crate::config::EngineConfig;
use crate::constants::{DEFAULT_MAX_SUPER_DEPTH, STATIC_CONTEXT_DIGEST};
use crate::context::{ContextHasher, RenderContext};
use crate::core::Result;
use crate::eval::{ContextEvaluator, ExpressionEvaluator};
use crate::loader::TemplateLoader;

/// True when `template` declares a parent or calls `super()` anywhere.
#[must_use]
pub fn has_inheritance_directives(template: &Template) -> bool {
    template.extends().is_some() || has_super_calls(&template.nodes)
}

/// Resolves template inheritance through a loader, with caching.
///
/// Processors are cheap to clone in spirit: the loader, evaluator and cache
/// are all shared handles. Several processors may share one
/// [`InheritanceCache`].
pub struct InheritanceProcessor {
    loader: Arc<dyn TemplateLoader>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    cache: Arc<InheritanceCache>,
    hasher: ContextHasher,
    max_super_depth: usize,
}

impl std::fmt::Debug for InheritanceProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InheritanceProcessor")
            .field("cache", &self.cache)
            .field("max_super_depth", &self.max_super_depth)
            .finish_non_exhaustive()
    }
}

impl InheritanceProcessor {
    /// Processor with a private cache using default settings.
    pub fn new(loader: Arc<dyn TemplateLoader>) -> Self {
        Self::with_cache(loader, Arc::new(InheritanceCache::new()))
    }

    /// Processor sharing `cache` with other processors.
    pub fn with_cache(loader: Arc<dyn TemplateLoader>, cache: Arc<InheritanceCache>) -> Self {
        Self {
            loader,
            evaluator: Arc::new(ContextEvaluator::new()),
            cache,
            hasher: ContextHasher::new(),
            max_super_depth: DEFAULT_MAX_SUPER_DEPTH,
        }
    }

    /// Processor with a private cache sized and timed by `config`.
    pub fn from_config(loader: Arc<dyn TemplateLoader>, config: &EngineConfig) -> Self {
        Self::with_cache(loader, Arc::new(InheritanceCache::from_config(&config.cache)))
            .with_max_super_depth(config.max_super_depth)
    }

    /// Replace the evaluator used for dynamic `extends` targets.
    #[must_use]
    pub fn with_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    #[must_use]
    pub fn with_max_super_depth(mut self, max_super_depth: usize) -> Self {
        self.max_super_depth = max_super_depth;
        self
    }

    /// Produce the fully resolved tree for `template`.
    ///
    /// Templates without inheritance directives come back as the same `Arc`.
    /// The returned tree is shared with the cache and must be treated as
    /// read-only.
    ///
    /// # Errors
    ///
    /// Any [`InheritanceError`](crate::core::InheritanceError) raised while
    /// building the chain or resolving `super()`. Nothing is cached for a
    /// failed resolution.
    pub fn resolve_inheritance(
        &self,
        template: &Arc<Template>,
        context: &RenderContext,
    ) -> Result<Arc<Template>> {
        if !has_inheritance_directives(template) {
            return Ok(Arc::clone(template));
        }

        let name = template.name.as_str();
        let generation = self.cache.generation();
        let leaf_is_static = !template.has_dynamic_extends();

        // A static leaf usually means a static chain, whose result is stored
        // under the fixed digest whether or not its hierarchy is still cached
        if leaf_is_static {
            if let Some(resolved) =
                self.cache.get_resolved(name, STATIC_CONTEXT_DIGEST, STATIC_CONTEXT_DIGEST)
            {
                return Ok(resolved);
            }
        }
        let cached_hierarchy = if leaf_is_static {
            self.cache.get_hierarchy(name)
        } else {
            None
        };

        let digest = self.hasher.hash(context);
        let full_digest = self.hasher.full_digest(context);

        // A cached hierarchy is static by construction, and its static entry
        // was already looked up
        if cached_hierarchy.is_none() {
            if let Some(resolved) = self.cache.get_resolved(name, &digest, &full_digest) {
                return Ok(resolved);
            }
        }

        let hierarchy = match cached_hierarchy {
            Some(hierarchy) => hierarchy,
            None => {
                let built = Arc::new(
                    HierarchyBuilder::new(self.loader.as_ref(), self.evaluator.as_ref())
                        .build(template, context)?,
                );
                if !built.is_dynamic() {
                    self.cache.store_hierarchy_at(name, Arc::clone(&built), generation);
                }
                built
            }
        };

        let (merged, origins) = merge_traced(&hierarchy)?;
        // also catches out-of-block calls in skeletons the merge discarded
        let needs_super = hierarchy.templates().iter().any(|t| has_super_calls(&t.nodes));
        let resolved = if needs_super {
            SuperResolver::new(&hierarchy)
                .with_max_depth(self.max_super_depth)
                .resolve(merged, &origins)?
        } else {
            merged
        };
        let resolved = Arc::new(resolved);

        let (key, verify) = if hierarchy.is_dynamic() {
            (digest, full_digest)
        } else {
            (STATIC_CONTEXT_DIGEST.to_string(), STATIC_CONTEXT_DIGEST.to_string())
        };
        self.cache.store_resolved_at(
            name,
            &key,
            ResolvedEntry {
                template: Arc::clone(&resolved),
                full_digest: verify,
                chain: hierarchy.chain_names(),
            },
            generation,
        );

        tracing::debug!(
            "Resolved inheritance for '{}' through {} template(s)",
            name,
            hierarchy.len()
        );
        Ok(resolved)
    }

    /// Build the chain for `template` without merging or caching it.
    pub fn build_hierarchy(&self, template: &Arc<Template>, context: &RenderContext) -> Result<InheritanceHierarchy> {
        HierarchyBuilder::new(self.loader.as_ref(), self.evaluator.as_ref()).build(template, context)
    }

    /// Forget every cached result that depends on `name`.
    pub fn invalidate_template(&self, name: &str) {
        self.cache.invalidate_template(name);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<InheritanceCache> {
        &self.cache
    }
}
