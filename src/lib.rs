//! tpl-inherit - template inheritance resolution for Jinja2-style trees
//!
//! Given a parsed template that declares a parent with `{% extends %}`, this
//! crate produces one merged syntax tree in which child blocks replace parent
//! blocks, nested blocks survive, and `{{ super() }}` is replaced with the
//! next ancestor's version of the enclosing block. Parents may be named
//! literally or computed from the render context (dynamic inheritance).
//! Results are cached in two tiers that stay correct when the same templates
//! are resolved concurrently with different contexts.
//!
//! Lexing, parsing, rendering and expression semantics belong to the host
//! template engine. The crate consumes already-parsed trees through
//! [`loader::TemplateLoader`] and evaluates dynamic `extends` targets through
//! [`eval::ExpressionEvaluator`].
//!
//! # Core Modules
//!
//! - [`ast`] - Syntax tree types shared with the host engine
//! - [`inheritance`] - Block extraction, hierarchy building, merging, `super()`
//!   resolution and the [`InheritanceProcessor`] entry point
//! - [`cache`] - Hierarchy and resolved-template caches with TTL and LRU
//! - [`context`] - Render context and its cache-key digest
//!
//! ## Supporting Modules
//! - [`config`] - TOML configuration of cache limits and recursion depth
//! - [`constants`] - Default TTLs, limits and key sentinels
//! - [`core`] - Error types and user-facing error rendering
//! - [`eval`] - Expression evaluator seam with a context-only default
//! - [`loader`] - Template loader seam with an in-memory registry
//!
//! # Resolution Pipeline
//!
//! ```text
//! request ─▶ no extends / super()? ─▶ return as-is
//!         ─▶ resolved cache hit?   ─▶ return cached tree
//!         ─▶ hierarchy (cache or build) ─▶ merge ─▶ resolve super() ─▶ store
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tpl_inherit::ast::{Expr, Node, Template};
//! use tpl_inherit::{InheritanceProcessor, MemoryLoader, RenderContext};
//!
//! let loader = Arc::new(MemoryLoader::new());
//! loader.insert(Template::new(
//!     "admin.html",
//!     vec![Node::text("[admin]"), Node::block("body", vec![Node::text("Admin")])],
//! ));
//! let page = loader.insert(Template::new(
//!     "page.html",
//!     vec![
//!         Node::extends_expr(Expr::var("layout")),
//!         Node::block("body", vec![Node::super_call(), Node::text(" / Page")]),
//!     ],
//! ));
//!
//! let processor = InheritanceProcessor::new(loader);
//! let context = RenderContext::new().with("layout", "admin.html");
//! let resolved = processor.resolve_inheritance(&page, &context)?;
//! assert_eq!(resolved.to_string(), "[admin]{% block body %}Admin / Page{% endblock %}");
//! # Ok::<(), tpl_inherit::InheritanceError>(())
//! ```

pub mod ast;
pub mod cache;
pub mod config;
pub mod constants;
pub mod context;
pub mod core;
pub mod eval;
pub mod inheritance;
pub mod loader;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use cache::{CacheStats, InheritanceCache};
pub use config::{CacheConfig, EngineConfig};
pub use context::{ContextHasher, RenderContext};
pub use core::{InheritanceError, LoadError};
pub use inheritance::{InheritanceHierarchy, InheritanceProcessor};
pub use loader::{MemoryLoader, TemplateLoader};
