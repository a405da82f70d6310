//! Template hierarchy fixtures
//!
//! Each fixture is an in-memory loader pre-populated with a small template
//! family plus the name of the template tests should resolve.

use std::sync::Arc;

use crate::ast::{Expr, Node, Template};
use crate::inheritance::InheritanceProcessor;
use crate::loader::{MemoryLoader, TemplateLoader};

/// A loader with a template family and the entry point into it.
#[derive(Clone, Debug)]
pub struct HierarchyFixture {
    pub name: String,
    pub loader: Arc<MemoryLoader>,
    pub entry: String,
}

impl HierarchyFixture {
    fn new(name: &str, entry: &str, templates: Vec<Template>) -> Self {
        let loader = MemoryLoader::new();
        for template in templates {
            loader.insert(template);
        }
        Self {
            name: name.to_string(),
            loader: Arc::new(loader),
            entry: entry.to_string(),
        }
    }

    /// `child.html` overrides `title` of `base.html` and leaves `content`.
    pub fn two_level() -> Self {
        Self::new("two_level", "child.html", vec![base(), child()])
    }

    /// `grandchild.html` -> `child.html` -> `base.html`, each overriding `title`.
    pub fn three_level() -> Self {
        Self::new(
            "three_level",
            "grandchild.html",
            vec![
                base(),
                child(),
                Template::new(
                    "grandchild.html",
                    vec![
                        Node::extends("child.html"),
                        Node::block("title", vec![Node::text("Grandchild title")]),
                    ],
                ),
            ],
        )
    }

    /// `leaf.html` inherits `content` from `mid.html`, which prepends to the
    /// base version through `super()`.
    pub fn mid_base() -> Self {
        Self::new(
            "mid_base",
            "leaf.html",
            vec![
                Template::new("base.html", vec![Node::block("content", vec![Node::text("Base")])]),
                Template::new(
                    "mid.html",
                    vec![
                        Node::extends("base.html"),
                        Node::block("content", vec![Node::text("Mid"), Node::super_call()]),
                    ],
                ),
                Template::new("leaf.html", vec![Node::extends("mid.html")]),
            ],
        )
    }

    /// A root template calling `super()` inside its own block.
    pub fn base_only_super() -> Self {
        Self::new(
            "base_only_super",
            "base.html",
            vec![Template::new(
                "base.html",
                vec![Node::block("content", vec![Node::text("Base"), Node::super_call()])],
            )],
        )
    }

    /// `a.html` -> `b.html` -> `a.html`.
    pub fn circular() -> Self {
        Self::new(
            "circular",
            "a.html",
            vec![
                Template::new("a.html", vec![Node::extends("b.html")]),
                Template::new("b.html", vec![Node::extends("a.html")]),
            ],
        )
    }

    /// `page.html` extends whatever the `layout` variable names.
    pub fn dynamic_layout() -> Self {
        Self::new(
            "dynamic_layout",
            "page.html",
            vec![
                Template::new(
                    "wide.html",
                    vec![Node::text("[wide]"), Node::block("content", vec![Node::text("wide default")])],
                ),
                Template::new(
                    "narrow.html",
                    vec![Node::text("[narrow]"), Node::block("content", vec![Node::text("narrow default")])],
                ),
                Template::new(
                    "page.html",
                    vec![
                        Node::extends_expr(Expr::var("layout")),
                        Node::block("content", vec![Node::text("Page")]),
                    ],
                ),
            ],
        )
    }

    /// Shared handle of the entry template.
    ///
    /// # Panics
    ///
    /// Panics if the entry template is missing from the loader.
    pub fn entry_template(&self) -> Arc<Template> {
        self.template(&self.entry)
    }

    /// # Panics
    ///
    /// Panics if `name` is not part of the fixture.
    pub fn template(&self, name: &str) -> Arc<Template> {
        self.loader
            .load_template(name)
            .unwrap_or_else(|e| panic!("fixture '{}' has no template '{name}': {e}", self.name))
    }

    /// Processor over this fixture's loader with a private default cache.
    pub fn processor(&self) -> InheritanceProcessor {
        InheritanceProcessor::new(self.loader.clone())
    }
}

fn base() -> Template {
    Template::new(
        "base.html",
        vec![
            Node::text("<title>"),
            Node::block("title", vec![Node::text("Base title")]),
            Node::text("</title>"),
            Node::block("content", vec![Node::text("Base content")]),
        ],
    )
}

fn child() -> Template {
    Template::new(
        "child.html",
        vec![
            Node::extends("base.html"),
            Node::block("title", vec![Node::text("Child title")]),
        ],
    )
}
