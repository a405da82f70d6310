//! Syntax tree consumed and produced by inheritance resolution.
//!
//! Templates arrive already parsed; this module only defines the shape of the
//! tree. Node kinds form a closed enum so every tree walk in the crate matches
//! exhaustively: adding a kind forces the extractor, builder, merger and
//! resolver to decide how to treat it.
//!
//! Trees are never mutated once they are wrapped in a [`Template`]. Anything
//! that rewrites a tree (override application, `super()` substitution) works
//! on a deep clone, which `#[derive(Clone)]` provides structurally.
//!
//! # Example
//!
//! ```rust
//! use tpl_inherit::ast::{Node, Template};
//!
//! let base = Template::new(
//!     "base.html",
//!     vec![
//!         Node::text("<title>"),
//!         Node::block("title", vec![Node::text("Home")]),
//!         Node::text("</title>"),
//!     ],
//! );
//! assert_eq!(
//!     base.to_string(),
//!     "<title>{% block title %}Home{% endblock %}</title>"
//! );
//! ```

mod display;
mod expr;

pub use expr::{Expr, Value};

/// Position of a node in its template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// A single node of a template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal template text.
    Text(String),
    /// `{{ expr }}`
    Output(OutputNode),
    /// `{% block name %}...{% endblock %}`
    Block(BlockNode),
    /// `{% if %}...{% elif %}...{% else %}...{% endif %}`
    If(IfNode),
    /// `{% for x in xs %}...{% else %}...{% endfor %}`
    For(ForNode),
    /// `{% extends target %}`
    Extends(ExtendsNode),
    /// `{% import target as alias %}`
    Import(ImportNode),
    /// `{% from target import a, b as c %}`
    FromImport(FromImportNode),
    /// `{% set target = value %}`
    Set(SetNode),
    /// Neutral container with no output of its own. Produced when a
    /// multi-node block body is substituted for `super()`.
    Group(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputNode {
    pub expr: Expr,
    pub location: Option<Location>,
}

/// A named, overridable region.
///
/// Names are not required to be unique within one tree; lookups use the first
/// occurrence in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub name: String,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfNode {
    pub condition: Expr,
    pub body: Vec<Node>,
    pub elifs: Vec<ElifBranch>,
    pub else_body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElifBranch {
    pub condition: Expr,
    pub body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForNode {
    pub targets: Vec<String>,
    pub iterable: Expr,
    pub body: Vec<Node>,
    pub else_body: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtendsNode {
    pub target: Expr,
    pub location: Option<Location>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportNode {
    pub template: Expr,
    pub alias: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FromImportNode {
    pub template: Expr,
    pub names: Vec<ImportedName>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportedName {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SetNode {
    pub target: String,
    pub value: Expr,
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    pub fn output(expr: Expr) -> Self {
        Node::Output(OutputNode {
            expr,
            location: None,
        })
    }

    /// `{{ super() }}` without a source location.
    pub fn super_call() -> Self {
        Node::output(Expr::Super)
    }

    /// `{{ super() }}` at a known source position.
    pub fn super_call_at(line: usize, column: usize) -> Self {
        Node::Output(OutputNode {
            expr: Expr::Super,
            location: Some(Location::new(line, column)),
        })
    }

    pub fn block(name: impl Into<String>, body: Vec<Node>) -> Self {
        Node::Block(BlockNode {
            name: name.into(),
            body,
        })
    }

    /// `{% extends "name" %}`
    pub fn extends(name: impl Into<String>) -> Self {
        Node::extends_expr(Expr::string(name))
    }

    /// `{% extends <expr> %}` for dynamic inheritance.
    pub fn extends_expr(target: Expr) -> Self {
        Node::Extends(ExtendsNode {
            target,
            location: None,
        })
    }

    pub fn import(template: impl Into<String>, alias: impl Into<String>) -> Self {
        Node::Import(ImportNode {
            template: Expr::string(template),
            alias: alias.into(),
        })
    }

    pub fn from_import(template: impl Into<String>, names: &[&str]) -> Self {
        Node::FromImport(FromImportNode {
            template: Expr::string(template),
            names: names
                .iter()
                .map(|name| ImportedName {
                    name: (*name).to_string(),
                    alias: None,
                })
                .collect(),
        })
    }

    pub fn if_else(condition: Expr, body: Vec<Node>, else_body: Vec<Node>) -> Self {
        Node::If(IfNode {
            condition,
            body,
            elifs: Vec::new(),
            else_body,
        })
    }

    pub fn for_loop(target: impl Into<String>, iterable: Expr, body: Vec<Node>) -> Self {
        Node::For(ForNode {
            targets: vec![target.into()],
            iterable,
            body,
            else_body: Vec::new(),
        })
    }

    /// True for an output node whose expression is exactly `super()`.
    #[must_use]
    pub fn is_super_call(&self) -> bool {
        matches!(self, Node::Output(OutputNode { expr, .. }) if expr.is_super())
    }

    #[must_use]
    pub fn as_block(&self) -> Option<&BlockNode> {
        match self {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }
}

/// An identifying name plus an immutable tree.
///
/// Templates are owned by the loader and shared as `Arc<Template>`; the
/// inheritance engine only borrows them and clones when it needs to rewrite.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn new(name: impl Into<String>, nodes: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            nodes,
        }
    }

    /// The first top-level `extends` declaration, if any.
    ///
    /// Only top-level declarations count: an `extends` nested in a block or
    /// conditional is not an inheritance declaration.
    #[must_use]
    pub fn extends(&self) -> Option<&ExtendsNode> {
        self.nodes.iter().find_map(|node| match node {
            Node::Extends(extends) => Some(extends),
            _ => None,
        })
    }

    /// True when this template declares a parent through an expression rather
    /// than a literal name.
    #[must_use]
    pub fn has_dynamic_extends(&self) -> bool {
        self.extends().is_some_and(|extends| extends.target.is_dynamic())
    }
}
