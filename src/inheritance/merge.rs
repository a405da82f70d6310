//! Override merging.
//!
//! The merged tree starts as a clone of the root template. Each level below
//! the root then replaces the block nodes it defines, parent level first, so a
//! grandchild's definition lands last and wins. A replacement is inserted as a
//! whole: nested blocks inside it are not revisited in the same pass, but the
//! levels that follow still see and replace them.
//!
//! [`merge_traced`] also reports, for every block of the merged tree, which
//! hierarchy level its definition was taken from. `super()` resolution starts
//! from that level.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ast::{BlockNode, Node, Template};
use crate::core::{InheritanceError, Result};

use super::blocks::collect_own_blocks;
use super::hierarchy::InheritanceHierarchy;

/// Produce one tree from `hierarchy`, named after the requested template.
///
/// `super()` calls are left in place; see
/// [`SuperResolver`](super::super_resolver::SuperResolver).
///
/// # Errors
///
/// [`InheritanceError::NoRootTemplate`] when the hierarchy is empty.
pub fn merge(hierarchy: &InheritanceHierarchy) -> Result<Template> {
    merge_traced(hierarchy).map(|(template, _)| template)
}

/// Where one block of a merged tree came from.
///
/// `nested` lists the blocks inside this one, in tree order, taking
/// conditionals, loops and groups into account but not other blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockOrigin {
    /// Hierarchy index of the template that defined the block (0 = requested template)
    pub level: usize,
    pub nested: Vec<BlockOrigin>,
}

impl BlockOrigin {
    fn of(block: &BlockNode, level: usize) -> Self {
        let mut nested = Vec::new();
        collect_origins(&block.body, level, &mut nested);
        Self { level, nested }
    }
}

/// [`merge`], plus the origin of every outermost block of the result.
///
/// # Errors
///
/// [`InheritanceError::NoRootTemplate`] when the hierarchy is empty.
pub fn merge_traced(hierarchy: &InheritanceHierarchy) -> Result<(Template, Vec<BlockOrigin>)> {
    let root = hierarchy.root().ok_or(InheritanceError::NoRootTemplate)?;
    let templates = hierarchy.templates();

    let mut nodes = root.nodes.clone();
    let mut origins = Vec::new();
    collect_origins(&nodes, templates.len() - 1, &mut origins);

    for level in (0..templates.len() - 1).rev() {
        let overrides = collect_own_blocks(&templates[level].nodes);
        if overrides.is_empty() {
            continue;
        }
        tracing::trace!(
            "Applying {} override(s) from '{}'",
            overrides.len(),
            templates[level].name
        );
        Overrides { blocks: &overrides, level }.apply(&mut nodes, &mut origins, &mut 0);
    }

    // imports hold no blocks, so the origins stay aligned
    hoist_imports(&mut nodes, &templates[..templates.len() - 1]);

    let name = hierarchy.leaf().map_or_else(|| root.name.clone(), |leaf| leaf.name.clone());
    Ok((Template::new(name, nodes), origins))
}

fn collect_origins(nodes: &[Node], level: usize, out: &mut Vec<BlockOrigin>) {
    for node in nodes {
        match node {
            Node::Block(block) => out.push(BlockOrigin::of(block, level)),
            Node::If(node) => {
                collect_origins(&node.body, level, out);
                for elif in &node.elifs {
                    collect_origins(&elif.body, level, out);
                }
                collect_origins(&node.else_body, level, out);
            }
            Node::For(node) => {
                collect_origins(&node.body, level, out);
                collect_origins(&node.else_body, level, out);
            }
            Node::Group(children) => collect_origins(children, level, out),
            Node::Text(_)
            | Node::Output(_)
            | Node::Extends(_)
            | Node::Import(_)
            | Node::FromImport(_)
            | Node::Set(_) => {}
        }
    }
}

/// One level's own blocks being layered onto the working tree.
struct Overrides<'a, 'b> {
    blocks: &'a HashMap<&'b str, &'b BlockNode>,
    level: usize,
}

impl Overrides<'_, '_> {
    /// `origins` mirrors the blocks of `nodes`; `cursor` is the next unvisited one.
    fn apply(&self, nodes: &mut [Node], origins: &mut [BlockOrigin], cursor: &mut usize) {
        for node in nodes {
            match node {
                Node::Block(block) => {
                    let slot = *cursor;
                    *cursor += 1;
                    match self.blocks.get(block.name.as_str()) {
                        Some(replacement) => {
                            *block = (*replacement).clone();
                            if let Some(origin) = origins.get_mut(slot) {
                                *origin = BlockOrigin::of(block, self.level);
                            }
                        }
                        None => match origins.get_mut(slot) {
                            Some(origin) => self.apply(&mut block.body, &mut origin.nested, &mut 0),
                            None => self.apply(&mut block.body, &mut [], &mut 0),
                        },
                    }
                }
                Node::If(node) => {
                    self.apply(&mut node.body, origins, cursor);
                    for elif in &mut node.elifs {
                        self.apply(&mut elif.body, origins, cursor);
                    }
                    self.apply(&mut node.else_body, origins, cursor);
                }
                Node::For(node) => {
                    self.apply(&mut node.body, origins, cursor);
                    self.apply(&mut node.else_body, origins, cursor);
                }
                Node::Group(children) => self.apply(children, origins, cursor),
                Node::Text(_)
                | Node::Output(_)
                | Node::Extends(_)
                | Node::Import(_)
                | Node::FromImport(_)
                | Node::Set(_) => {}
            }
        }
    }
}

/// Copy the top-level imports of every non-root level into the merged tree.
///
/// Descendants' imports would otherwise disappear with their skeletons. They
/// go first, child before parent, behind a leading `extends` if the tree
/// starts with one. The root's imports are already in place.
fn hoist_imports(nodes: &mut Vec<Node>, levels: &[Arc<Template>]) {
    let imports: Vec<Node> = levels
        .iter()
        .flat_map(|template| template.nodes.iter())
        .filter(|node| matches!(node, Node::Import(_) | Node::FromImport(_)))
        .cloned()
        .collect();
    if imports.is_empty() {
        return;
    }

    let at = usize::from(matches!(nodes.first(), Some(Node::Extends(_))));
    nodes.splice(at..at, imports);
}
