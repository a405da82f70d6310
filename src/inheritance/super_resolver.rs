//! `super()` substitution.
//!
//! Every block name has its own ancestor chain: the first block of that name
//! in each template of the hierarchy, requested template first. Templates that
//! do not define the block are not part of its chain. A block of the merged
//! tree sits at the chain position of the template it was taken from (see
//! [`merge_traced`]), which is not always the most derived definer: a block
//! nested in an override the root has no slot for never reaches the tree. A
//! `super()` call at position `d` is replaced by the body of entry `d + 1`,
//! itself resolved at `d + 1`. When the chain runs out the call becomes empty
//! text.

use std::collections::HashMap;

use crate::ast::{Location, Node, Template};
use crate::constants::DEFAULT_MAX_SUPER_DEPTH;
use crate::core::{InheritanceError, Result};

use super::blocks::find_block;
use super::hierarchy::InheritanceHierarchy;
use super::merge::{BlockOrigin, merge_traced};

/// Replaces `super()` calls in a merged tree. One resolver serves one
/// resolution; its lookup cache is not shared.
pub struct SuperResolver<'h> {
    hierarchy: &'h InheritanceHierarchy,
    max_depth: usize,
    resolved: HashMap<(String, usize), Node>,
}

impl<'h> SuperResolver<'h> {
    pub fn new(hierarchy: &'h InheritanceHierarchy) -> Self {
        Self {
            hierarchy,
            max_depth: DEFAULT_MAX_SUPER_DEPTH,
            resolved: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Merge the hierarchy and resolve every `super()` call in the result.
    ///
    /// # Errors
    ///
    /// As [`merge_traced`] and [`SuperResolver::resolve`].
    pub fn merge_and_resolve(&mut self) -> Result<Template> {
        let (merged, origins) = merge_traced(self.hierarchy)?;
        self.resolve(merged, &origins)
    }

    /// Resolve every `super()` call in `template`, a merged tree whose block
    /// origins are `origins`.
    ///
    /// All templates of the hierarchy are checked for calls outside any block
    /// before anything is substituted. Blocks missing from `origins` are
    /// treated as coming from the requested template.
    ///
    /// # Errors
    ///
    /// - [`InheritanceError::SuperOutsideBlock`] for a call with no enclosing block
    /// - [`InheritanceError::SuperDepthExceeded`] when substitution nests deeper
    ///   than the configured limit
    pub fn resolve(&mut self, mut template: Template, origins: &[BlockOrigin]) -> Result<Template> {
        for source in self.hierarchy.templates() {
            validate_calls(&source.nodes, false, &source.name)?;
        }
        validate_calls(&template.nodes, false, &template.name)?;

        self.resolve_placed(&mut template.nodes, origins, &mut 0, None)?;
        tracing::trace!(
            "Resolved super() in '{}' ({} ancestor lookup(s))",
            template.name,
            self.resolved.len()
        );
        Ok(template)
    }

    /// Walk blocks of the merged tree, each at the level it was taken from.
    fn resolve_placed(
        &mut self,
        nodes: &mut [Node],
        origins: &[BlockOrigin],
        cursor: &mut usize,
        block: Option<(&str, usize)>,
    ) -> Result<()> {
        for node in nodes {
            if node.is_super_call() {
                *node = self.substitute(node, block)?;
                continue;
            }

            match node {
                Node::Block(inner) => {
                    let origin = origins.get(*cursor);
                    *cursor += 1;
                    let level = origin.map_or(0, |origin| origin.level);
                    let nested = origin.map_or(&[][..], |origin| origin.nested.as_slice());
                    let name = inner.name.clone();
                    self.resolve_placed(&mut inner.body, nested, &mut 0, Some((name.as_str(), level)))?;
                }
                Node::If(inner) => {
                    self.resolve_placed(&mut inner.body, origins, cursor, block)?;
                    for elif in &mut inner.elifs {
                        self.resolve_placed(&mut elif.body, origins, cursor, block)?;
                    }
                    self.resolve_placed(&mut inner.else_body, origins, cursor, block)?;
                }
                Node::For(inner) => {
                    self.resolve_placed(&mut inner.body, origins, cursor, block)?;
                    self.resolve_placed(&mut inner.else_body, origins, cursor, block)?;
                }
                Node::Group(children) => self.resolve_placed(children, origins, cursor, block)?,
                Node::Text(_)
                | Node::Output(_)
                | Node::Extends(_)
                | Node::Import(_)
                | Node::FromImport(_)
                | Node::Set(_) => {}
            }
        }
        Ok(())
    }

    /// Walk substituted ancestor content, every block of which comes from `level`.
    fn resolve_nodes(&mut self, nodes: &mut [Node], block: Option<&str>, level: usize) -> Result<()> {
        for node in nodes {
            if node.is_super_call() {
                *node = self.substitute(node, block.map(|name| (name, level)))?;
                continue;
            }

            match node {
                Node::Block(inner) => {
                    let name = inner.name.clone();
                    self.resolve_nodes(&mut inner.body, Some(&name), level)?;
                }
                Node::If(inner) => {
                    self.resolve_nodes(&mut inner.body, block, level)?;
                    for elif in &mut inner.elifs {
                        self.resolve_nodes(&mut elif.body, block, level)?;
                    }
                    self.resolve_nodes(&mut inner.else_body, block, level)?;
                }
                Node::For(inner) => {
                    self.resolve_nodes(&mut inner.body, block, level)?;
                    self.resolve_nodes(&mut inner.else_body, block, level)?;
                }
                Node::Group(children) => self.resolve_nodes(children, block, level)?,
                Node::Text(_)
                | Node::Output(_)
                | Node::Extends(_)
                | Node::Import(_)
                | Node::FromImport(_)
                | Node::Set(_) => {}
            }
        }
        Ok(())
    }

    fn substitute(&mut self, call: &Node, block: Option<(&str, usize)>) -> Result<Node> {
        match block {
            Some((name, level)) => self.resolve_call(name, level),
            None => Err(InheritanceError::SuperOutsideBlock {
                template: None,
                location: super_location(call),
            }),
        }
    }

    fn resolve_call(&mut self, block: &str, level: usize) -> Result<Node> {
        let chain = self.chain(block);
        let depth = chain.partition_point(|&definer| definer < level);
        if depth > self.max_depth {
            return Err(InheritanceError::SuperDepthExceeded {
                block: block.to_string(),
                limit: self.max_depth,
            });
        }

        let key = (block.to_string(), depth);
        if let Some(cached) = self.resolved.get(&key) {
            return Ok(cached.clone());
        }

        let Some(&ancestor) = chain.iter().find(|&&definer| definer > level) else {
            return Ok(Node::text(""));
        };
        let mut body = self
            .hierarchy
            .templates()
            .get(ancestor)
            .and_then(|template| find_block(&template.nodes, block))
            .map(|definition| definition.body.clone())
            .unwrap_or_default();
        self.resolve_nodes(&mut body, Some(block), ancestor)?;

        let resolved = collapse(body);
        self.resolved.insert(key, resolved.clone());
        Ok(resolved)
    }

    /// Hierarchy indices of the templates defining `block`, child first.
    fn chain(&self, block: &str) -> Vec<usize> {
        // the block map records the most derived definer
        let Some(first) = self.hierarchy.block(block) else {
            return Vec::new();
        };
        self.hierarchy
            .templates()
            .iter()
            .enumerate()
            .skip(first.depth)
            .filter(|(_, template)| find_block(&template.nodes, block).is_some())
            .map(|(index, _)| index)
            .collect()
    }
}

fn collapse(mut body: Vec<Node>) -> Node {
    match body.len() {
        0 => Node::text(""),
        1 => body.remove(0),
        _ => Node::Group(body),
    }
}

fn super_location(node: &Node) -> Option<Location> {
    match node {
        Node::Output(output) => output.location,
        _ => None,
    }
}

fn validate_calls(nodes: &[Node], in_block: bool, template: &str) -> Result<()> {
    for node in nodes {
        if node.is_super_call() && !in_block {
            return Err(InheritanceError::SuperOutsideBlock {
                template: Some(template.to_string()),
                location: super_location(node),
            });
        }
        match node {
            Node::Block(block) => validate_calls(&block.body, true, template)?,
            Node::If(inner) => {
                validate_calls(&inner.body, in_block, template)?;
                for elif in &inner.elifs {
                    validate_calls(&elif.body, in_block, template)?;
                }
                validate_calls(&inner.else_body, in_block, template)?;
            }
            Node::For(inner) => {
                validate_calls(&inner.body, in_block, template)?;
                validate_calls(&inner.else_body, in_block, template)?;
            }
            Node::Group(children) => validate_calls(children, in_block, template)?,
            Node::Text(_)
            | Node::Output(_)
            | Node::Extends(_)
            | Node::Import(_)
            | Node::FromImport(_)
            | Node::Set(_) => {}
        }
    }
    Ok(())
}

/// True when any node of the tree is a `super()` call.
#[must_use]
pub fn has_super_calls(nodes: &[Node]) -> bool {
    nodes.iter().any(|node| {
        node.is_super_call()
            || match node {
                Node::Block(block) => has_super_calls(&block.body),
                Node::If(inner) => {
                    has_super_calls(&inner.body)
                        || inner.elifs.iter().any(|elif| has_super_calls(&elif.body))
                        || has_super_calls(&inner.else_body)
                }
                Node::For(inner) => has_super_calls(&inner.body) || has_super_calls(&inner.else_body),
                Node::Group(children) => has_super_calls(children),
                Node::Text(_)
                | Node::Output(_)
                | Node::Extends(_)
                | Node::Import(_)
                | Node::FromImport(_)
                | Node::Set(_) => false,
            }
    })
}
