//! Block extraction.
//!
//! Blocks can only be nested inside other blocks, conditionals, loops and
//! groups, so those are the only node kinds the walks descend into.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::ast::{BlockNode, Node, Template};

/// Which side of an `extends` relation a template is on while its blocks are
/// being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionRole {
    /// The requested template. Every block it defines, at any nesting level,
    /// is a potential override.
    Child,
    /// An ancestor. Its blocks only fill names no descendant has defined.
    Parent,
}

/// A block together with the template that defined it.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDefinition {
    /// Name of the template the block was found in
    pub origin: String,
    /// Position of that template in the hierarchy (0 = requested template)
    pub depth: usize,
    pub block: BlockNode,
}

/// Block name to the winning definition across a hierarchy.
pub type BlockMap = HashMap<String, BlockDefinition>;

/// Record every block of `template` into `map`.
///
/// The first block seen for a name wins, both within one template (nested
/// same-named blocks do not replace the outer one) and across templates
/// (names already present from a descendant are never overwritten).
pub fn extract_blocks(template: &Template, depth: usize, role: ExtractionRole, map: &mut BlockMap) {
    extract_into(&template.nodes, &template.name, depth, role, map);
}

fn extract_into(
    nodes: &[Node],
    origin: &str,
    depth: usize,
    role: ExtractionRole,
    map: &mut BlockMap,
) {
    for node in nodes {
        match node {
            Node::Block(block) => {
                match map.entry(block.name.clone()) {
                    Entry::Vacant(slot) => {
                        slot.insert(BlockDefinition {
                            origin: origin.to_string(),
                            depth,
                            block: block.clone(),
                        });
                    }
                    Entry::Occupied(existing) => {
                        if role == ExtractionRole::Parent {
                            tracing::trace!(
                                "Block '{}' in '{}' overridden by '{}'",
                                block.name,
                                origin,
                                existing.get().origin
                            );
                        }
                    }
                }
                extract_into(&block.body, origin, depth, role, map);
            }
            Node::If(node) => {
                extract_into(&node.body, origin, depth, role, map);
                for elif in &node.elifs {
                    extract_into(&elif.body, origin, depth, role, map);
                }
                extract_into(&node.else_body, origin, depth, role, map);
            }
            Node::For(node) => {
                extract_into(&node.body, origin, depth, role, map);
                extract_into(&node.else_body, origin, depth, role, map);
            }
            Node::Group(children) => extract_into(children, origin, depth, role, map),
            Node::Text(_)
            | Node::Output(_)
            | Node::Extends(_)
            | Node::Import(_)
            | Node::FromImport(_)
            | Node::Set(_) => {}
        }
    }
}

/// First block named `name` in pre-order (a block is visited before the
/// blocks nested in it).
pub fn find_block<'a>(nodes: &'a [Node], name: &str) -> Option<&'a BlockNode> {
    for node in nodes {
        let found = match node {
            Node::Block(block) if block.name == name => return Some(block),
            Node::Block(block) => find_block(&block.body, name),
            Node::If(node) => find_block(&node.body, name)
                .or_else(|| node.elifs.iter().find_map(|elif| find_block(&elif.body, name)))
                .or_else(|| find_block(&node.else_body, name)),
            Node::For(node) => {
                find_block(&node.body, name).or_else(|| find_block(&node.else_body, name))
            }
            Node::Group(children) => find_block(children, name),
            Node::Text(_)
            | Node::Output(_)
            | Node::Extends(_)
            | Node::Import(_)
            | Node::FromImport(_)
            | Node::Set(_) => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

/// The blocks a template defines as complete overrides: outermost blocks
/// only, found through conditionals and loops but not inside other blocks.
///
/// When a name is defined twice at that level the later definition wins.
pub fn collect_own_blocks(nodes: &[Node]) -> HashMap<&str, &BlockNode> {
    let mut overrides = HashMap::new();
    collect_own_into(nodes, &mut overrides);
    overrides
}

fn collect_own_into<'a>(nodes: &'a [Node], overrides: &mut HashMap<&'a str, &'a BlockNode>) {
    for node in nodes {
        match node {
            Node::Block(block) => {
                overrides.insert(block.name.as_str(), block);
            }
            Node::If(node) => {
                collect_own_into(&node.body, overrides);
                for elif in &node.elifs {
                    collect_own_into(&elif.body, overrides);
                }
                collect_own_into(&node.else_body, overrides);
            }
            Node::For(node) => {
                collect_own_into(&node.body, overrides);
                collect_own_into(&node.else_body, overrides);
            }
            Node::Group(children) => collect_own_into(children, overrides),
            Node::Text(_)
            | Node::Output(_)
            | Node::Extends(_)
            | Node::Import(_)
            | Node::FromImport(_)
            | Node::Set(_) => {}
        }
    }
}
