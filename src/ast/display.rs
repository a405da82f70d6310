//! Source-like rendering of trees.
//!
//! Used for debugging and for asserting on resolved trees in tests. The output
//! is close to the template syntax but is not guaranteed to round-trip through
//! a parser.

use std::fmt;

use super::{ForNode, FromImportNode, IfNode, Node, Template};

fn write_nodes(f: &mut fmt::Formatter<'_>, nodes: &[Node]) -> fmt::Result {
    for node in nodes {
        write!(f, "{node}")?;
    }
    Ok(())
}

fn write_if(f: &mut fmt::Formatter<'_>, node: &IfNode) -> fmt::Result {
    write!(f, "{{% if {} %}}", node.condition)?;
    write_nodes(f, &node.body)?;
    for elif in &node.elifs {
        write!(f, "{{% elif {} %}}", elif.condition)?;
        write_nodes(f, &elif.body)?;
    }
    if !node.else_body.is_empty() {
        write!(f, "{{% else %}}")?;
        write_nodes(f, &node.else_body)?;
    }
    write!(f, "{{% endif %}}")
}

fn write_for(f: &mut fmt::Formatter<'_>, node: &ForNode) -> fmt::Result {
    write!(f, "{{% for {} in {} %}}", node.targets.join(", "), node.iterable)?;
    write_nodes(f, &node.body)?;
    if !node.else_body.is_empty() {
        write!(f, "{{% else %}}")?;
        write_nodes(f, &node.else_body)?;
    }
    write!(f, "{{% endfor %}}")
}

fn write_from_import(f: &mut fmt::Formatter<'_>, node: &FromImportNode) -> fmt::Result {
    let names: Vec<String> = node
        .names
        .iter()
        .map(|imported| match &imported.alias {
            Some(alias) => format!("{} as {alias}", imported.name),
            None => imported.name.clone(),
        })
        .collect();
    write!(f, "{{% from {} import {} %}}", node.template, names.join(", "))
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(content) => f.write_str(content),
            Node::Output(output) => write!(f, "{{{{ {} }}}}", output.expr),
            Node::Block(block) => {
                write!(f, "{{% block {} %}}", block.name)?;
                write_nodes(f, &block.body)?;
                write!(f, "{{% endblock %}}")
            }
            Node::If(node) => write_if(f, node),
            Node::For(node) => write_for(f, node),
            Node::Extends(extends) => write!(f, "{{% extends {} %}}", extends.target),
            Node::Import(import) => {
                write!(f, "{{% import {} as {} %}}", import.template, import.alias)
            }
            Node::FromImport(node) => write_from_import(f, node),
            Node::Set(set) => write!(f, "{{% set {} = {} %}}", set.target, set.value),
            Node::Group(children) => write_nodes(f, children),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_nodes(f, &self.nodes)
    }
}
