//! Static inheritance resolution

use anyhow::Result;
use std::sync::Arc;
use tpl_inherit::ast::{Expr, Node, Template};
use tpl_inherit::test_utils::{HierarchyFixture, init_test_logging, static_text};
use tpl_inherit::{InheritanceProcessor, MemoryLoader, RenderContext};

#[test]
fn test_template_without_directives_is_identity() -> Result<()> {
    init_test_logging(None);
    let fixture = HierarchyFixture::two_level();
    let processor = fixture.processor();
    let base = fixture.template("base.html");

    let resolved = processor.resolve_inheritance(&base, &RenderContext::new())?;
    assert!(Arc::ptr_eq(&base, &resolved));
    Ok(())
}

#[test]
fn test_two_level_override_keeps_base_only_blocks() -> Result<()> {
    let fixture = HierarchyFixture::two_level();
    let resolved = fixture.processor().resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;

    assert_eq!(resolved.name, "child.html");
    assert_eq!(static_text(&resolved), "<title>Child title</title>Base content");
    Ok(())
}

#[test]
fn test_three_level_grandchild_wins() -> Result<()> {
    let fixture = HierarchyFixture::three_level();
    let resolved = fixture.processor().resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "<title>Grandchild title</title>Base content");
    Ok(())
}

#[test]
fn test_mid_base_super_chain() -> Result<()> {
    let fixture = HierarchyFixture::mid_base();
    let resolved = fixture.processor().resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "MidBase");
    assert_eq!(resolved.to_string(), "{% block content %}MidBase{% endblock %}");
    Ok(())
}

#[test]
fn test_base_only_super_renders_empty() -> Result<()> {
    let fixture = HierarchyFixture::base_only_super();
    let resolved = fixture.processor().resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "Base");
    Ok(())
}

#[test]
fn test_super_of_empty_ancestor_block() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new(
        "base.html",
        vec![Node::block("outer", vec![Node::block("extra", vec![])])],
    ));
    let child = loader.insert(Template::new(
        "child.html",
        vec![
            Node::extends("base.html"),
            Node::block("extra", vec![Node::text("Child"), Node::super_call()]),
        ],
    ));

    let resolved = InheritanceProcessor::new(loader).resolve_inheritance(&child, &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "Child");
    Ok(())
}

#[test]
fn test_nested_blocks_and_control_flow() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new(
        "layout.html",
        vec![
            Node::block(
                "body",
                vec![
                    Node::text("<main>"),
                    Node::block("main", vec![Node::text("default main")]),
                    Node::text("</main>"),
                ],
            ),
            Node::if_else(
                Expr::var("show_footer"),
                vec![Node::block("footer", vec![Node::text("Footer")])],
                vec![],
            ),
        ],
    ));
    let page = loader.insert(Template::new(
        "page.html",
        vec![
            Node::extends("layout.html"),
            Node::block("main", vec![Node::text("Article")]),
            Node::block("footer", vec![Node::super_call(), Node::text(" (c) 2024")]),
        ],
    ));

    let resolved = InheritanceProcessor::new(loader).resolve_inheritance(&page, &RenderContext::new())?;
    assert_eq!(
        resolved.to_string(),
        "{% block body %}<main>{% block main %}Article{% endblock %}</main>{% endblock %}\
         {% if show_footer %}{% block footer %}Footer (c) 2024{% endblock %}{% endif %}"
    );
    Ok(())
}

#[test]
fn test_imports_from_all_levels_are_kept() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new(
        "base.html",
        vec![Node::import("base_macros.html", "base"), Node::block("content", vec![])],
    ));
    let child = loader.insert(Template::new(
        "child.html",
        vec![
            Node::extends("base.html"),
            Node::from_import("forms.html", &["field"]),
            Node::block("content", vec![Node::text("form")]),
        ],
    ));

    let resolved = InheritanceProcessor::new(loader).resolve_inheritance(&child, &RenderContext::new())?;
    assert_eq!(
        resolved.to_string(),
        r#"{% from "forms.html" import field %}{% import "base_macros.html" as base %}{% block content %}form{% endblock %}"#
    );
    Ok(())
}

#[test]
fn test_source_templates_stay_pristine() -> Result<()> {
    let fixture = HierarchyFixture::mid_base();
    let before: Vec<Template> = ["base.html", "mid.html", "leaf.html"]
        .iter()
        .map(|name| (*fixture.template(name)).clone())
        .collect();

    fixture.processor().resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;

    for original in before {
        assert_eq!(*fixture.template(&original.name), original);
    }
    Ok(())
}

#[test]
fn test_override_nested_in_unknown_block_is_dropped() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new("base.html", vec![Node::block("title", vec![Node::text("Base")])]));
    loader.insert(Template::new(
        "mid.html",
        vec![
            Node::extends("base.html"),
            Node::block("title", vec![Node::text("Mid "), Node::super_call()]),
        ],
    ));
    let leaf = loader.insert(Template::new(
        "leaf.html",
        vec![
            Node::extends("mid.html"),
            Node::block("wrapper", vec![Node::block("title", vec![Node::text("Leaf")])]),
        ],
    ));

    let resolved = InheritanceProcessor::new(loader).resolve_inheritance(&leaf, &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "Mid Base");
    Ok(())
}

#[test]
fn test_root_super_under_dropped_override_is_empty() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new(
        "base.html",
        vec![Node::block("title", vec![Node::text("Base"), Node::super_call()])],
    ));
    let leaf = loader.insert(Template::new(
        "leaf.html",
        vec![
            Node::extends("base.html"),
            Node::block("wrapper", vec![Node::block("title", vec![Node::text("Leaf")])]),
        ],
    ));

    let resolved = InheritanceProcessor::new(loader).resolve_inheritance(&leaf, &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "Base");
    Ok(())
}
