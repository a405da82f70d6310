//! Failure modes and user-facing diagnostics

use std::sync::Arc;
use tpl_inherit::ast::{Location, Node, Template};
use tpl_inherit::core::{LoadError, user_friendly_error};
use tpl_inherit::test_utils::HierarchyFixture;
use tpl_inherit::{InheritanceError, InheritanceProcessor, MemoryLoader, RenderContext, TemplateLoader};

#[test]
fn test_circular_inheritance_is_detected() {
    let fixture = HierarchyFixture::circular();
    let err = fixture
        .processor()
        .resolve_inheritance(&fixture.entry_template(), &RenderContext::new())
        .unwrap_err();

    match &err {
        InheritanceError::CircularInheritance { name, chain } => {
            assert_eq!(name, "a.html");
            assert_eq!(chain, &vec!["a.html".to_string(), "b.html".to_string()]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_template_error());

    let ctx = user_friendly_error(err.into());
    assert!(ctx.suggestion.is_some());
    assert!(ctx.message.contains("a.html -> b.html"));
}

#[test]
fn test_self_extension() {
    let loader = Arc::new(MemoryLoader::new());
    let page = loader.insert(Template::new("page.html", vec![Node::extends("page.html")]));
    let err = InheritanceProcessor::new(loader)
        .resolve_inheritance(&page, &RenderContext::new())
        .unwrap_err();
    assert!(matches!(err, InheritanceError::CircularInheritance { .. }));
}

#[test]
fn test_missing_parent_reports_both_names() {
    let loader = Arc::new(MemoryLoader::new());
    let page = loader.insert(Template::new("page.html", vec![Node::extends("layout.html")]));
    let err = InheritanceProcessor::new(loader)
        .resolve_inheritance(&page, &RenderContext::new())
        .unwrap_err();

    assert_eq!(err.to_string(), "Failed to load parent template 'layout.html' extended by 'page.html'");
    let ctx = user_friendly_error(err.into());
    assert!(ctx.to_string().contains("Template not found: layout.html"));
}

/// Loader whose storage is unavailable.
struct BrokenLoader;

impl TemplateLoader for BrokenLoader {
    fn load_template(&self, name: &str) -> Result<Arc<Template>, LoadError> {
        Err(LoadError::Failed {
            name: name.to_string(),
            source: anyhow::anyhow!("connection refused"),
        })
    }
}

#[test]
fn test_loader_failure_is_not_a_template_error() {
    let child = Arc::new(Template::new("child.html", vec![Node::extends("base.html")]));
    let err = InheritanceProcessor::new(Arc::new(BrokenLoader))
        .resolve_inheritance(&child, &RenderContext::new())
        .unwrap_err();

    assert!(!err.is_template_error());
    let message = format!("{:#}", anyhow::Error::from(err));
    assert!(message.contains("connection refused"));
}

#[test]
fn test_super_outside_block_has_location() {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new("base.html", vec![Node::block("content", vec![])]));
    let child = loader.insert(Template::new(
        "child.html",
        vec![Node::extends("base.html"), Node::super_call_at(3, 1)],
    ));

    let err = InheritanceProcessor::new(loader)
        .resolve_inheritance(&child, &RenderContext::new())
        .unwrap_err();
    match err {
        InheritanceError::SuperOutsideBlock { template, location } => {
            assert_eq!(template.as_deref(), Some("child.html"));
            assert_eq!(location, Some(Location::new(3, 1)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_super_outside_block_in_plain_template() {
    let loader = Arc::new(MemoryLoader::new());
    let page = loader.insert(Template::new("page.html", vec![Node::text("x"), Node::super_call()]));
    let err = InheritanceProcessor::new(loader)
        .resolve_inheritance(&page, &RenderContext::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "super() call outside of block context in 'page.html'");
}

#[test]
fn test_super_outside_block_in_parent() {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new("base.html", vec![Node::super_call(), Node::block("content", vec![])]));
    let child = loader.insert(Template::new(
        "child.html",
        vec![Node::extends("base.html"), Node::block("content", vec![Node::text("ok")])],
    ));
    let err = InheritanceProcessor::new(loader)
        .resolve_inheritance(&child, &RenderContext::new())
        .unwrap_err();
    assert!(matches!(
        err,
        InheritanceError::SuperOutsideBlock { template: Some(ref name), .. } if name == "base.html"
    ));
}
