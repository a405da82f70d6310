//! Dynamic (context-dependent) inheritance

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use tpl_inherit::ast::{Expr, Node, Template, Value};
use tpl_inherit::eval::ExpressionEvaluator;
use tpl_inherit::test_utils::{HierarchyFixture, static_text};
use tpl_inherit::{InheritanceError, InheritanceProcessor, MemoryLoader, RenderContext};

#[test]
fn test_layout_follows_context() -> Result<()> {
    let fixture = HierarchyFixture::dynamic_layout();
    let processor = fixture.processor();
    let page = fixture.entry_template();

    let wide = processor.resolve_inheritance(&page, &RenderContext::new().with("layout", "wide.html"))?;
    let narrow = processor.resolve_inheritance(&page, &RenderContext::new().with("layout", "narrow.html"))?;

    assert_eq!(static_text(&wide), "[wide]Page");
    assert_eq!(static_text(&narrow), "[narrow]Page");
    Ok(())
}

#[test]
fn test_same_context_reuses_result() -> Result<()> {
    let fixture = HierarchyFixture::dynamic_layout();
    let processor = fixture.processor();
    let page = fixture.entry_template();

    // binding order does not matter
    let a = RenderContext::new().with("layout", "wide.html").with("user", "ann");
    let b = RenderContext::new().with("user", "ann").with("layout", "wide.html");

    let first = processor.resolve_inheritance(&page, &a)?;
    let second = processor.resolve_inheritance(&page, &b)?;
    assert!(Arc::ptr_eq(&first, &second));

    let stats = processor.cache_stats();
    assert_eq!(stats.resolved.hits, 1);
    assert_eq!(stats.hierarchy.entries, 0);
    Ok(())
}

#[test]
fn test_attribute_and_conditional_targets() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new("mobile.html", vec![Node::text("M")]));
    loader.insert(Template::new("desktop.html", vec![Node::text("D")]));
    let page = loader.insert(Template::new(
        "page.html",
        vec![Node::extends_expr(Expr::conditional(
            Expr::attr(Expr::var("request"), "mobile"),
            Expr::string("mobile.html"),
            Expr::string("desktop.html"),
        ))],
    ));
    let processor = InheritanceProcessor::new(loader);

    let mobile = RenderContext::new().with("request", json!({"mobile": true}));
    let desktop = RenderContext::new().with("request", json!({"mobile": false}));
    let resolved = processor.resolve_inheritance(&page, &mobile)?;
    assert_eq!(static_text(&resolved), "M");
    let resolved = processor.resolve_inheritance(&page, &desktop)?;
    assert_eq!(static_text(&resolved), "D");
    Ok(())
}

#[test]
fn test_non_string_target_is_type_error() {
    let fixture = HierarchyFixture::dynamic_layout();
    let err = fixture
        .processor()
        .resolve_inheritance(&fixture.entry_template(), &RenderContext::new().with("layout", json!(["wide.html"])))
        .unwrap_err();
    assert!(matches!(err, InheritanceError::DynamicExtendsType { found: "array", .. }));
}

#[test]
fn test_unbound_target_is_type_error() {
    let fixture = HierarchyFixture::dynamic_layout();
    let err = fixture
        .processor()
        .resolve_inheritance(&fixture.entry_template(), &RenderContext::new())
        .unwrap_err();
    assert_eq!(err.to_string(), "Dynamic extends target in 'page.html' must be a string, got null");
}

/// Evaluator that maps every expression to a fixed layout.
struct FixedLayout(&'static str);

impl ExpressionEvaluator for FixedLayout {
    fn evaluate(&self, _expr: &Expr, _context: &RenderContext) -> anyhow::Result<Value> {
        Ok(Value::String(self.0.to_string()))
    }
}

struct FailingEvaluator;

impl ExpressionEvaluator for FailingEvaluator {
    fn evaluate(&self, expr: &Expr, _context: &RenderContext) -> anyhow::Result<Value> {
        anyhow::bail!("undefined filter in '{expr}'")
    }
}

#[test]
fn test_custom_evaluator() -> Result<()> {
    let fixture = HierarchyFixture::dynamic_layout();
    let processor = InheritanceProcessor::new(fixture.loader.clone()).with_evaluator(Arc::new(FixedLayout("narrow.html")));
    let resolved = processor.resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;
    assert_eq!(static_text(&resolved), "[narrow]Page");

    let processor = InheritanceProcessor::new(fixture.loader.clone()).with_evaluator(Arc::new(FailingEvaluator));
    let err = processor
        .resolve_inheritance(&fixture.entry_template(), &RenderContext::new())
        .unwrap_err();
    assert!(matches!(err, InheritanceError::DynamicExtendsEvaluation { .. }));
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("undefined filter"));
    Ok(())
}

#[test]
fn test_dynamic_middle_level() -> Result<()> {
    let loader = Arc::new(MemoryLoader::new());
    loader.insert(Template::new("red.html", vec![Node::block("c", vec![Node::text("red")])]));
    loader.insert(Template::new("blue.html", vec![Node::block("c", vec![Node::text("blue")])]));
    loader.insert(Template::new(
        "section.html",
        vec![Node::extends_expr(Expr::var("color")), Node::block("c", vec![Node::super_call(), Node::text("+section")])],
    ));
    let leaf = loader.insert(Template::new("leaf.html", vec![Node::extends("section.html")]));
    let processor = InheritanceProcessor::new(loader);

    let red = processor.resolve_inheritance(&leaf, &RenderContext::new().with("color", "red.html"))?;
    let blue = processor.resolve_inheritance(&leaf, &RenderContext::new().with("color", "blue.html"))?;
    assert_eq!(static_text(&red), "red+section");
    assert_eq!(static_text(&blue), "blue+section");
    assert_eq!(processor.cache_stats().hierarchy.entries, 0);
    Ok(())
}
