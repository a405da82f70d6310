//! Cache tiers, invalidation, configuration and concurrency

use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tpl_inherit::ast::{Node, Template};
use tpl_inherit::test_utils::{HierarchyFixture, init_test_logging, static_text};
use tpl_inherit::{
    CacheConfig, EngineConfig, InheritanceCache, InheritanceProcessor, RenderContext,
};

#[test]
fn test_repeat_resolution_served_from_resolved_tier() -> Result<()> {
    init_test_logging(None);
    let fixture = HierarchyFixture::two_level();
    let processor = fixture.processor();
    let child = fixture.entry_template();

    let first = processor.resolve_inheritance(&child, &RenderContext::new())?;
    let second = processor.resolve_inheritance(&child, &RenderContext::new().with("page", 2))?;
    assert!(Arc::ptr_eq(&first, &second));

    let stats = processor.cache_stats();
    assert_eq!(stats.hierarchy.entries, 1);
    assert_eq!(stats.hierarchy.hits, 0);
    assert_eq!(stats.resolved.entries, 1);
    assert_eq!(stats.resolved.hits, 1);
    Ok(())
}

#[test]
fn test_invalidating_parent_picks_up_new_source() -> Result<()> {
    let fixture = HierarchyFixture::three_level();
    let processor = fixture.processor();
    let entry = fixture.entry_template();
    processor.resolve_inheritance(&entry, &RenderContext::new())?;

    fixture.loader.insert(Template::new(
        "base.html",
        vec![Node::text("v2:"), Node::block("title", vec![Node::text("Base title")])],
    ));

    // stale until invalidated
    let stale = processor.resolve_inheritance(&entry, &RenderContext::new())?;
    assert!(static_text(&stale).contains("Base content"));

    processor.invalidate_template("base.html");
    let fresh = processor.resolve_inheritance(&entry, &RenderContext::new())?;
    assert_eq!(static_text(&fresh), "v2:Grandchild title");
    Ok(())
}

#[test]
fn test_invalidation_leaves_unrelated_entries() -> Result<()> {
    let two = HierarchyFixture::two_level();
    let mid = HierarchyFixture::mid_base();
    let cache = Arc::new(InheritanceCache::new());
    let a = InheritanceProcessor::with_cache(two.loader.clone(), Arc::clone(&cache));
    let b = InheritanceProcessor::with_cache(mid.loader.clone(), Arc::clone(&cache));

    a.resolve_inheritance(&two.entry_template(), &RenderContext::new())?;
    b.resolve_inheritance(&mid.entry_template(), &RenderContext::new())?;
    assert_eq!(cache.stats().resolved.entries, 2);

    // both families share a base.html name; only mid.html is unique to one
    a.invalidate_template("mid.html");
    let stats = cache.stats();
    assert_eq!(stats.resolved.entries, 1);
    assert_eq!(stats.hierarchy.entries, 1);
    Ok(())
}

#[test]
fn test_expired_resolution_is_rebuilt() -> Result<()> {
    let config = EngineConfig {
        cache: CacheConfig {
            hierarchy_ttl_secs: 0,
            resolved_ttl_secs: 0,
            ..CacheConfig::default()
        },
        ..EngineConfig::default()
    };
    let fixture = HierarchyFixture::two_level();
    let processor = InheritanceProcessor::from_config(fixture.loader.clone(), &config);
    let child = fixture.entry_template();

    let first = processor.resolve_inheritance(&child, &RenderContext::new())?;
    thread::sleep(Duration::from_millis(5));
    let second = processor.resolve_inheritance(&child, &RenderContext::new())?;

    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
    let stats = processor.cache_stats();
    assert_eq!(stats.hierarchy.hits, 0);
    assert_eq!(stats.resolved.hits, 0);
    Ok(())
}

#[test]
fn test_capacity_bounds_each_table() -> Result<()> {
    let config = EngineConfig {
        cache: CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        },
        ..EngineConfig::default()
    };
    let fixture = HierarchyFixture::dynamic_layout();
    let processor = InheritanceProcessor::from_config(fixture.loader.clone(), &config);
    let page = fixture.entry_template();

    for user in ["a", "b", "c", "d"] {
        let ctx = RenderContext::new().with("layout", "wide.html").with("user", user);
        processor.resolve_inheritance(&page, &ctx)?;
    }
    assert_eq!(processor.cache_stats().resolved.entries, 2);
    Ok(())
}

#[test]
fn test_config_file_drives_processor() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new()?;
    writeln!(file, "max_super_depth = 0\n\n[cache]\nmax_entries = 5")?;
    let config = EngineConfig::load(file.path())?;

    let fixture = HierarchyFixture::mid_base();
    let processor = InheritanceProcessor::from_config(fixture.loader.clone(), &config);
    let resolved = processor.resolve_inheritance(&fixture.entry_template(), &RenderContext::new())?;
    // depth 0 still allows one level of super()
    assert_eq!(static_text(&resolved), "MidBase");
    Ok(())
}

#[test]
fn test_concurrent_resolution_with_mixed_contexts() -> Result<()> {
    let fixture = HierarchyFixture::dynamic_layout();
    let static_fixture = HierarchyFixture::three_level();
    let cache = Arc::new(InheritanceCache::new());
    let dynamic = Arc::new(InheritanceProcessor::with_cache(fixture.loader.clone(), Arc::clone(&cache)));
    let fixed = Arc::new(InheritanceProcessor::with_cache(static_fixture.loader.clone(), Arc::clone(&cache)));
    let page = fixture.entry_template();
    let grandchild = static_fixture.entry_template();

    let handles: Vec<_> = (0..8)
        .map(|worker| {
            let dynamic = Arc::clone(&dynamic);
            let fixed = Arc::clone(&fixed);
            let page = Arc::clone(&page);
            let grandchild = Arc::clone(&grandchild);
            thread::spawn(move || -> Result<()> {
                for i in 0..50 {
                    let layout = if (worker + i) % 2 == 0 { "wide.html" } else { "narrow.html" };
                    let ctx = RenderContext::new().with("layout", layout);
                    let resolved = dynamic.resolve_inheritance(&page, &ctx)?;
                    let expected = if layout == "wide.html" { "[wide]Page" } else { "[narrow]Page" };
                    assert_eq!(static_text(&resolved), expected);

                    let resolved = fixed.resolve_inheritance(&grandchild, &ctx)?;
                    assert_eq!(static_text(&resolved), "<title>Grandchild title</title>Base content");
                    if i % 20 == 0 {
                        fixed.invalidate_template("child.html");
                    }
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("worker panicked")?;
    }
    assert!(cache.stats().resolved.entries <= 3);
    Ok(())
}

#[tokio::test]
async fn test_resolution_inside_runtime() -> Result<()> {
    let fixture = HierarchyFixture::mid_base();
    let processor = Arc::new(fixture.processor());
    let entry = fixture.entry_template();

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let entry = Arc::clone(&entry);
            tokio::task::spawn_blocking(move || processor.resolve_inheritance(&entry, &RenderContext::new()))
        })
        .collect();

    for task in tasks {
        let resolved = task.await??;
        assert_eq!(static_text(&resolved), "MidBase");
    }
    processor.clear_cache();
    assert_eq!(processor.cache_stats().resolved.entries, 0);
    Ok(())
}
