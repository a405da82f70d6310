//! Test utilities for tpl-inherit
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite:
//! - logging initialization that honours `RUST_LOG`
//! - ready-made template hierarchies ([`HierarchyFixture`])
//! - [`static_text`] for asserting on resolved trees without caring about
//!   block markers
//!
//! # Example
//!
//! ```rust,no_run
//! use tpl_inherit::context::RenderContext;
//! use tpl_inherit::test_utils::{HierarchyFixture, static_text};
//!
//! let fixture = HierarchyFixture::mid_base();
//! let processor = fixture.processor();
//! let resolved = processor
//!     .resolve_inheritance(&fixture.entry_template(), &RenderContext::new())
//!     .unwrap();
//! assert_eq!(static_text(&resolved), "MidBase");
//! ```

pub mod fixtures;

pub use fixtures::HierarchyFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use crate::ast::{Node, Template};

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `None`, logging is enabled only
/// when `RUST_LOG` is set:
/// ```bash
/// RUST_LOG=tpl_inherit=trace cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Concatenated literal text of a tree, looking through blocks and groups.
///
/// Conditionals, loops and outputs are skipped: their output depends on the
/// renderer.
#[must_use]
pub fn static_text(template: &Template) -> String {
    let mut out = String::new();
    collect_text(&template.nodes, &mut out);
    out
}

fn collect_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(content) => out.push_str(content),
            Node::Block(block) => collect_text(&block.body, out),
            Node::Group(children) => collect_text(children, out),
            _ => {}
        }
    }
}
