//! Integration test suite for tpl-inherit
//!
//! End-to-end tests through the public API: a loader, an
//! [`InheritanceProcessor`](tpl_inherit::InheritanceProcessor) and the shared
//! cache, exercised the way a host template engine would.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! RUST_LOG=tpl_inherit=debug cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **resolution**: Static inheritance, overrides and `super()`
//! - **dynamic**: Context-dependent `extends`
//! - **errors**: Failure modes and user-facing diagnostics
//! - **cache_behavior**: Cache tiers, invalidation, configuration and concurrency

mod cache_behavior;
mod dynamic;
mod errors;
mod resolution;
