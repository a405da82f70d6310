//! Core types shared across the crate.
//!
//! Currently this is the error system: the typed [`InheritanceError`] and
//! [`LoadError`] enums plus the [`ErrorContext`] wrapper that turns them into
//! user-facing diagnostics.

pub mod error;

pub use error::{ErrorContext, InheritanceError, LoadError, user_friendly_error};

/// Result alias for inheritance operations.
pub type Result<T, E = InheritanceError> = std::result::Result<T, E>;
