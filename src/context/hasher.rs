//! Deterministic digests of render contexts for cache keys.

use sha2::{Digest, Sha256};

use super::RenderContext;
use crate::ast::Value;
use crate::constants::{CONTEXT_DIGEST_LEN, EMPTY_CONTEXT_DIGEST};

/// Produces cache-key digests from a context's bindings.
///
/// Bindings are fed to SHA-256 in name order as `name:value;`, where the value
/// is its canonical JSON serialization, so two contexts with the same bindings
/// always hash identically regardless of how they were built.
///
/// The key form is truncated to [`CONTEXT_DIGEST_LEN`] hex characters, and a
/// name containing `:` or `;` can make two binding sets feed the same bytes.
/// Two different contexts can therefore share a key; the resolved-template
/// cache stores [`ContextHasher::full_digest`] next to each entry and rejects
/// hits whose full digest does not match. The full digest encodes names as
/// JSON strings, which leaves no such ambiguity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextHasher;

impl ContextHasher {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Short digest used as the cache-key component.
    #[must_use]
    pub fn hash(&self, context: &RenderContext) -> String {
        if context.is_empty() {
            return EMPTY_CONTEXT_DIGEST.to_string();
        }
        let mut digest = digest(context, |name| name.to_string());
        digest.truncate(CONTEXT_DIGEST_LEN);
        digest
    }

    /// Untruncated hex SHA-256 of the bindings, names JSON-quoted.
    #[must_use]
    pub fn full_digest(&self, context: &RenderContext) -> String {
        if context.is_empty() {
            return EMPTY_CONTEXT_DIGEST.to_string();
        }
        digest(context, |name| Value::from(name).to_string())
    }
}

fn digest(context: &RenderContext, encode_name: impl Fn(&str) -> String) -> String {
    let mut hasher = Sha256::new();
    // BTreeMap iteration is already sorted by name
    for (name, value) in context.iter() {
        hasher.update(encode_name(name).as_bytes());
        hasher.update(b":");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}
