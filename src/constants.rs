//! Global constants used throughout the crate.
//!
//! Cache lifetimes, capacity, recursion limits and digest sentinels live here
//! so that configuration defaults and the code that applies them agree.

use std::time::Duration;

/// Default lifetime of a cached inheritance hierarchy (15 minutes).
///
/// Hierarchies only change when template source changes, and hosts are
/// expected to call `invalidate_template` on reload.
pub const DEFAULT_HIERARCHY_TTL: Duration = Duration::from_secs(15 * 60);

/// Default lifetime of a cached resolved template (5 minutes).
pub const DEFAULT_RESOLVED_TTL: Duration = Duration::from_secs(5 * 60);

/// Default capacity of each cache table.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Minimum time between two background sweeps of expired entries (2 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2 * 60);

/// Maximum nesting of `super()` substitutions before resolution fails.
pub const DEFAULT_MAX_SUPER_DEPTH: usize = 10;

/// Number of hex characters kept from a context digest for cache keys.
pub const CONTEXT_DIGEST_LEN: usize = 16;

/// Digest of a context without bindings.
pub const EMPTY_CONTEXT_DIGEST: &str = "empty";

/// Digest component used for resolved templates whose hierarchy does not
/// depend on the context.
pub const STATIC_CONTEXT_DIGEST: &str = "static";

/// Separator between template name and digest in resolved cache keys.
pub const RESOLVED_KEY_SEPARATOR: &str = "::";

/// Environment variable naming a TOML configuration file.
pub const CONFIG_PATH_ENV: &str = "TPL_INHERIT_CONFIG";
