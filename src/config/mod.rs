//! Engine configuration.
//!
//! Every field has a default, so an empty document (or no document at all) is
//! a valid configuration:
//!
//! ```toml
//! max_super_depth = 10
//!
//! [cache]
//! hierarchy_ttl_secs = 900
//! resolved_ttl_secs = 300
//! max_entries = 1000
//! sweep_interval_secs = 120
//! ```
//!
//! Hosts either build an [`EngineConfig`] in code, parse one with
//! [`EngineConfig::from_toml_str`] / [`EngineConfig::load`], or point the
//! `TPL_INHERIT_CONFIG` environment variable at a file and call
//! [`EngineConfig::from_env`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::constants::{
    CONFIG_PATH_ENV, DEFAULT_HIERARCHY_TTL, DEFAULT_MAX_ENTRIES, DEFAULT_MAX_SUPER_DEPTH,
    DEFAULT_RESOLVED_TTL, DEFAULT_SWEEP_INTERVAL,
};

/// Top-level configuration for an [`InheritanceProcessor`](crate::inheritance::InheritanceProcessor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub cache: CacheConfig,
    /// Deepest allowed nesting of `super()` substitution
    pub max_super_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            max_super_depth: DEFAULT_MAX_SUPER_DEPTH,
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse engine configuration")
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Load from the file named by `TPL_INHERIT_CONFIG`, or return defaults
    /// when the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) if !path.is_empty() => {
                tracing::debug!("Loading engine configuration from {}", Path::new(&path).display());
                Self::load(Path::new(&path))
            }
            _ => Ok(Self::default()),
        }
    }
}

/// TTLs and limits of the two cache tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub hierarchy_ttl_secs: u64,
    pub resolved_ttl_secs: u64,
    /// Per table; values below 1 are treated as 1
    pub max_entries: usize,
    pub sweep_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hierarchy_ttl_secs: DEFAULT_HIERARCHY_TTL.as_secs(),
            resolved_ttl_secs: DEFAULT_RESOLVED_TTL.as_secs(),
            max_entries: DEFAULT_MAX_ENTRIES,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL.as_secs(),
        }
    }
}

impl CacheConfig {
    #[must_use]
    pub fn hierarchy_ttl(&self) -> Duration {
        Duration::from_secs(self.hierarchy_ttl_secs)
    }

    #[must_use]
    pub fn resolved_ttl(&self) -> Duration {
        Duration::from_secs(self.resolved_ttl_secs)
    }

    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries.max(1)
    }
}
