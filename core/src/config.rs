//! Engine configuration loading
//!
//! Loads configuration from `runmock.toml` in the working directory (or the
//! file named by `RUNMOCK_CONFIG`). Every key is optional.

use crate::error::MockError;
use crate::error::Result;
use serde::Deserialize;
use serde::Serialize;
use std::path::Path;
use std::path::PathBuf;

/// Call-count rule new registrations start with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefaultCallCount {
    /// Must be called at least once before restore
    #[default]
    AtLeastOnce,
    /// No call-count check
    Any,
}

/// What dropping a registry with leaked, failing registrations does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeakPolicy {
    #[default]
    Panic,
    Warn,
}

/// Root configuration for the override engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MockerConfig {
    /// Whether suite teardown raises aggregated verification failures
    #[serde(default = "default_strict_teardown")]
    pub strict_teardown: bool,

    #[serde(default)]
    pub default_call_count: DefaultCallCount,

    #[serde(default)]
    pub leak_policy: LeakPolicy,
}

fn default_strict_teardown() -> bool {
    true
}

impl Default for MockerConfig {
    fn default() -> Self {
        Self {
            strict_teardown: default_strict_teardown(),
            default_call_count: DefaultCallCount::default(),
            leak_policy: LeakPolicy::default(),
        }
    }
}

impl MockerConfig {
    /// Environment variable for config path override
    pub const ENV_CONFIG_PATH: &'static str = "RUNMOCK_CONFIG";

    /// Default config filename
    pub const DEFAULT_CONFIG_FILENAME: &'static str = "runmock.toml";

    /// Load configuration from file
    ///
    /// Resolution order:
    /// 1. `RUNMOCK_CONFIG` environment variable
    /// 2. `./runmock.toml`
    ///
    /// If the config file doesn't exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let path = Self::resolve_config_path();

        if !path.exists() {
            tracing::debug!(
                path = %path.display(),
                "runmock config not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            MockError::config_with_source(
                format!("failed to read config at {}", path.display()),
                e,
            )
        })?;

        Self::parse(&contents)
    }

    /// Parse configuration from TOML string
    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| MockError::config_with_source("failed to parse config", e))
    }

    /// Resolve the configuration file path
    fn resolve_config_path() -> PathBuf {
        if let Ok(path) = std::env::var(Self::ENV_CONFIG_PATH) {
            return PathBuf::from(path);
        }
        PathBuf::from(Self::DEFAULT_CONFIG_FILENAME)
    }
}
