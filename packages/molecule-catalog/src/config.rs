//! Catalog configuration (YAML/Env loading)
//!
//! ```yaml
//! version: 1
//! database: catalog.db          # or ":memory:"
//! not_found_policy: fail_open   # or "reject"
//! log_level: info
//! ```
//!
//! `MOLECAT_DATABASE` overrides `database`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];
pub const DATABASE_ENV: &str = "MOLECAT_DATABASE";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Unsupported version
    #[error("Unsupported configuration version {found}. Supported versions: {}", SUPPORTED_VERSIONS.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32 },

    /// Field value rejected
    #[error("Invalid value for '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// What `update_molecule` does when the molecule has no current row
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundPolicy {
    /// Treat the current associations as empty and insert the desired sets
    #[default]
    FailOpen,
    /// Abort with a `NotFound` error
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogConfig {
    /// Schema version (always 1)
    pub version: u32,

    /// SQLite database path, or `:memory:`
    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub not_found_policy: NotFoundPolicy,

    /// `tracing` filter directive used by the CLI
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_database() -> String {
    "molecules.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            version: 1,
            database: default_database(),
            not_found_policy: NotFoundPolicy::default(),
            log_level: default_log_level(),
        }
    }
}

impl CatalogConfig {
    /// Load from YAML file (v1 schema)
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let config: CatalogConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !SUPPORTED_VERSIONS.contains(&self.version) {
            return Err(ConfigError::UnsupportedVersion {
                found: self.version,
            });
        }
        if self.database.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "database".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Apply `MOLECAT_DATABASE` if set
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(database) = lookup(DATABASE_ENV).filter(|v| !v.trim().is_empty()) {
            self.database = database;
        }
        self
    }

    pub fn not_found_policy(mut self, policy: NotFoundPolicy) -> Self {
        self.not_found_policy = policy;
        self
    }
}
