//! Container configuration
//!
//! Settings are read from an optional TOML file and then overridden by
//! environment variables prefixed with `ARBOR`, using `__` between nested
//! keys (`ARBOR_NODE_POOL__MAX_IDLE=64`).

use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ScopeError, ScopeResult};
use crate::logging::LogLevel;

/// Top-level configuration for a scope tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ScopeConfig {
    /// Scope node recycling
    pub node_pool: NodePoolConfig,
    /// Pooled values handed out by field-setters
    pub object_pool: ObjectPoolConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Scope node pool sizing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodePoolConfig {
    /// Finalized nodes kept for reuse
    pub max_idle: usize,
    /// Nodes allocated when the root is bootstrapped
    pub prewarm: usize,
}

/// Object pool sizing for pooled-value providers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ObjectPoolConfig {
    /// Returned objects kept for reuse
    pub max_idle: usize,
    /// Initial capacity of pooled byte buffers
    pub buffer_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Minimum level: trace, debug, info, warn or error
    pub level: String,
    /// Colored output
    pub ansi: bool,
    /// Include the event target in each line
    pub target: bool,
}

impl Default for NodePoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 256,
            prewarm: 0,
        }
    }
}

impl Default for ObjectPoolConfig {
    fn default() -> Self {
        Self {
            max_idle: 100,
            buffer_capacity: 4096,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi: true,
            target: false,
        }
    }
}

impl ScopeConfig {
    /// Reject settings that cannot work
    pub fn validate(&self) -> ScopeResult<()> {
        if self.node_pool.prewarm > self.node_pool.max_idle {
            return Err(ScopeError::InvalidConfig(format!(
                "node_pool.prewarm ({}) exceeds node_pool.max_idle ({})",
                self.node_pool.prewarm, self.node_pool.max_idle
            )));
        }
        if self.object_pool.buffer_capacity == 0 {
            return Err(ScopeError::InvalidConfig(
                "object_pool.buffer_capacity must be greater than 0".to_string(),
            ));
        }
        if LogLevel::parse(&self.logging.level).is_none() {
            return Err(ScopeError::InvalidConfig(format!(
                "unknown log level '{}'",
                self.logging.level
            )));
        }
        Ok(())
    }
}

/// Loads and saves [`ScopeConfig`]
pub struct ConfigLoader {
    config_path: PathBuf,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader for the default path under the user config directory
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
            env_prefix: "ARBOR".to_string(),
        }
    }

    /// Loader for a specific file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            env_prefix: "ARBOR".to_string(),
        }
    }

    /// Use a different environment variable prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// File this loader reads and writes
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("arbor")
            .join("scope.toml")
    }

    /// Read the file (if present) and environment overrides, then validate
    pub fn load(&self) -> ScopeResult<ScopeConfig> {
        let settings = Config::builder()
            .add_source(File::from(self.config_path.as_path()).required(false))
            .add_source(
                Environment::with_prefix(&self.env_prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ScopeConfig = settings.try_deserialize()?;
        config.validate()?;
        debug!(path = %self.config_path.display(), "loaded scope configuration");
        Ok(config)
    }

    /// Validate `config` and write it as TOML, creating parent directories
    pub fn save(&self, config: &ScopeConfig) -> ScopeResult<()> {
        config.validate()?;
        let rendered = toml::to_string(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.config_path, rendered)?;
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
