//! Log output setup
//!
//! The container logs through `tracing`; this module only installs a
//! formatting subscriber for binaries and tests that want one.

use tracing::Level;

use crate::config::LoggingConfig;
use crate::error::{ScopeError, ScopeResult};

/// Minimum log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse a level name, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Lowercase level name
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Install a global `fmt` subscriber. Fails if one is already installed.
pub fn init_logging(config: &LoggingConfig) -> ScopeResult<()> {
    let level = LogLevel::parse(&config.level).ok_or_else(|| {
        ScopeError::InvalidConfig(format!("unknown log level '{}'", config.level))
    })?;

    tracing_subscriber::fmt()
        .with_max_level(Level::from(level))
        .with_ansi(config.ansi)
        .with_target(config.target)
        .try_init()
        .map_err(|e| ScopeError::Logging(e.to_string()))
}
