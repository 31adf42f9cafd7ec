//! Error types for scope operations
//!
//! Only recoverable outcomes live here. Lifecycle protocol violations
//! (using a finalized scope, disposing past zero) panic instead.

use thiserror::Error;

/// Scope result type
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Errors surfaced by resolution, bootstrap, configuration and units of work
#[derive(Debug, Error)]
pub enum ScopeError {
    #[error("Capability not found: {capability}")]
    NotFound { capability: String },

    #[error("Capability {capability} is provided by a field-setter and can only be injected")]
    SetterOnly { capability: String },

    /// A stored value failed to downcast to its capability type. Entries
    /// built through `Entry<T>` are always stored under `T`, so this only
    /// surfaces if that pairing is broken inside the crate.
    #[error("Capability {capability} produced a value of a different type")]
    TypeMismatch { capability: String },

    #[error("Provider '{provider}' failed: {message}")]
    ProviderFailed { provider: String, message: String },

    #[error("Provider '{provider}' depends on unknown provider '{dependency}'")]
    MissingProviderDependency { provider: String, dependency: String },

    #[error("Provider dependency cycle detected at '{provider}'")]
    ProviderCycle { provider: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Unit of work was cancelled")]
    Cancelled,

    #[error("Unit of work exceeded its deadline")]
    DeadlineExceeded,
}

impl ScopeError {
    pub(crate) fn not_found(capability: &str) -> Self {
        Self::NotFound {
            capability: capability.to_string(),
        }
    }

    /// Whether this error only reports an absent capability
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
