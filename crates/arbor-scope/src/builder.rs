//! Root scope bootstrap

use tracing::info;

use crate::config::ScopeConfig;
use crate::error::ScopeResult;
use crate::provider::{ProviderRegistry, ScopeProvider};
use crate::registration;
use crate::Scope;

/// Builds a configured root scope with its providers registered
pub struct ScopeBuilder {
    config: ScopeConfig,
    registry: ProviderRegistry,
    discover: bool,
}

impl ScopeBuilder {
    /// Builder with default configuration and no providers
    pub fn new() -> Self {
        Self {
            config: ScopeConfig::default(),
            registry: ProviderRegistry::new(),
            discover: false,
        }
    }

    /// Use `config` for the root and its node pool
    pub fn config(mut self, config: ScopeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register `provider` on the root when it is built
    pub fn provider<P: ScopeProvider + 'static>(mut self, provider: P) -> Self {
        self.registry.add(provider);
        self
    }

    /// Also run registrations submitted through `inventory`
    pub fn discover(mut self, enabled: bool) -> Self {
        self.discover = enabled;
        self
    }

    /// Create the root and register capabilities on it. Discovered
    /// registrations run before explicit providers. On error the partially
    /// populated root is disposed.
    pub fn build(self) -> ScopeResult<Scope> {
        self.config.validate()?;
        let root = Scope::with_config(&self.config);

        if self.discover {
            registration::register_discovered(&root)?;
        }
        self.registry.register_all(&root)?;

        info!(
            scope_id = root.id(),
            entries = root.local_len(),
            "root scope ready"
        );
        Ok(root)
    }
}

impl Default for ScopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
