//! Scope providers
//!
//! Collaborating layers (sessions, views, document mapping, ...) never fork
//! scopes themselves. At bootstrap they register values, factories and
//! field-setters on the root scope through a [`ScopeProvider`].
//!
//! ```rust
//! use arbor_scope::{ProviderRegistry, Scope, ScopeProvider, ScopeResult};
//!
//! struct SessionStore;
//! struct SessionProvider;
//!
//! impl ScopeProvider for SessionProvider {
//!     fn name(&self) -> &'static str {
//!         "sessions"
//!     }
//!
//!     fn register(&self, root: &Scope) -> ScopeResult<()> {
//!         root.set(SessionStore);
//!         Ok(())
//!     }
//! }
//!
//! let mut registry = ProviderRegistry::new();
//! registry.add(SessionProvider);
//!
//! let root = Scope::root();
//! registry.register_all(&root).unwrap();
//! assert!(root.contains::<SessionStore>());
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{ScopeError, ScopeResult};
use crate::Scope;

// ============================================================================
// ScopeProvider Trait
// ============================================================================

/// A bundle of capabilities registered on a root scope at bootstrap
pub trait ScopeProvider: Send + Sync {
    /// Name used for logging and dependency references
    fn name(&self) -> &'static str;

    /// Lower values are registered first. Default is 100.
    fn priority(&self) -> u32 {
        100
    }

    /// Providers that must be registered before this one
    fn dependencies(&self) -> &[&'static str] {
        &[]
    }

    /// Store this provider's capabilities on `root`
    fn register(&self, root: &Scope) -> ScopeResult<()>;

    /// Called after every provider has registered
    #[allow(unused_variables)]
    fn validate(&self, root: &Scope) -> ScopeResult<()> {
        Ok(())
    }
}

// ============================================================================
// ProviderRegistry
// ============================================================================

/// Ordered collection of providers
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn ScopeProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a provider
    pub fn add<P: ScopeProvider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Add a provider that is already shared
    pub fn add_shared(&mut self, provider: Arc<dyn ScopeProvider>) -> &mut Self {
        self.providers.push(provider);
        self
    }

    /// Number of providers
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider has been added
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of all providers in insertion order
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Registration order: by priority, except that a provider's
    /// dependencies always come before it.
    pub fn ordered(&self) -> ScopeResult<Vec<Arc<dyn ScopeProvider>>> {
        let mut by_priority: Vec<_> = self.providers.iter().cloned().collect();
        by_priority.sort_by_key(|p| p.priority());

        let index: HashMap<&'static str, usize> = by_priority
            .iter()
            .enumerate()
            .map(|(i, p)| (p.name(), i))
            .collect();

        let mut state = vec![Visit::Pending; by_priority.len()];
        let mut ordered = Vec::with_capacity(by_priority.len());
        for i in 0..by_priority.len() {
            visit(i, &by_priority, &index, &mut state, &mut ordered)?;
        }
        Ok(ordered)
    }

    /// Register every provider on `root`, then validate them all
    pub fn register_all(&self, root: &Scope) -> ScopeResult<()> {
        let ordered = self.ordered()?;
        info!("Registering {} scope providers", ordered.len());

        for provider in &ordered {
            debug!(
                "Registering provider '{}' (priority: {})",
                provider.name(),
                provider.priority()
            );
            provider.register(root)?;
        }

        for provider in &ordered {
            provider.validate(root)?;
        }

        info!("All scope providers registered");
        Ok(())
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

fn visit(
    i: usize,
    providers: &[Arc<dyn ScopeProvider>],
    index: &HashMap<&'static str, usize>,
    state: &mut [Visit],
    ordered: &mut Vec<Arc<dyn ScopeProvider>>,
) -> ScopeResult<()> {
    match state[i] {
        Visit::Done => return Ok(()),
        Visit::InProgress => {
            return Err(ScopeError::ProviderCycle {
                provider: providers[i].name().to_string(),
            })
        }
        Visit::Pending => {}
    }

    state[i] = Visit::InProgress;
    for dependency in providers[i].dependencies() {
        let &dep = index
            .get(dependency)
            .ok_or_else(|| ScopeError::MissingProviderDependency {
                provider: providers[i].name().to_string(),
                dependency: dependency.to_string(),
            })?;
        visit(dep, providers, index, state, ordered)?;
    }
    state[i] = Visit::Done;
    ordered.push(Arc::clone(&providers[i]));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct TestProvider {
        name: &'static str,
        priority: u32,
        dependencies: &'static [&'static str],
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl TestProvider {
        fn new(name: &'static str, priority: u32, log: &Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                priority,
                dependencies: &[],
                log: Arc::clone(log),
            }
        }

        fn after(mut self, dependencies: &'static [&'static str]) -> Self {
            self.dependencies = dependencies;
            self
        }
    }

    impl ScopeProvider for TestProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn priority(&self) -> u32 {
            self.priority
        }

        fn dependencies(&self) -> &[&'static str] {
            self.dependencies
        }

        fn register(&self, _root: &Scope) -> ScopeResult<()> {
            self.log.lock().push(self.name);
            Ok(())
        }
    }

    struct Marker;

    struct FailingValidation;

    impl ScopeProvider for FailingValidation {
        fn name(&self) -> &'static str {
            "needs-marker"
        }

        fn register(&self, _root: &Scope) -> ScopeResult<()> {
            Ok(())
        }

        fn validate(&self, root: &Scope) -> ScopeResult<()> {
            if root.contains::<Marker>() {
                Ok(())
            } else {
                Err(ScopeError::ProviderFailed {
                    provider: self.name().to_string(),
                    message: "marker missing".to_string(),
                })
            }
        }
    }

    #[test]
    fn test_provider_registry() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.add(TestProvider::new("test1", 100, &log));
        registry.add(TestProvider::new("test2", 50, &log));

        assert_eq!(registry.len(), 2);
        assert!(registry.provider_names().contains(&"test1"));
        assert!(registry.provider_names().contains(&"test2"));
    }

    #[test]
    fn test_priority_ordering() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.add(TestProvider::new("low", 200, &log));
        registry.add(TestProvider::new("high", 10, &log));
        registry.add(TestProvider::new("medium", 100, &log));

        registry.register_all(&Scope::root()).unwrap();
        assert_eq!(*log.lock(), vec!["high", "medium", "low"]);
    }

    #[test]
    fn test_dependencies_registered_first() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.add(TestProvider::new("views", 1, &log).after(&["sessions"]));
        registry.add(TestProvider::new("sessions", 500, &log));

        registry.register_all(&Scope::root()).unwrap();
        assert_eq!(*log.lock(), vec!["sessions", "views"]);
    }

    #[test]
    fn test_missing_dependency() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.add(TestProvider::new("views", 1, &log).after(&["templates"]));

        let result = registry.register_all(&Scope::root());
        assert!(matches!(
            result,
            Err(ScopeError::MissingProviderDependency { .. })
        ));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn test_dependency_cycle() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ProviderRegistry::new();
        registry.add(TestProvider::new("a", 1, &log).after(&["b"]));
        registry.add(TestProvider::new("b", 2, &log).after(&["a"]));

        assert!(matches!(
            registry.ordered(),
            Err(ScopeError::ProviderCycle { .. })
        ));
    }

    #[test]
    fn test_validation_runs_after_registration() {
        let mut registry = ProviderRegistry::new();
        registry.add(FailingValidation);

        let root = Scope::root();
        assert!(registry.register_all(&root).is_err());

        root.set(Marker);
        assert!(registry.register_all(&root).is_ok());
    }
}
