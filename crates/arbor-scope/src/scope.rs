//! The `Scope` handle
//!
//! A `Scope` is an owner token for one node of the scope tree. Dropping it
//! disposes that token; forking hands out a child that holds a token on its
//! parent until the child finalizes. Because tokens are values, a scope can
//! neither be disposed twice nor used after its last token is gone.

use std::fmt;
use std::mem::ManuallyDrop;
use std::sync::Arc;

use tracing::{trace, warn};

use crate::config::ScopeConfig;
use crate::entry::{Dispose, Entry, EntryKind};
use crate::error::{ScopeError, ScopeResult};
use crate::inject::{FieldInjector, InjectReport, Injectable};
use crate::key::CapabilityKey;
use crate::lifecycle::{self, ScopeNode};
use crate::pool::{NodePool, PoolStats};
use crate::resolver::{self, Resolved};

/// Owner handle for a node in the scope tree
pub struct Scope {
    node: ManuallyDrop<Arc<ScopeNode>>,
    pool: Arc<NodePool>,
}

impl Scope {
    /// Bootstrap a root scope with default settings
    pub fn root() -> Self {
        Self::with_config(&ScopeConfig::default())
    }

    /// Bootstrap a root scope backed by a node pool sized from `config`
    pub fn with_config(config: &ScopeConfig) -> Self {
        let pool = Arc::new(NodePool::new(&config.node_pool));
        let node = pool.acquire(None);
        trace!(scope_id = node.id(), "bootstrapped root scope");
        Self {
            node: ManuallyDrop::new(node),
            pool,
        }
    }

    /// Start configuring a root scope
    pub fn builder() -> crate::ScopeBuilder {
        crate::ScopeBuilder::new()
    }

    /// Create a child scope. The child reads through to this scope; its writes
    /// stay local to it.
    pub fn fork(&self) -> Scope {
        let node = lifecycle::fork(self.node(), &self.pool);
        Scope {
            node: ManuallyDrop::new(node),
            pool: Arc::clone(&self.pool),
        }
    }

    /// Give up this handle's token. Same as dropping it.
    pub fn dispose(self) {
        drop(self);
    }

    /// Process-unique id of the node behind this handle
    pub fn id(&self) -> u64 {
        self.node.id()
    }

    /// Distance from the root; the root is at depth 0
    pub fn depth(&self) -> usize {
        self.node.depth()
    }

    /// Whether this scope was bootstrapped rather than forked
    pub fn is_root(&self) -> bool {
        self.node.parent().is_none()
    }

    /// Tokens outstanding beyond the first owner
    pub fn reference_count(&self) -> isize {
        self.node.reference_count()
    }

    /// Activity of the node pool shared by this tree
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    // ------------------------------------------------------------------
    // Writes (current node only)
    // ------------------------------------------------------------------

    /// Store `entry` under capability `T` on this scope, shadowing any
    /// ancestor entry for `T`.
    pub fn insert<T: ?Sized + 'static>(&self, entry: Entry<T>) {
        self.node.assert_live("insert");
        let key = CapabilityKey::of::<T>();
        trace!(capability = key.name(), kind = ?entry.kind(), scope_id = self.id(), "stored entry");
        self.node.table.write().insert(key, entry.into_erased());
    }

    /// Store a concrete value for `T`
    pub fn set<T: Send + Sync + 'static>(&self, value: T) {
        self.insert(Entry::value(value));
    }

    /// Store an already shared value for `T`
    pub fn set_shared<T: Send + Sync + 'static>(&self, value: Arc<T>) {
        self.insert(Entry::shared(value));
    }

    /// Store a value whose `dispose` runs when this scope finalizes
    pub fn set_disposable<T: Dispose + 'static>(&self, value: T) {
        self.insert(Entry::disposable(value));
    }

    /// Store a factory invoked on every resolution of `T`
    pub fn set_factory<T, F>(&self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope) -> Arc<T> + Send + Sync + 'static,
    {
        self.insert(Entry::factory(factory));
    }

    /// Store a field-setter used when injecting `T` fields
    pub fn set_setter<T, F>(&self, setter: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&Scope, &mut Option<Arc<T>>) + Send + Sync + 'static,
    {
        self.insert(Entry::setter(setter));
    }

    /// Run `hook` when this scope finalizes
    pub fn defer<F>(&self, hook: F)
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        self.node.assert_live("defer");
        self.node.table.write().defer(Box::new(hook));
    }

    // ------------------------------------------------------------------
    // Reads (walk toward the root)
    // ------------------------------------------------------------------

    /// Resolve capability `T`, treating absence and setter-only entries
    /// alike as `None`.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.try_resolve().ok()
    }

    /// Resolve capability `T`, reporting why nothing usable was found
    pub fn try_resolve<T: Send + Sync + 'static>(&self) -> ScopeResult<Arc<T>> {
        let key = CapabilityKey::of::<T>();
        match resolver::resolve(self, &key) {
            Some(Resolved::Value(value)) => value.downcast::<T>().map_err(|_| {
                warn!(capability = key.name(), "resolved value has an unexpected type");
                ScopeError::TypeMismatch {
                    capability: key.name().to_string(),
                }
            }),
            Some(Resolved::Setter(_)) => Err(ScopeError::SetterOnly {
                capability: key.name().to_string(),
            }),
            None => Err(ScopeError::not_found(key.name())),
        }
    }

    /// Resolve `T` and pin the result on this scope as a concrete value, so
    /// later resolutions from here and below reuse it instead of re-running
    /// a factory.
    pub fn memoize<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        let value = self.resolve::<T>()?;
        self.set_shared(Arc::clone(&value));
        Some(value)
    }

    /// Whether `T` is resolvable from here, without running factories
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        resolver::lookup(self.node(), &CapabilityKey::of::<T>()).is_some()
    }

    /// Whether this scope itself holds an entry for `T`
    pub fn contains_local<T: ?Sized + 'static>(&self) -> bool {
        self.node.assert_live("contains");
        self.node.table.read().contains(&CapabilityKey::of::<T>())
    }

    /// Kind of the nearest entry for `T`
    pub fn entry_kind<T: ?Sized + 'static>(&self) -> Option<EntryKind> {
        resolver::lookup(self.node(), &CapabilityKey::of::<T>()).map(|producer| producer.kind())
    }

    /// Number of entries stored on this scope itself
    pub fn local_len(&self) -> usize {
        self.node.table.read().len()
    }

    // ------------------------------------------------------------------
    // Injection
    // ------------------------------------------------------------------

    /// Populate the injectable fields of `target` from this scope
    pub fn inject<R: Injectable + ?Sized>(&self, target: &mut R) -> InjectReport {
        self.node.assert_live("inject");
        let mut fields = FieldInjector::new(self);
        target.inject_fields(&mut fields);
        let report = fields.finish();
        trace!(scope_id = self.id(), ?report, "injected record");
        report
    }

    /// Build a default `R` and inject it
    pub fn build<R: Injectable + Default>(&self) -> R {
        let mut target = R::default();
        self.inject(&mut target);
        target
    }

    pub(crate) fn node(&self) -> &Arc<ScopeNode> {
        &self.node
    }
}

/// Cloning hands out one more owner token for the same scope; the scope
/// finalizes only once every clone has been dropped too.
impl Clone for Scope {
    fn clone(&self) -> Self {
        self.node.retain();
        Self {
            node: ManuallyDrop::new(Arc::clone(self.node())),
            pool: Arc::clone(&self.pool),
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        // SAFETY: `node` is not touched again after being taken here.
        let node = unsafe { ManuallyDrop::take(&mut self.node) };
        lifecycle::release(node, &self.pool);
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.id())
            .field("depth", &self.depth())
            .field("reference_count", &self.reference_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Config(&'static str);

    struct Counter(usize);

    #[test]
    fn test_child_write_shadows_without_touching_parent() {
        let root = Scope::root();
        root.set(Config("A"));
        let c1 = root.fork();
        let c2 = root.fork();

        c1.set(Config("B"));
        assert_eq!(*c1.resolve::<Config>().unwrap(), Config("B"));
        assert_eq!(*c2.resolve::<Config>().unwrap(), Config("A"));
        assert_eq!(*root.resolve::<Config>().unwrap(), Config("A"));
        assert!(c1.contains_local::<Config>());
        assert!(!c2.contains_local::<Config>());
    }

    #[test]
    fn test_try_resolve_errors() {
        let root = Scope::root();
        assert!(root.try_resolve::<Config>().unwrap_err().is_not_found());

        root.set_setter::<Config, _>(|_, slot| *slot = Some(Arc::new(Config("set"))));
        assert!(matches!(
            root.try_resolve::<Config>(),
            Err(ScopeError::SetterOnly { .. })
        ));
        assert!(root.resolve::<Config>().is_none());
        assert_eq!(root.entry_kind::<Config>(), Some(EntryKind::Setter));
    }

    #[test]
    fn test_memoize_pins_factory_result() {
        let calls = Arc::new(AtomicUsize::new(0));
        let root = Scope::root();
        let counter = Arc::clone(&calls);
        root.set_factory(move |_| Arc::new(Counter(counter.fetch_add(1, Ordering::SeqCst))));

        let child = root.fork();
        let pinned = child.memoize::<Counter>().unwrap();
        let again = child.resolve::<Counter>().unwrap();
        assert!(Arc::ptr_eq(&pinned, &again));
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // the parent still runs the factory
        assert_eq!(root.resolve::<Counter>().unwrap().0, 1);
    }

    #[test]
    fn test_clone_keeps_scope_alive() {
        let finalized = Arc::new(AtomicUsize::new(0));
        let root = Scope::root();
        let counter = Arc::clone(&finalized);
        root.defer(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let extra = root.clone();
        assert_eq!(extra.reference_count(), 1);
        drop(root);
        assert_eq!(finalized.load(Ordering::SeqCst), 0);
        assert_eq!(extra.id(), extra.clone().id());
        drop(extra);
        assert_eq!(finalized.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_finalized_nodes_are_recycled() {
        let root = Scope::root();
        let child = root.fork();
        let first_id = child.id();
        child.dispose();
        assert_eq!(root.pool_stats().idle, 1);

        let again = root.fork();
        assert_ne!(again.id(), first_id);
        assert_eq!(again.reference_count(), 0);
        assert_eq!(again.local_len(), 0);
        assert_eq!(root.pool_stats().reused, 1);
    }

    #[test]
    fn test_recycled_node_does_not_leak_entries() {
        let root = Scope::root();
        let child = root.fork();
        child.set(Config("stale"));
        drop(child);

        let fresh = root.fork();
        assert!(fresh.resolve::<Config>().is_none());
    }

    #[test]
    fn test_dropped_handle_leaves_no_reference_in_pool() {
        let shared_at_cascade = Arc::new(AtomicUsize::new(usize::MAX));
        let root = Scope::root();
        let parent = root.fork();
        let child = parent.fork();

        // the parent's hooks run after the child's node is back in the pool
        // but before the child's drop has returned
        let pool = Arc::clone(&parent.pool);
        let observed = Arc::clone(&shared_at_cascade);
        parent.defer(move || observed.store(pool.shared_idle(), Ordering::SeqCst));

        drop(parent);
        drop(child);
        assert_eq!(shared_at_cascade.load(Ordering::SeqCst), 0);
        assert_eq!(root.pool_stats().idle, 2);
    }

    #[test]
    fn test_typed_entries_resolve_to_their_own_type() {
        let root = Scope::root();
        root.set(Config("value"));
        root.set_factory(|_| Arc::new(Counter(3)));
        root.insert(Entry::shared(Arc::new(7u32)));

        assert_eq!(*root.try_resolve::<Config>().unwrap(), Config("value"));
        assert_eq!(root.try_resolve::<Counter>().unwrap().0, 3);
        assert_eq!(*root.try_resolve::<u32>().unwrap(), 7);
    }

    #[test]
    fn test_debug_output() {
        let root = Scope::root();
        let rendered = format!("{:?}", root);
        assert!(rendered.contains("depth: 0"));
        assert!(root.is_root());
        assert!(!root.fork().is_root());
    }
}
