//! Reusable object pool
//!
//! Items are handed out as `Arc<T>` and keep their identity when they come
//! back, so a second acquisition after a recycle returns the very same
//! allocation. An item is only taken back when the pool would hold the last
//! reference to it.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_scope::Entry;
use parking_lot::Mutex;
use tracing::trace;

type CreateFn<T> = dyn Fn() -> T + Send + Sync;
type ResetFn<T> = dyn Fn(&mut T) + Send + Sync;

/// Counters describing pool activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectPoolStats {
    /// Items built by the create function
    pub created: usize,
    /// Acquisitions served from the idle list
    pub reused: usize,
    /// Items taken back into the idle list
    pub recycled: usize,
    /// Returned items that were still shared or did not fit
    pub discarded: usize,
    /// Items currently idle
    pub idle: usize,
}

/// Pool of shared objects
pub struct ObjectPool<T> {
    idle: Mutex<Vec<Arc<T>>>,
    create: Box<CreateFn<T>>,
    reset: Option<Box<ResetFn<T>>>,
    max_idle: usize,
    created: AtomicUsize,
    reused: AtomicUsize,
    recycled: AtomicUsize,
    discarded: AtomicUsize,
}

impl<T: Send + Sync + 'static> ObjectPool<T> {
    /// Create new object pool
    pub fn new<F: Fn() -> T + Send + Sync + 'static>(create: F) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            create: Box::new(create),
            reset: None,
            max_idle: 100,
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            recycled: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    /// Limit how many returned items are kept
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = max_idle;
        self
    }

    /// Applied to every item as it is recycled
    pub fn with_reset<F: Fn(&mut T) + Send + Sync + 'static>(mut self, reset: F) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Get an idle item or create a new one
    pub fn acquire(&self) -> Arc<T> {
        if let Some(item) = self.idle.lock().pop() {
            self.reused.fetch_add(1, Ordering::Relaxed);
            return item;
        }
        self.created.fetch_add(1, Ordering::Relaxed);
        Arc::new((self.create)())
    }

    /// Return an item. Returns `true` when it was kept for reuse; an item
    /// still referenced elsewhere is dropped instead.
    pub fn recycle(&self, mut item: Arc<T>) -> bool {
        let Some(inner) = Arc::get_mut(&mut item) else {
            trace!("pooled item still shared, discarding");
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if let Some(reset) = &self.reset {
            reset(inner);
        }

        let mut idle = self.idle.lock();
        if idle.len() >= self.max_idle {
            self.discarded.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        idle.push(item);
        self.recycled.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Items waiting for reuse
    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Upper bound on idle items
    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    /// Snapshot of pool activity
    pub fn stats(&self) -> ObjectPoolStats {
        ObjectPoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            recycled: self.recycled.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle: self.idle(),
        }
    }

    /// Clear pool
    pub fn clear(&self) {
        self.idle.lock().clear();
    }
}

impl<T> fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectPool")
            .field("idle", &self.idle.lock().len())
            .field("max_idle", &self.max_idle)
            .finish()
    }
}

/// Field-setter entry that fills the injected field from `pool` and hands the
/// item back when the injecting scope finalizes.
///
/// The item is only reused if the record it was injected into has let go of
/// it by then; otherwise it is simply dropped.
pub fn pooled_entry<T: Send + Sync + 'static>(pool: &Arc<ObjectPool<T>>) -> Entry<T> {
    let pool = Arc::clone(pool);
    Entry::setter(move |scope, slot| {
        let item = pool.acquire();
        *slot = Some(Arc::clone(&item));

        let pool = Arc::clone(&pool);
        scope.defer(move || {
            pool.recycle(item);
        });
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_scope::{injectable, Scope};
    use proptest::prelude::*;

    #[derive(Default)]
    struct Scratch {
        lines: Vec<String>,
    }

    #[derive(Default)]
    struct Worker {
        scratch: Option<Arc<Scratch>>,
    }

    injectable!(Worker { field scratch });

    #[test]
    fn test_object_pool() {
        let pool = ObjectPool::new(Scratch::default);

        let first = pool.acquire();
        let address = Arc::as_ptr(&first);
        assert!(pool.recycle(first));
        assert_eq!(pool.idle(), 1);

        let second = pool.acquire();
        assert_eq!(Arc::as_ptr(&second), address);
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.stats().reused, 1);
        assert_eq!(pool.stats().created, 1);
    }

    #[test]
    fn test_shared_item_is_not_recycled() {
        let pool = ObjectPool::new(Scratch::default);
        let item = pool.acquire();
        let holder = Arc::clone(&item);

        assert!(!pool.recycle(item));
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.stats().discarded, 1);
        drop(holder);
    }

    #[test]
    fn test_reset_applied_on_recycle() {
        let pool = ObjectPool::new(|| Scratch {
            lines: vec!["seed".to_string()],
        })
        .with_reset(|scratch: &mut Scratch| scratch.lines.clear());

        let item = pool.acquire();
        assert_eq!(item.lines.len(), 1);
        pool.recycle(item);
        assert!(pool.acquire().lines.is_empty());
    }

    #[test]
    fn test_clear() {
        let pool = ObjectPool::new(Scratch::default);
        pool.recycle(pool.acquire());
        pool.clear();
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_pooled_entry_returns_item_on_finalize() {
        let pool = Arc::new(ObjectPool::new(Scratch::default));
        let root = Scope::root();
        root.insert(pooled_entry(&pool));

        let unit = root.fork();
        let worker: Worker = unit.build();
        let address = Arc::as_ptr(worker.scratch.as_ref().unwrap());
        drop(worker);
        unit.dispose();
        assert_eq!(pool.idle(), 1);

        let unit = root.fork();
        let worker: Worker = unit.build();
        assert_eq!(Arc::as_ptr(worker.scratch.as_ref().unwrap()), address);
    }

    #[test]
    fn test_pooled_entry_drops_item_still_in_use() {
        let pool = Arc::new(ObjectPool::new(Scratch::default));
        let root = Scope::root();
        root.insert(pooled_entry(&pool));

        let unit = root.fork();
        let worker: Worker = unit.build();
        unit.dispose();

        assert!(worker.scratch.is_some());
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.stats().discarded, 1);
    }

    proptest! {
        #[test]
        fn prop_idle_never_exceeds_max(max_idle in 0usize..8, returned in 0usize..32) {
            let pool = ObjectPool::new(Scratch::default).with_max_idle(max_idle);
            let items: Vec<_> = (0..returned).map(|_| pool.acquire()).collect();
            for item in items {
                pool.recycle(item);
            }
            prop_assert_eq!(pool.idle(), returned.min(max_idle));
            prop_assert_eq!(pool.stats().created, returned);
        }
    }
}
