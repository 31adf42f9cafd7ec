//! Fork, dispose and the finalizer cascade
//!
//! Every node starts with a count of `0`, the implicit token held by whoever
//! created it. Forking borrows one more token from the parent; that token is
//! only returned when the child itself finalizes. A node finalizes when its
//! count reaches `-1`, then returns the borrowed token to its parent, which may
//! finalize in turn. The cascade climbs one level per finalize and never skips
//! a level.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicIsize, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, trace};

use crate::pool::NodePool;
use crate::table::ValueTable;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

fn next_scope_id() -> u64 {
    NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Storage behind a [`Scope`](crate::Scope) handle
pub(crate) struct ScopeNode {
    id: u64,
    depth: usize,
    refs: AtomicIsize,
    parent: Mutex<Option<Arc<ScopeNode>>>,
    pub(crate) table: RwLock<ValueTable>,
}

impl ScopeNode {
    pub(crate) fn new(parent: Option<Arc<ScopeNode>>) -> Self {
        Self {
            id: next_scope_id(),
            depth: parent.as_ref().map_or(0, |p| p.depth + 1),
            refs: AtomicIsize::new(0),
            parent: Mutex::new(parent),
            table: RwLock::new(ValueTable::default()),
        }
    }

    /// A finalized, empty node as kept by the pool
    pub(crate) fn idle() -> Self {
        Self {
            id: 0,
            depth: 0,
            refs: AtomicIsize::new(-1),
            parent: Mutex::new(None),
            table: RwLock::new(ValueTable::default()),
        }
    }

    /// Bring an idle node back to life. Requires exclusive access.
    pub(crate) fn reset(&mut self, parent: Option<Arc<ScopeNode>>) {
        self.id = next_scope_id();
        self.depth = parent.as_ref().map_or(0, |p| p.depth + 1);
        *self.refs.get_mut() = 0;
        *self.parent.get_mut() = parent;
        debug_assert!(self.table.get_mut().is_empty());
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn reference_count(&self) -> isize {
        self.refs.load(Ordering::Acquire)
    }

    pub(crate) fn is_live(&self) -> bool {
        self.reference_count() >= 0
    }

    /// Panic when the node has already been finalized
    pub(crate) fn assert_live(&self, operation: &str) {
        if !self.is_live() {
            panic!(
                "scope {} used after finalization (attempted {})",
                self.id, operation
            );
        }
    }

    pub(crate) fn parent(&self) -> Option<Arc<ScopeNode>> {
        self.parent.lock().clone()
    }

    /// Hand out one more owner token for this node
    pub(crate) fn retain(&self) {
        self.assert_live("retain");
        self.refs.fetch_add(1, Ordering::AcqRel);
    }
}

/// Create a child of `parent`, borrowing one token from it first
pub(crate) fn fork(parent: &Arc<ScopeNode>, pool: &NodePool) -> Arc<ScopeNode> {
    parent.assert_live("fork");
    parent.refs.fetch_add(1, Ordering::AcqRel);
    let child = pool.acquire(Some(Arc::clone(parent)));
    trace!(
        scope_id = child.id(),
        parent_id = parent.id(),
        depth = child.depth(),
        "forked scope"
    );
    child
}

/// Return one token held against `node`, finalizing as far up the tree as
/// the counts allow.
pub(crate) fn release(node: Arc<ScopeNode>, pool: &NodePool) {
    let mut current = Some(node);
    while let Some(node) = current.take() {
        let remaining = node.refs.fetch_sub(1, Ordering::AcqRel) - 1;
        if remaining < -1 {
            panic!(
                "scope {} disposed more times than it was forked (count {})",
                node.id(),
                remaining
            );
        }
        if remaining == -1 {
            current = finalize(node, pool);
        } else {
            trace!(scope_id = node.id(), remaining, "released scope token");
        }
    }
}

/// Run disposal hooks, clear the table, recycle the node and hand back the
/// parent whose borrowed token must now be returned.
fn finalize(node: Arc<ScopeNode>, pool: &NodePool) -> Option<Arc<ScopeNode>> {
    let hooks = node.table.write().drain_hooks();
    let hook_count = hooks.len();

    for hook in hooks {
        if panic::catch_unwind(AssertUnwindSafe(hook)).is_err() {
            error!(scope_id = node.id(), "disposal hook panicked during finalization");
        }
    }

    let parent = node.parent.lock().take();
    debug!(
        scope_id = node.id(),
        depth = node.depth(),
        hooks = hook_count,
        "finalized scope"
    );
    pool.release(node);
    parent
}
