//! Free-list recycler for scope nodes
//!
//! Recycling only amortizes allocation: a node is handed out again only once
//! nothing else references it, so reuse is never observable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::config::NodePoolConfig;
use crate::lifecycle::ScopeNode;

/// Snapshot of pool activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Nodes created from scratch
    pub allocated: usize,
    /// Nodes handed out again after finalization
    pub reused: usize,
    /// Nodes currently waiting for reuse
    pub idle: usize,
}

pub(crate) struct NodePool {
    free: Mutex<Vec<Arc<ScopeNode>>>,
    max_idle: usize,
    allocated: AtomicUsize,
    reused: AtomicUsize,
}

impl NodePool {
    pub(crate) fn new(config: &NodePoolConfig) -> Self {
        let pool = Self {
            free: Mutex::new(Vec::with_capacity(config.prewarm)),
            max_idle: config.max_idle,
            allocated: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
        };
        pool.prewarm(config.prewarm);
        pool
    }

    /// Allocate up to `count` idle nodes ahead of time
    pub(crate) fn prewarm(&self, count: usize) {
        let mut free = self.free.lock();
        let target = count.min(self.max_idle);
        while free.len() < target {
            free.push(Arc::new(ScopeNode::idle()));
            self.allocated.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Hand out a live node attached to `parent`
    pub(crate) fn acquire(&self, parent: Option<Arc<ScopeNode>>) -> Arc<ScopeNode> {
        if let Some(mut node) = self.take_idle() {
            if let Some(inner) = Arc::get_mut(&mut node) {
                inner.reset(parent);
                self.reused.fetch_add(1, Ordering::Relaxed);
                trace!(scope_id = node.id(), "reused pooled scope node");
                return node;
            }
        }

        self.allocated.fetch_add(1, Ordering::Relaxed);
        Arc::new(ScopeNode::new(parent))
    }

    /// Take back a finalized, emptied node
    pub(crate) fn release(&self, node: Arc<ScopeNode>) {
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(node);
        }
    }

    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            idle: self.free.lock().len(),
        }
    }

    /// Take the most recently released node nothing else references. Shared
    /// nodes stay in the list until their last outside reference is gone.
    fn take_idle(&self) -> Option<Arc<ScopeNode>> {
        let mut free = self.free.lock();
        let index = free
            .iter()
            .rposition(|node| Arc::strong_count(node) == 1 && Arc::weak_count(node) == 0)?;
        Some(free.swap_remove(index))
    }

    #[cfg(test)]
    pub(crate) fn shared_idle(&self) -> usize {
        self.free
            .lock()
            .iter()
            .filter(|node| Arc::strong_count(node) > 1)
            .count()
    }
}
