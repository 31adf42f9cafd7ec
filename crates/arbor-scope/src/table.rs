//! Per-scope value table

use std::collections::HashMap;

use crate::entry::{DisposeHook, ErasedEntry, Producer};
use crate::key::CapabilityKey;

/// Capability map owned by a single scope node.
///
/// Besides live entries it tracks hooks that must still run at finalization:
/// hooks of entries overwritten on this scope and hooks deferred by callers.
#[derive(Default)]
pub(crate) struct ValueTable {
    entries: HashMap<CapabilityKey, ErasedEntry>,
    retired: Vec<DisposeHook>,
    deferred: Vec<DisposeHook>,
}

impl ValueTable {
    /// Clone the producer stored under `key`, if any
    pub(crate) fn get(&self, key: &CapabilityKey) -> Option<Producer> {
        self.entries.get(key).map(|entry| entry.producer.clone())
    }

    pub(crate) fn contains(&self, key: &CapabilityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Store an entry. A replaced entry's hook is kept until finalization
    /// since values it guards may still be held by callers.
    pub(crate) fn insert(&mut self, key: CapabilityKey, entry: ErasedEntry) {
        if let Some(previous) = self.entries.insert(key, entry) {
            if let Some(hook) = previous.dispose {
                self.retired.push(hook);
            }
        }
    }

    pub(crate) fn defer(&mut self, hook: DisposeHook) {
        self.deferred.push(hook);
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.retired.is_empty() && self.deferred.is_empty()
    }

    /// Empty the table and hand back every pending disposal hook.
    ///
    /// Entry hooks come first, then retired hooks, then deferred hooks in
    /// reverse registration order. Allocated capacity is retained.
    pub(crate) fn drain_hooks(&mut self) -> Vec<DisposeHook> {
        let mut hooks: Vec<DisposeHook> = self
            .entries
            .drain()
            .filter_map(|(_, entry)| entry.dispose)
            .collect();
        hooks.append(&mut self.retired);
        hooks.extend(self.deferred.drain(..).rev());
        hooks
    }
}
