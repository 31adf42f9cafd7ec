//! Capability lookup along the parent chain

use std::sync::Arc;

use tracing::trace;

use crate::entry::{AnyValue, Producer, SetterFn};
use crate::key::CapabilityKey;
use crate::lifecycle::ScopeNode;
use crate::Scope;

/// Outcome of resolving a capability against a scope
pub(crate) enum Resolved {
    /// A concrete value, or the fresh result of a factory
    Value(AnyValue),
    /// A field-setter, usable only by the injector
    Setter(Arc<SetterFn>),
}

/// Find the producer for `key`, starting at `origin` and walking toward the
/// root. The producer is cloned out of the table so no lock is held once this
/// returns.
pub(crate) fn lookup(origin: &Arc<ScopeNode>, key: &CapabilityKey) -> Option<Producer> {
    origin.assert_live("resolve");

    let mut current = Arc::clone(origin);
    loop {
        let found = current.table.read().get(key);
        if found.is_some() {
            return found;
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => {
                trace!(capability = key.name(), scope_id = origin.id(), "capability not found");
                return None;
            }
        }
    }
}

/// Resolve `key` for `scope`. Factories run against `scope` itself, not the
/// scope that defines them, and are never cached.
pub(crate) fn resolve(scope: &Scope, key: &CapabilityKey) -> Option<Resolved> {
    match lookup(scope.node(), key)? {
        Producer::Value(value) => Some(Resolved::Value(value)),
        Producer::Factory(factory) => Some(Resolved::Value(factory(scope))),
        Producer::Setter(setter) => Some(Resolved::Setter(setter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Entry;

    struct Label(&'static str);
    struct Origin(u64);

    #[test]
    fn test_lookup_walks_to_root() {
        let root = Scope::root();
        root.insert(Entry::value(Label("root")));
        let grandchild = root.fork().fork();

        let found = lookup(grandchild.node(), &CapabilityKey::of::<Label>());
        assert!(matches!(found, Some(Producer::Value(_))));
    }

    #[test]
    fn test_lookup_stops_at_nearest_entry() {
        let root = Scope::root();
        root.insert(Entry::value(Label("root")));
        let child = root.fork();
        child.insert(Entry::value(Label("child")));
        let grandchild = child.fork();

        let Some(Resolved::Value(value)) = resolve(&grandchild, &CapabilityKey::of::<Label>())
        else {
            panic!("expected a value");
        };
        assert_eq!(value.downcast::<Label>().ok().unwrap().0, "child");
    }

    #[test]
    fn test_factory_sees_originating_scope() {
        let root = Scope::root();
        root.insert(Entry::<Origin>::factory(|scope| Arc::new(Origin(scope.id()))));
        let child = root.fork();

        let Some(Resolved::Value(value)) = resolve(&child, &CapabilityKey::of::<Origin>())
        else {
            panic!("expected a value");
        };
        assert_eq!(value.downcast::<Origin>().ok().unwrap().0, child.id());
    }

    #[test]
    fn test_setter_is_reported_as_setter() {
        let root = Scope::root();
        root.insert(Entry::<Label>::setter(|_, slot| {
            *slot = Some(Arc::new(Label("set")))
        }));

        assert!(matches!(
            resolve(&root, &CapabilityKey::of::<Label>()),
            Some(Resolved::Setter(_))
        ));
    }
}
