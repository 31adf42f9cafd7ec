//! Capability keys

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Identifies the kind of thing being requested from a scope.
///
/// Two keys are equal iff they were built from the same type. The type name
/// is kept only for diagnostics.
#[derive(Clone, Copy)]
pub struct CapabilityKey {
    id: TypeId,
    name: &'static str,
}

impl CapabilityKey {
    /// Key for the capability denoted by `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Human-readable type name
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for CapabilityKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for CapabilityKey {}

impl Hash for CapabilityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CapabilityKey").field(&self.name).finish()
    }
}

impl fmt::Display for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Config;
    struct Database;

    #[test]
    fn test_keys_compare_by_type() {
        assert_eq!(CapabilityKey::of::<Config>(), CapabilityKey::of::<Config>());
        assert_ne!(CapabilityKey::of::<Config>(), CapabilityKey::of::<Database>());
    }

    #[test]
    fn test_keys_hash_by_type() {
        let mut keys = HashSet::new();
        keys.insert(CapabilityKey::of::<Config>());
        keys.insert(CapabilityKey::of::<Config>());
        keys.insert(CapabilityKey::of::<Database>());
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_key_display_uses_type_name() {
        let key = CapabilityKey::of::<Config>();
        assert!(key.to_string().ends_with("Config"));
    }
}
