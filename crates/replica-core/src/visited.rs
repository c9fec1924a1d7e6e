//! Identity map from original objects to their clones

use rustc_hash::FxHashMap;

use crate::object::GcRef;

struct Entry {
    // Keeps the original alive so its address is not reused mid-clone
    _original: GcRef,
    clone: GcRef,
}

/// Original → clone map keyed by reference identity
///
/// Two distinct objects that happen to compare equal by value still get
/// separate entries.
#[derive(Default)]
pub struct VisitedRegistry {
    entries: FxHashMap<usize, Entry>,
}

impl VisitedRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry sized for `capacity` objects
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Clone recorded for `original`, if any
    pub fn lookup(&self, original: &GcRef) -> Option<GcRef> {
        self.entries
            .get(&original.addr())
            .map(|entry| entry.clone.clone())
    }

    /// Record `clone` as the duplicate of `original`
    pub fn register(&mut self, original: &GcRef, clone: &GcRef) {
        self.entries.insert(
            original.addr(),
            Entry {
                _original: original.clone(),
                clone: clone.clone(),
            },
        );
    }

    /// Number of recorded originals
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Forget every entry, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TypeId, TypeRegistry};

    #[test]
    fn test_lookup_by_identity() {
        let registry = TypeRegistry::new();
        let a = registry.new_object(TypeId::OBJECT).unwrap();
        let b = registry.new_object(TypeId::OBJECT).unwrap();
        let a_clone = registry.new_object(TypeId::OBJECT).unwrap();

        let mut visited = VisitedRegistry::new();
        assert!(visited.lookup(&a).is_none());
        visited.register(&a, &a_clone);

        assert!(GcRef::ptr_eq(&visited.lookup(&a).unwrap(), &a_clone));
        assert!(GcRef::ptr_eq(&visited.lookup(&a.clone()).unwrap(), &a_clone));
        // Equal by value, distinct by identity
        assert!(visited.lookup(&b).is_none());
        assert_eq!(visited.len(), 1);

        visited.clear();
        assert!(visited.is_empty());
    }
}
