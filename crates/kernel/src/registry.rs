use std::collections::BTreeMap;
use vantage_common::ObjectId;

/// What a registered identifier names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    World,
    Actor,
    Component,
}

/// Global object table. Hands out identifiers and tracks which are live.
///
/// Identifiers are allocated monotonically, so a released id is not handed
/// out again until the counter wraps. `0` and [`ObjectId::NONE`] are never
/// allocated.
#[derive(Debug, Clone)]
pub struct ObjectRegistry {
    next: u32,
    live: BTreeMap<ObjectId, ObjectKind>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectRegistry {
    /// Registry whose first allocation is `1`.
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Registry whose first allocation is `first` (or the next valid value).
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: first,
            live: BTreeMap::new(),
        }
    }

    /// Next unused identifier, skipping `0`, `NONE` and live ids.
    pub fn allocate(&mut self, kind: ObjectKind) -> ObjectId {
        loop {
            let candidate = ObjectId(self.next);
            self.next = self.next.wrapping_add(1);
            if candidate.is_valid() && !self.live.contains_key(&candidate) {
                self.live.insert(candidate, kind);
                return candidate;
            }
        }
    }

    /// Remove a live object. Returns `None` if it was not registered.
    pub fn remove(&mut self, id: ObjectId) -> Option<ObjectKind> {
        self.live.remove(&id)
    }

    /// Whether `id` is currently live.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.live.contains_key(&id)
    }

    /// What kind of object a live id names.
    pub fn kind(&self, id: ObjectId) -> Option<ObjectKind> {
        self.live.get(&id).copied()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_starts_at_one() {
        let mut registry = ObjectRegistry::new();
        assert_eq!(registry.allocate(ObjectKind::Actor), ObjectId(1));
        assert_eq!(registry.allocate(ObjectKind::Component), ObjectId(2));
    }

    #[test]
    fn released_ids_are_not_reused() {
        let mut registry = ObjectRegistry::new();
        let a = registry.allocate(ObjectKind::Actor);
        assert_eq!(registry.remove(a), Some(ObjectKind::Actor));
        assert_eq!(registry.remove(a), None);
        let b = registry.allocate(ObjectKind::Actor);
        assert_ne!(a, b);
    }

    #[test]
    fn wraparound_skips_reserved_and_live_ids() {
        let mut registry = ObjectRegistry::starting_at(u32::MAX - 1);
        let last = registry.allocate(ObjectKind::Actor);
        assert_eq!(last, ObjectId(u32::MAX - 1));
        let wrapped = registry.allocate(ObjectKind::Actor);
        assert_eq!(wrapped, ObjectId(1));
        assert!(registry.contains(last));
        assert_eq!(registry.len(), 2);
    }
}
