//! Arena of overlay parts keyed by synthetic reference

use crate::error::{OverlayError, OverlayResult};
use crate::reference::SyntheticRef;
use std::collections::BTreeMap;

/// Parts of one kind, addressed by [`SyntheticRef`]
///
/// Lookups of an unknown reference fail with [`OverlayError::Desync`].
#[derive(Debug, Clone)]
pub struct Arena<T> {
    kind: &'static str,
    items: BTreeMap<SyntheticRef, T>,
}

impl<T> Arena<T> {
    /// Create empty arena for parts named `kind` in errors
    #[must_use]
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            items: BTreeMap::new(),
        }
    }

    /// Store a part
    pub fn insert(&mut self, reference: SyntheticRef, item: T) {
        self.items.insert(reference, item);
    }

    /// Part by reference
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn get(&self, reference: &SyntheticRef) -> OverlayResult<&T> {
        self.items
            .get(reference)
            .ok_or_else(|| OverlayError::desync(self.kind, reference))
    }

    /// Mutable part by reference
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn get_mut(&mut self, reference: &SyntheticRef) -> OverlayResult<&mut T> {
        let kind = self.kind;
        self.items
            .get_mut(reference)
            .ok_or_else(|| OverlayError::desync(kind, reference))
    }

    /// Remove a part
    ///
    /// # Errors
    /// Returns [`OverlayError::Desync`] if the reference is unknown
    pub fn remove(&mut self, reference: &SyntheticRef) -> OverlayResult<T> {
        self.items
            .remove(reference)
            .ok_or_else(|| OverlayError::desync(self.kind, reference))
    }

    /// Whether a part is stored under `reference`
    #[must_use]
    pub fn contains(&self, reference: &SyntheticRef) -> bool {
        self.items.contains_key(reference)
    }

    /// Number of parts
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the arena is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Parts in reference order
    pub fn iter(&self) -> impl Iterator<Item = (&SyntheticRef, &T)> {
        self.items.iter()
    }

    /// First reference whose part satisfies `pred`
    pub fn find(&self, mut pred: impl FnMut(&T) -> bool) -> Option<SyntheticRef> {
        self.items
            .iter()
            .find(|(_, item)| pred(item))
            .map(|(r, _)| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_get_unknown_is_desync() {
        let arena: Arena<u8> = Arena::new("stage");
        let err = arena.get(&SyntheticRef::new("nope")).unwrap_err();
        assert!(err.is_desync());
    }

    #[test]
    fn arena_insert_find_remove() {
        let mut arena = Arena::new("job");
        arena.insert(SyntheticRef::new("a"), 1);
        arena.insert(SyntheticRef::new("b"), 2);

        assert_eq!(arena.find(|v| *v == 2), Some(SyntheticRef::new("b")));
        assert_eq!(arena.remove(&SyntheticRef::new("a")).unwrap(), 1);
        assert!(arena.remove(&SyntheticRef::new("a")).is_err());
        assert_eq!(arena.len(), 1);
    }
}
