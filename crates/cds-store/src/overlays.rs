//! Edit overlays of one entity kind, keyed like the cache

use cds_cache::CacheKey;
use cds_model::{Entity, ProjectKey};
use cds_overlay::{Draft, EditOverlay, OverlayError, OverlayResult, SyncOutcome};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Active overlays of one kind
///
/// Only entities in edit mode have an entry. The lock is held for the
/// duration of a synchronous edit, never across an `.await`.
#[derive(Debug)]
pub struct OverlaySet<D> {
    overlays: Mutex<HashMap<CacheKey, EditOverlay<D>>>,
    enabled: bool,
}

impl<D: Draft> OverlaySet<D> {
    /// Create an empty set; when `enabled` is false nothing enters edit mode
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self {
            overlays: Mutex::new(HashMap::new()),
            enabled,
        }
    }

    /// Align the overlay of `key` with a value just loaded from the server
    pub fn sync(&self, key: &CacheKey, canonical: &D::Canonical) -> SyncOutcome {
        let mut overlays = self.overlays.lock();
        if !self.enabled || !canonical.from_repository() {
            overlays.remove(key);
            return SyncOutcome::Canonical;
        }
        overlays.entry(key.clone()).or_default().sync(canonical)
    }

    /// Whether `key` is in edit mode
    #[must_use]
    pub fn is_active(&self, key: &CacheKey) -> bool {
        self.overlays.lock().get(key).is_some_and(EditOverlay::is_active)
    }

    /// Whether `key` has unsaved edits
    #[must_use]
    pub fn changed(&self, key: &CacheKey) -> bool {
        self.overlays.lock().get(key).is_some_and(EditOverlay::changed)
    }

    /// Apply an edit to the draft of `key`
    ///
    /// # Errors
    /// Returns [`OverlayError::NotActive`] if `key` is not in edit mode, or
    /// the error of the edit
    pub fn mutate<R>(&self, key: &CacheKey, edit: impl FnOnce(&mut D) -> OverlayResult<R>) -> OverlayResult<R> {
        let mut overlays = self.overlays.lock();
        let overlay = overlays.get_mut(key).ok_or(OverlayError::NotActive)?;
        let result = overlay.mutate(edit)?;
        tracing::debug!(%key, "overlay edited");
        Ok(result)
    }

    /// Reset the draft of `key` from the canonical value
    ///
    /// Returns `false` when `key` was not in edit mode.
    pub fn cancel(&self, key: &CacheKey, canonical: &D::Canonical) -> bool {
        self.overlays
            .lock()
            .get_mut(key)
            .is_some_and(|overlay| overlay.cancel(canonical))
    }

    /// Materialized draft of `key`
    #[must_use]
    pub fn snapshot(&self, key: &CacheKey) -> Option<D::Canonical> {
        self.overlays.lock().get(key).and_then(EditOverlay::snapshot)
    }

    /// Run `f` on the draft of `key`
    pub fn inspect<R>(&self, key: &CacheKey, f: impl FnOnce(&D) -> R) -> Option<R> {
        self.overlays.lock().get(key).and_then(EditOverlay::draft).map(f)
    }

    /// Drop the overlay of `key`
    pub fn discard(&self, key: &CacheKey) {
        self.overlays.lock().remove(key);
    }

    /// Drop every overlay of a project
    pub fn discard_scope(&self, project: &ProjectKey) {
        self.overlays.lock().retain(|key, _| &key.project != project);
    }

    /// Drop every overlay
    pub fn clear(&self) {
        self.overlays.lock().clear();
    }

    /// Number of entities in edit mode
    #[must_use]
    pub fn len(&self) -> usize {
        self.overlays.lock().len()
    }

    /// Whether no entity is in edit mode
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
