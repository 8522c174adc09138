//! Edit-mode state machine
//!
//! ```text
//!  Canonical ──enter──▶ Active { changed: false } ──mutate──▶ Active { changed: true }
//!      ▲                        │  ▲                                  │
//!      └────────discard─────────┘  └──────────────cancel──────────────┘
//! ```

use crate::error::{OverlayError, OverlayResult};
use cds_model::Entity;

/// Editable working copy of an entity
pub trait Draft: Clone + Send + Sync {
    /// Entity this draft is derived from
    type Canonical: Entity;

    /// Build a draft from the canonical value, assigning references
    fn derive(canonical: &Self::Canonical) -> Self;

    /// Rebuild a full entity from the draft
    fn materialize(&self) -> Self::Canonical;
}

/// State of an overlay
#[derive(Debug, Clone)]
pub enum OverlayState<D> {
    /// Edits go to the server
    Canonical,
    /// Edits stay local
    Active {
        /// Working copy
        draft: D,
        /// Whether any edit was applied since entry or cancel
        changed: bool,
    },
}

/// What [`EditOverlay::sync`] did with a freshly loaded value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Entity is not repository-sourced; overlay is off
    Canonical,
    /// Overlay (re)derived from the new value
    Entered,
    /// Overlay had unsaved edits and was kept
    KeptDraft,
}

/// Overlay of one entity
#[derive(Debug, Clone)]
pub struct EditOverlay<D> {
    state: OverlayState<D>,
}

impl<D> Default for EditOverlay<D> {
    fn default() -> Self {
        Self {
            state: OverlayState::Canonical,
        }
    }
}

impl<D: Draft> EditOverlay<D> {
    /// Overlay in canonical state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overlay entered from a canonical value
    #[must_use]
    pub fn entered(canonical: &D::Canonical) -> Self {
        let mut overlay = Self::new();
        overlay.enter(canonical);
        overlay
    }

    /// Enter edit mode, discarding any previous draft
    pub fn enter(&mut self, canonical: &D::Canonical) {
        tracing::debug!(kind = %D::Canonical::KIND, name = canonical.name(), "overlay entered");
        self.state = OverlayState::Active {
            draft: D::derive(canonical),
            changed: false,
        };
    }

    /// Align the overlay with a value just loaded from the server
    ///
    /// Repository-sourced values enter edit mode. A draft with unsaved
    /// edits survives the reload.
    pub fn sync(&mut self, canonical: &D::Canonical) -> SyncOutcome {
        if !canonical.from_repository() {
            self.discard();
            return SyncOutcome::Canonical;
        }
        if self.changed() {
            tracing::warn!(
                kind = %D::Canonical::KIND,
                name = canonical.name(),
                "entity reloaded while its overlay has unsaved changes; keeping draft"
            );
            return SyncOutcome::KeptDraft;
        }
        self.enter(canonical);
        SyncOutcome::Entered
    }

    /// Leave edit mode
    pub fn discard(&mut self) {
        self.state = OverlayState::Canonical;
    }

    /// Throw edits away and start again from the canonical value
    ///
    /// Returns `false` when the overlay was not active.
    pub fn cancel(&mut self, canonical: &D::Canonical) -> bool {
        if !self.is_active() {
            return false;
        }
        self.enter(canonical);
        true
    }

    /// Apply an edit to the draft
    ///
    /// The edit runs on a copy that replaces the draft only on success, so a
    /// failed edit leaves both the draft and the `changed` flag untouched.
    ///
    /// # Errors
    /// Returns [`OverlayError::NotActive`] in canonical state, or the error
    /// of the edit itself
    pub fn mutate<R>(&mut self, edit: impl FnOnce(&mut D) -> OverlayResult<R>) -> OverlayResult<R> {
        let OverlayState::Active { draft, changed } = &mut self.state else {
            return Err(OverlayError::NotActive);
        };
        let mut working = draft.clone();
        let result = edit(&mut working)?;
        *draft = working;
        *changed = true;
        Ok(result)
    }

    /// Whether edits stay local
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.state, OverlayState::Active { .. })
    }

    /// Whether the draft holds unsaved edits
    #[must_use]
    pub fn changed(&self) -> bool {
        matches!(self.state, OverlayState::Active { changed: true, .. })
    }

    /// Current draft
    #[must_use]
    pub fn draft(&self) -> Option<&D> {
        match &self.state {
            OverlayState::Active { draft, .. } => Some(draft),
            OverlayState::Canonical => None,
        }
    }

    /// Materialized draft
    #[must_use]
    pub fn snapshot(&self) -> Option<D::Canonical> {
        self.draft().map(Draft::materialize)
    }

    /// Raw state
    #[must_use]
    pub fn state(&self) -> &OverlayState<D> {
        &self.state
    }
}
