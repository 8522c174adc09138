//! Error types for edit overlays

use crate::reference::SyntheticRef;

/// Overlay operation errors
#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    /// A synthetic reference did not resolve to a part of the draft
    #[error("overlay desync: no {kind} with ref '{reference}'")]
    Desync {
        /// Kind of part addressed
        kind: &'static str,
        /// Reference that did not resolve
        reference: SyntheticRef,
    },

    /// The workflow root node cannot be removed
    #[error("the root node of a workflow cannot be removed")]
    RootRemoval,

    /// The operation needs a workflow graph but the workflow has none
    #[error("workflow has no node graph")]
    NoGraph,

    /// The entity is not in edit mode
    #[error("no active overlay")]
    NotActive,

    /// A notification id did not match
    #[error("no notification with id {0}")]
    UnknownNotification(i64),

    /// A named part (variable, parameter) did not match
    #[error("no {kind} named '{name}'")]
    UnknownName {
        /// Kind of part addressed
        kind: &'static str,
        /// Name that did not match
        name: String,
    },
}

impl OverlayError {
    /// Create desync error
    ///
    /// Desyncs mean a caller addressed a part that no longer exists. The
    /// session reports them when the command fails.
    pub fn desync(kind: &'static str, reference: &SyntheticRef) -> Self {
        Self::Desync {
            kind,
            reference: reference.clone(),
        }
    }

    /// Create unknown-name error
    pub fn unknown_name(kind: &'static str, name: impl Into<String>) -> Self {
        Self::UnknownName {
            kind,
            name: name.into(),
        }
    }

    /// Whether this error is a reference desync
    #[must_use]
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::Desync { .. })
    }
}

/// Result type for overlay operations
pub type OverlayResult<T> = Result<T, OverlayError>;
