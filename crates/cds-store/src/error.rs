//! Error types for session stores

use cds_api::ApiError;
use cds_cache::CacheKey;
use cds_model::{EntityKind, ModelError, ProjectKey};
use cds_overlay::{OverlayError, SyntheticRef};

/// Errors raised while dispatching a command
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The API call failed; nothing was cached
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An edit could not be applied to a draft
    #[error(transparent)]
    Overlay(#[from] OverlayError),

    /// A response could not be merged over the cached value
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The command targets an entity that was never loaded
    #[error("{kind} {key} is not loaded")]
    NotLoaded {
        /// Kind of the entity
        kind: EntityKind,
        /// Project and name
        key: CacheKey,
    },

    /// The command needs the project but another one (or none) is loaded
    #[error("project {0} is not loaded")]
    ProjectNotLoaded(ProjectKey),

    /// A part addressed on the server path has no server id yet
    #[error("{kind} '{reference}' has no server id")]
    MissingServerId {
        /// Kind of part addressed
        kind: &'static str,
        /// Reference of the part
        reference: SyntheticRef,
    },

    /// Session configuration could not be read
    #[error("configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Create not-loaded error
    pub fn not_loaded(kind: EntityKind, key: &CacheKey) -> Self {
        Self::NotLoaded {
            kind,
            key: key.clone(),
        }
    }

    /// Whether this is an overlay reference desync
    #[must_use]
    pub fn is_desync(&self) -> bool {
        matches!(self, Self::Overlay(e) if e.is_desync())
    }

    /// Whether retrying the same command could succeed
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Api(e) if e.is_retryable())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use cds_api::Method;

    #[test]
    fn classification() {
        let desync = StoreError::from(OverlayError::Desync {
            kind: "node",
            reference: SyntheticRef::new("id:4"),
        });
        assert!(desync.is_desync());
        assert!(!desync.is_retryable());

        let api = StoreError::from(ApiError::status(Method::Put, "/p", 502, "bad gateway"));
        assert!(api.is_retryable());
        assert!(!api.is_desync());
    }
}
