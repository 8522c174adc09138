//! Error types for the model layer

/// Errors raised while converting or merging entities
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// JSON encoding or decoding of an entity failed
    #[error("codec error for {kind}: {source}")]
    Codec {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Project key is empty or contains a path separator
    #[error("invalid project key: '{0}'")]
    InvalidProjectKey(String),
}

impl ModelError {
    /// Create codec error for an entity kind
    pub fn codec(kind: &'static str, source: serde_json::Error) -> Self {
        Self::Codec { kind, source }
    }
}
