//! Project keys and entity kinds

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Unique, immutable project key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectKey(String);

impl ProjectKey {
    /// Create a project key
    ///
    /// # Errors
    /// Returns error if the key is empty or contains `/`
    pub fn new(key: impl Into<String>) -> Result<Self, ModelError> {
        let key = key.into();
        if key.is_empty() || key.contains('/') {
            return Err(ModelError::InvalidProjectKey(key));
        }
        Ok(Self(key))
    }

    /// Key as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProjectKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Kind of entity owned by a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Application,
    Pipeline,
    Workflow,
    Environment,
}

impl EntityKind {
    /// All kinds, in index order
    pub const ALL: [EntityKind; 4] = [
        EntityKind::Application,
        EntityKind::Pipeline,
        EntityKind::Workflow,
        EntityKind::Environment,
    ];

    /// Lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Application => "application",
            EntityKind::Pipeline => "pipeline",
            EntityKind::Workflow => "workflow",
            EntityKind::Environment => "environment",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_key_rejects_separator() {
        assert!(ProjectKey::new("a/b").is_err());
        assert!(ProjectKey::new("").is_err());
        assert_eq!(ProjectKey::new("PROJ").unwrap().as_str(), "PROJ");
    }

    #[test]
    fn project_key_is_transparent_in_json() {
        let key = ProjectKey::from_str("test1").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"test1\"");
    }

    #[test]
    fn kind_display() {
        assert_eq!(EntityKind::Workflow.to_string(), "workflow");
        assert_eq!(EntityKind::ALL.len(), 4);
    }
}
