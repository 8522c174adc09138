//! Cache keys

use cds_model::ProjectKey;
use std::fmt;

/// Key of a cached entity: owning project and entity name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    /// Owning project
    pub project: ProjectKey,
    /// Entity name, unique within project and kind
    pub name: String,
}

impl CacheKey {
    /// Create key
    #[inline]
    #[must_use]
    pub fn new(project: ProjectKey, name: impl Into<String>) -> Self {
        Self {
            project,
            name: name.into(),
        }
    }

    /// Same project, another name
    #[inline]
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self::new(self.project.clone(), name)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_slash() {
        let key = CacheKey::new(ProjectKey::new("test1").unwrap(), "app1");
        assert_eq!(key.to_string(), "test1/app1");
        assert_eq!(key.renamed("app2").to_string(), "test1/app2");
    }

    #[test]
    fn keys_order_by_project_then_name() {
        let a = CacheKey::new(ProjectKey::new("a").unwrap(), "z");
        let b = CacheKey::new(ProjectKey::new("b").unwrap(), "a");
        assert!(a < b);
    }
}
