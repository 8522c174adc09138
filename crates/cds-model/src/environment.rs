//! Environment entity

use crate::common::{GroupPermission, Key, Permission, Usage, Variable};
use crate::entity::Entity;
use crate::kind::{EntityKind, ProjectKey};
use crate::project::Project;
use crate::summary::IdName;
use serde::{Deserialize, Serialize};

/// Deployment environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<ProjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Key>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_repository: Option<String>,
}

impl Environment {
    /// Environment carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            project_key: None,
            variables: None,
            keys: None,
            groups: None,
            permissions: None,
            usage: None,
            from_repository: None,
        }
    }

    /// Attach the owning project
    #[must_use]
    pub fn with_project(mut self, key: ProjectKey) -> Self {
        self.project_key = Some(key);
        self
    }
}

impl Entity for Environment {
    const KIND: EntityKind = EntityKind::Environment;

    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    fn project_key(&self) -> Option<&ProjectKey> {
        self.project_key.as_ref()
    }

    fn hydrated_in(project: &mut Project) -> &mut Option<Vec<Self>> {
        &mut project.environments
    }

    fn summary(&self) -> IdName {
        IdName {
            id: self.id,
            name: self.name.clone(),
            ..IdName::default()
        }
    }

    fn from_repository(&self) -> bool {
        self.from_repository.as_deref().is_some_and(|r| !r.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_carries_id_and_name() {
        let mut env = Environment::named("prod");
        env.id = Some(12);
        let summary = env.summary();
        assert_eq!(summary.id, Some(12));
        assert_eq!(summary.name, "prod");
        assert!(summary.description.is_none());
    }

    #[test]
    fn repository_flag() {
        let mut env = Environment::named("prod");
        assert!(!env.from_repository());
        env.from_repository = Some("https://git/repo.git".to_string());
        assert!(env.from_repository());
    }
}
