//! Application entity

use crate::common::{GroupPermission, Key, Permission, Usage, Variable};
use crate::entity::Entity;
use crate::kind::{EntityKind, ProjectKey};
use crate::project::Project;
use crate::summary::IdName;
use serde::{Deserialize, Serialize};

/// Replacement shown instead of a repository password
pub const MASKED_PASSWORD: &str = "**********";

/// How the CDS workers check out the application repository
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VcsStrategy {
    #[serde(default)]
    pub connection_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub branch: String,
}

/// Application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<ProjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Key>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_strategies: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs_strategy: Option<VcsStrategy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vulnerabilities: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl Application {
    /// Application carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            icon: None,
            project_key: None,
            variables: None,
            groups: None,
            permissions: None,
            usage: None,
            keys: None,
            deployment_strategies: None,
            vcs_server: None,
            repository_fullname: None,
            vcs_strategy: None,
            from_repository: None,
            notifications: None,
            vulnerabilities: None,
            metadata: None,
        }
    }

    /// Attach the owning project
    #[must_use]
    pub fn with_project(mut self, key: ProjectKey) -> Self {
        self.project_key = Some(key);
        self
    }

    /// Workflows using this application
    #[must_use]
    pub fn used_by_workflows(&self) -> Vec<String> {
        self.usage
            .as_ref()
            .and_then(|u| u.workflows.as_ref())
            .map(|wfs| wfs.iter().map(|w| w.name.clone()).collect())
            .unwrap_or_default()
    }
}

impl Entity for Application {
    const KIND: EntityKind = EntityKind::Application;

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
        &mut project.applications
    }

    fn summary(&self) -> IdName {
        IdName {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            labels: None,
        }
    }

    fn from_repository(&self) -> bool {
        self.from_repository.as_deref().is_some_and(|r| !r.is_empty())
    }

    fn sanitize(&mut self) {
        if let Some(strategy) = self.vcs_strategy.as_mut() {
            if strategy.password.as_deref().is_some_and(|p| !p.is_empty()) {
                strategy.password = Some(MASKED_PASSWORD.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn sanitize_masks_password() {
        let mut app = Application::named("app1");
        app.vcs_strategy = Some(VcsStrategy {
            password: Some("s3cret".to_string()),
            ..VcsStrategy::default()
        });
        app.sanitize();
        assert_eq!(
            app.vcs_strategy.unwrap().password.as_deref(),
            Some(MASKED_PASSWORD)
        );
    }

    #[test]
    fn merge_takes_response_fields_and_keeps_others() {
        let mut prior = Application::named("app1");
        prior.description = Some("old".to_string());
        prior.keys = Some(vec![Key {
            name: "app-key".to_string(),
            ..Key::default()
        }]);

        let mut response = Application::named("app1bis");
        response.project_key = Some(ProjectKey::new("test1").unwrap());

        let merged = Application::merge_response(&prior, response).unwrap();
        assert_eq!(merged.name, "app1bis");
        assert_eq!(merged.description.as_deref(), Some("old"));
        assert_eq!(merged.keys.as_ref().map(Vec::len), Some(1));
        assert_eq!(merged.project_key.unwrap().as_str(), "test1");
    }

    #[test]
    fn usage_lists_workflow_names() {
        let mut app = Application::named("app1");
        app.usage = Some(Usage {
            workflows: Some(vec![IdName::named("wf1"), IdName::named("wf2")]),
            ..Usage::default()
        });
        assert_eq!(app.used_by_workflows(), vec!["wf1", "wf2"]);
    }

    #[test]
    fn empty_repository_is_not_as_code() {
        let mut app = Application::named("app1");
        app.from_repository = Some(String::new());
        assert!(!app.from_repository());
    }
}
