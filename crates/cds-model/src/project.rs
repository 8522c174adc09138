//! Project entity and its load options

use crate::application::Application;
use crate::common::{GroupPermission, Key, Permission, ProjectIntegration, Variable};
use crate::environment::Environment;
use crate::kind::{EntityKind, ProjectKey};
use crate::pipeline::Pipeline;
use crate::summary::{IdName, Label};
use crate::workflow::Workflow;
use serde::{Deserialize, Serialize};

/// Top-level scope owning every other entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub key: ProjectKey,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub favorite: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_names: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_names: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_names: Option<Vec<IdName>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_names: Option<Vec<IdName>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applications: Option<Vec<Application>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipelines: Option<Vec<Pipeline>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflows: Option<Vec<Workflow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environments: Option<Vec<Environment>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<Variable>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<Vec<Key>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<ProjectIntegration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
}

impl Project {
    /// Empty project with a key and display name
    #[must_use]
    pub fn new(key: ProjectKey, name: impl Into<String>) -> Self {
        Self {
            id: None,
            key,
            name: name.into(),
            description: None,
            favorite: false,
            application_names: None,
            pipeline_names: None,
            workflow_names: None,
            environment_names: None,
            applications: None,
            pipelines: None,
            workflows: None,
            environments: None,
            variables: None,
            groups: None,
            keys: None,
            labels: None,
            integrations: None,
            features: None,
            permissions: None,
        }
    }

    /// Name index for a child kind
    #[must_use]
    pub fn names(&self, kind: EntityKind) -> Option<&Vec<IdName>> {
        match kind {
            EntityKind::Application => self.application_names.as_ref(),
            EntityKind::Pipeline => self.pipeline_names.as_ref(),
            EntityKind::Workflow => self.workflow_names.as_ref(),
            EntityKind::Environment => self.environment_names.as_ref(),
        }
    }

    /// Mutable name index for a child kind, created empty when absent
    pub fn names_mut(&mut self, kind: EntityKind) -> &mut Vec<IdName> {
        let slot = match kind {
            EntityKind::Application => &mut self.application_names,
            EntityKind::Pipeline => &mut self.pipeline_names,
            EntityKind::Workflow => &mut self.workflow_names,
            EntityKind::Environment => &mut self.environment_names,
        };
        slot.get_or_insert_with(Vec::new)
    }

    /// Whether the field backing a load option is present
    #[must_use]
    pub fn has_field(&self, opt: LoadOpt) -> bool {
        match opt {
            LoadOpt::Applications => self.applications.is_some(),
            LoadOpt::ApplicationNames => self.application_names.is_some(),
            LoadOpt::Pipelines => self.pipelines.is_some(),
            LoadOpt::PipelineNames => self.pipeline_names.is_some(),
            LoadOpt::Workflows => self.workflows.is_some(),
            LoadOpt::WorkflowNames => self.workflow_names.is_some(),
            LoadOpt::Environments => self.environments.is_some(),
            LoadOpt::EnvironmentNames => self.environment_names.is_some(),
            LoadOpt::Variables => self.variables.is_some(),
            LoadOpt::Groups => self.groups.is_some(),
            LoadOpt::Keys => self.keys.is_some(),
            LoadOpt::Labels => self.labels.is_some(),
            LoadOpt::Integrations => self.integrations.is_some(),
            LoadOpt::Features => self.features.is_some(),
            LoadOpt::Permission => self.permissions.is_some(),
        }
    }

    /// Fill the field backing a list option with an empty value when absent
    ///
    /// The server omits empty lists, so a project loaded with an option must
    /// still report that option as satisfied.
    pub fn ensure_field(&mut self, opt: LoadOpt) {
        match opt {
            LoadOpt::Applications => {
                self.applications.get_or_insert_with(Vec::new);
            }
            LoadOpt::ApplicationNames
            | LoadOpt::PipelineNames
            | LoadOpt::WorkflowNames
            | LoadOpt::EnvironmentNames => {
                if let Some(kind) = opt.index_kind() {
                    self.names_mut(kind);
                }
            }
            LoadOpt::Pipelines => {
                self.pipelines.get_or_insert_with(Vec::new);
            }
            LoadOpt::Workflows => {
                self.workflows.get_or_insert_with(Vec::new);
            }
            LoadOpt::Environments => {
                self.environments.get_or_insert_with(Vec::new);
            }
            LoadOpt::Variables => {
                self.variables.get_or_insert_with(Vec::new);
            }
            LoadOpt::Groups => {
                self.groups.get_or_insert_with(Vec::new);
            }
            LoadOpt::Keys => {
                self.keys.get_or_insert_with(Vec::new);
            }
            LoadOpt::Labels => {
                self.labels.get_or_insert_with(Vec::new);
            }
            LoadOpt::Integrations => {
                self.integrations.get_or_insert_with(Vec::new);
            }
            LoadOpt::Features => {
                self.features.get_or_insert_with(serde_json::Map::new);
            }
            LoadOpt::Permission => {}
        }
    }
}

/// Expansion flag for `GET /project/{key}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadOpt {
    Applications,
    ApplicationNames,
    Pipelines,
    PipelineNames,
    Workflows,
    WorkflowNames,
    Environments,
    EnvironmentNames,
    Variables,
    Groups,
    Keys,
    Labels,
    Integrations,
    Features,
    Permission,
}

impl LoadOpt {
    /// Options always requested on resync
    pub const ALWAYS: [LoadOpt; 4] = [
        LoadOpt::Groups,
        LoadOpt::Permission,
        LoadOpt::Features,
        LoadOpt::Integrations,
    ];

    /// Every option
    pub const ALL: [LoadOpt; 15] = [
        LoadOpt::Applications,
        LoadOpt::ApplicationNames,
        LoadOpt::Pipelines,
        LoadOpt::PipelineNames,
        LoadOpt::Workflows,
        LoadOpt::WorkflowNames,
        LoadOpt::Environments,
        LoadOpt::EnvironmentNames,
        LoadOpt::Variables,
        LoadOpt::Groups,
        LoadOpt::Keys,
        LoadOpt::Labels,
        LoadOpt::Integrations,
        LoadOpt::Features,
        LoadOpt::Permission,
    ];

    /// Query parameter understood by the API
    #[must_use]
    pub fn query_param(&self) -> &'static str {
        match self {
            LoadOpt::Applications => "withApplications",
            LoadOpt::ApplicationNames => "withApplicationNames",
            LoadOpt::Pipelines => "withPipelines",
            LoadOpt::PipelineNames => "withPipelineNames",
            LoadOpt::Workflows => "withWorkflows",
            LoadOpt::WorkflowNames => "withWorkflowNames",
            LoadOpt::Environments => "withEnvironments",
            LoadOpt::EnvironmentNames => "withEnvironmentNames",
            LoadOpt::Variables => "withVariables",
            LoadOpt::Groups => "withGroups",
            LoadOpt::Keys => "withKeys",
            LoadOpt::Labels => "withLabels",
            LoadOpt::Integrations => "withIntegrations",
            LoadOpt::Features => "withFeatures",
            LoadOpt::Permission => "withPermission",
        }
    }

    /// Field name of the project filled by this option
    #[must_use]
    pub fn field(&self) -> &'static str {
        match self {
            LoadOpt::Applications => "applications",
            LoadOpt::ApplicationNames => "application_names",
            LoadOpt::Pipelines => "pipelines",
            LoadOpt::PipelineNames => "pipeline_names",
            LoadOpt::Workflows => "workflows",
            LoadOpt::WorkflowNames => "workflow_names",
            LoadOpt::Environments => "environments",
            LoadOpt::EnvironmentNames => "environment_names",
            LoadOpt::Variables => "variables",
            LoadOpt::Groups => "groups",
            LoadOpt::Keys => "keys",
            LoadOpt::Labels => "labels",
            LoadOpt::Integrations => "integrations",
            LoadOpt::Features => "features",
            LoadOpt::Permission => "permissions",
        }
    }

    /// Child kind whose name index this option loads
    #[must_use]
    pub fn index_kind(&self) -> Option<EntityKind> {
        match self {
            LoadOpt::ApplicationNames => Some(EntityKind::Application),
            LoadOpt::PipelineNames => Some(EntityKind::Pipeline),
            LoadOpt::WorkflowNames => Some(EntityKind::Workflow),
            LoadOpt::EnvironmentNames => Some(EntityKind::Environment),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> Project {
        Project::new(ProjectKey::new("test1").unwrap(), "Test 1")
    }

    #[test]
    fn ensure_field_satisfies_option() {
        let mut proj = project();
        assert!(!proj.has_field(LoadOpt::WorkflowNames));
        proj.ensure_field(LoadOpt::WorkflowNames);
        assert!(proj.has_field(LoadOpt::WorkflowNames));
        assert_eq!(proj.workflow_names, Some(vec![]));
    }

    #[test]
    fn ensure_field_keeps_existing_values() {
        let mut proj = project();
        proj.labels = Some(vec![Label::new(1, "prod", "#fff")]);
        proj.ensure_field(LoadOpt::Labels);
        assert_eq!(proj.labels.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn names_mut_creates_index() {
        let mut proj = project();
        proj.names_mut(EntityKind::Application).push(IdName::named("app1"));
        assert_eq!(proj.names(EntityKind::Application).unwrap()[0].name, "app1");
        assert!(proj.names(EntityKind::Pipeline).is_none());
    }

    #[test]
    fn query_params_are_distinct() {
        let opts = LoadOpt::ALL;
        let mut params: Vec<_> = opts.iter().map(LoadOpt::query_param).collect();
        params.sort_unstable();
        params.dedup();
        assert_eq!(params.len(), opts.len());
    }

    #[test]
    fn decode_minimal_project() {
        let proj: Project = serde_json::from_str(r#"{"key":"test1","name":"Test 1"}"#).unwrap();
        assert_eq!(proj.key.as_str(), "test1");
        assert!(proj.application_names.is_none());
    }
}
