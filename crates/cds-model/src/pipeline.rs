//! Pipeline entity: ordered stages of jobs, plus parameters

use crate::common::{GroupPermission, Permission, Usage};
use crate::entity::Entity;
use crate::kind::{EntityKind, ProjectKey};
use crate::project::Project;
use crate::summary::IdName;
use serde::{Deserialize, Serialize};

/// Pipeline parameter
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub param_type: String,
    #[serde(default)]
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Parameter {
    /// String parameter
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            param_type: "string".to_string(),
            value: value.into(),
            description: None,
        }
    }
}

/// Action run by a job
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requirements: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<serde_json::Value>>,
}

fn enabled() -> bool {
    true
}

/// Job inside a stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Job {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_action_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_stage_id: Option<i64>,
    #[serde(default = "enabled")]
    pub enabled: bool,
    pub action: Action,
}

impl Job {
    /// Enabled job running an action of that name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            pipeline_action_id: None,
            pipeline_stage_id: None,
            enabled: true,
            action: Action {
                name: name.into(),
                enabled: true,
                ..Action::default()
            },
        }
    }
}

/// Pipeline stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Stage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default)]
    pub build_order: i32,
    #[serde(default = "enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<Vec<Job>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<serde_json::Value>,
}

impl Stage {
    /// Enabled stage without jobs
    #[must_use]
    pub fn named(name: impl Into<String>, build_order: i32) -> Self {
        Self {
            id: None,
            name: name.into(),
            build_order,
            enabled: true,
            jobs: None,
            conditions: None,
        }
    }
}

/// Pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
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
    pub parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stages: Option<Vec<Stage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audits: Option<Vec<serde_json::Value>>,
}

impl Pipeline {
    /// Pipeline carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            icon: None,
            project_key: None,
            parameters: None,
            stages: None,
            groups: None,
            permissions: None,
            usage: None,
            from_repository: None,
            audits: None,
        }
    }

    /// Attach the owning project
    #[must_use]
    pub fn with_project(mut self, key: ProjectKey) -> Self {
        self.project_key = Some(key);
        self
    }
}

impl Entity for Pipeline {
    const KIND: EntityKind = EntityKind::Pipeline;

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
        &mut project.pipelines
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

    fn preserve_session_fields(&mut self, prior: &Self) {
        if self.audits.is_none() {
            self.audits.clone_from(&prior.audits);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_stage_with_jobs() {
        let json = r#"{
            "name": "build",
            "stages": [{"id": 4, "name": "Compile", "build_order": 1,
                        "jobs": [{"pipeline_action_id": 9, "action": {"name": "make"}}]}]
        }"#;
        let pip: Pipeline = serde_json::from_str(json).unwrap();
        let stage = &pip.stages.as_ref().unwrap()[0];
        assert!(stage.enabled);
        let job = &stage.jobs.as_ref().unwrap()[0];
        assert_eq!(job.action.name, "make");
        assert!(job.enabled);
    }

    #[test]
    fn merge_keeps_stages_when_response_omits_them() {
        let mut prior = Pipeline::named("build");
        prior.stages = Some(vec![Stage::named("Compile", 1)]);
        let response = Pipeline::named("build2");

        let merged = Pipeline::merge_response(&prior, response).unwrap();
        assert_eq!(merged.name, "build2");
        assert_eq!(merged.stages.map(|s| s.len()), Some(1));
    }
}
