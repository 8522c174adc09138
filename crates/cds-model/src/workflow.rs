//! Workflow entity and its node graph
//!
//! - A workflow owns a root [`WNode`] and a list of join nodes
//! - Nodes trigger child nodes; joins wait for several parents
//! - Hooks hang off nodes and are identified by a server uuid

use crate::common::{AsCodeEvent, Audit, GroupPermission, Permission, ProjectIntegration, Usage};
use crate::entity::{overlay_response, Entity};
use crate::error::ModelError;
use crate::kind::{EntityKind, ProjectKey};
use crate::project::Project;
use crate::pipeline::Parameter;
use crate::summary::{IdName, Label};
use serde::{Deserialize, Serialize};

/// Kind of workflow node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Pipeline,
    Join,
    Fork,
    #[serde(rename = "outgoinghook")]
    OutgoingHook,
}

/// Execution context of a pipeline node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_integration_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_payload: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_pipeline_parameters: Option<Vec<Parameter>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<serde_json::Value>,
    #[serde(default)]
    pub mutex: bool,
}

/// Edge from a node to one of its children
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WNodeTrigger {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_node_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_name: Option<String>,
    pub child_node: WNode,
}

/// Parent of a join node
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WNodeJoinParent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

/// Hook attached to a node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WNodeHook {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hook_model_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Value>,
}

/// Workflow node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub ref_id: Option<String>,
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<NodeContext>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub triggers: Vec<WNodeTrigger>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<WNodeJoinParent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hooks: Vec<WNodeHook>,
}

impl WNode {
    /// Pipeline node with a name
    #[must_use]
    pub fn pipeline(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// This node and every descendant reached through triggers
    pub fn walk<'a>(&'a self, out: &mut Vec<&'a WNode>) {
        out.push(self);
        for trigger in &self.triggers {
            trigger.child_node.walk(out);
        }
    }

    fn walk_mut(&mut self, f: &mut impl FnMut(&mut WNode)) {
        f(self);
        for trigger in &mut self.triggers {
            trigger.child_node.walk_mut(f);
        }
    }
}

/// Node graph of a workflow
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowData {
    pub node: WNode,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joins: Vec<WNode>,
}

/// Notification sent on node completion
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowNotification {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_node_ref: Vec<String>,
    #[serde(rename = "type", default)]
    pub notification_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<serde_json::Value>,
}

/// Workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_key: Option<ProjectKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<GroupPermission>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permission>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purge_tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notifications: Option<Vec<WorkflowNotification>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_integrations: Option<Vec<ProjectIntegration>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_repository: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_up_to_date: Option<bool>,
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_data: Option<WorkflowData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_code_events: Option<Vec<AsCodeEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<Box<Workflow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audits: Option<Vec<Audit>>,
    /// YAML export, held locally after an as-code fetch
    #[serde(skip)]
    pub as_code: Option<String>,
}

impl Workflow {
    /// Workflow carrying only a name
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: None,
            icon: None,
            project_id: None,
            project_key: None,
            last_modified: None,
            groups: None,
            permissions: None,
            usage: None,
            history_length: None,
            purge_tags: None,
            notifications: None,
            event_integrations: None,
            from_repository: None,
            from_template: None,
            template_up_to_date: None,
            favorite: false,
            labels: None,
            workflow_data: None,
            as_code_events: None,
            preview: None,
            audits: None,
            as_code: None,
        }
    }

    /// Attach the owning project
    #[must_use]
    pub fn with_project(mut self, key: ProjectKey) -> Self {
        self.project_key = Some(key);
        self
    }

    /// Attach a node graph
    #[must_use]
    pub fn with_data(mut self, data: WorkflowData) -> Self {
        self.workflow_data = Some(data);
        self
    }

    /// Every node of the graph, root tree first, then join trees
    #[must_use]
    pub fn all_nodes(&self) -> Vec<&WNode> {
        let mut nodes = Vec::new();
        if let Some(data) = &self.workflow_data {
            data.node.walk(&mut nodes);
            for join in &data.joins {
                join.walk(&mut nodes);
            }
        }
        nodes
    }

    /// Give every hook a reference equal to its uuid
    pub fn assign_hook_refs(&mut self) {
        let Some(data) = self.workflow_data.as_mut() else {
            return;
        };
        let mut assign = |node: &mut WNode| {
            for hook in &mut node.hooks {
                if let Some(uuid) = &hook.uuid {
                    hook.ref_id = Some(uuid.clone());
                }
            }
        };
        data.node.walk_mut(&mut assign);
        for join in &mut data.joins {
            join.walk_mut(&mut assign);
        }
    }
}

impl Entity for Workflow {
    const KIND: EntityKind = EntityKind::Workflow;

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
        &mut project.workflows
    }

    fn summary(&self) -> IdName {
        IdName {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            icon: self.icon.clone(),
            labels: self.labels.clone(),
        }
    }

    fn from_repository(&self) -> bool {
        self.from_repository.as_deref().is_some_and(|r| !r.is_empty())
    }

    fn preserve_session_fields(&mut self, prior: &Self) {
        self.audits.clone_from(&prior.audits);
        self.from_template.clone_from(&prior.from_template);
        self.template_up_to_date = prior.template_up_to_date;
        self.as_code_events.clone_from(&prior.as_code_events);
        self.as_code.clone_from(&prior.as_code);
        self.preview = None;
    }

    fn sanitize(&mut self) {
        if self.notifications.is_none() {
            self.notifications = Some(Vec::new());
        }
        self.assign_hook_refs();
    }

    /// A response without notifications means the workflow has none left
    fn merge_response(prior: &Self, mut response: Self) -> Result<Self, ModelError> {
        response.notifications.get_or_insert_with(Vec::new);
        let mut merged = overlay_response(Self::KIND.as_str(), prior, &response)?;
        merged.preserve_session_fields(prior);
        merged.sanitize();
        Ok(merged)
    }
}
