//! Closed command surface of a session
//!
//! Child entities are addressed by a [`CacheKey`]; pipeline stages and jobs
//! and workflow nodes and hooks by [`SyntheticRef`].

#![allow(missing_docs)]

use crate::executor::Applied;
use cds_cache::CacheKey;
use cds_model::{
    Application, Environment, GroupPermission, Job, Key, Label, LoadOpt, Parameter, Pipeline,
    Project, ProjectIntegration, ProjectKey, Stage, Variable, WNode, WNodeHook, WNodeTrigger,
    Workflow, WorkflowNotification,
};
use cds_overlay::SyntheticRef;
use std::sync::Arc;

/// Any command a session dispatches
#[derive(Debug, Clone)]
pub enum Command {
    Project(ProjectCommand),
    Application(ApplicationCommand),
    Pipeline(PipelineCommand),
    Workflow(WorkflowCommand),
    Environment(EnvironmentCommand),
}

/// Project commands
#[derive(Debug, Clone)]
pub enum ProjectCommand {
    /// Load a project, switching the session to it
    Fetch { key: ProjectKey, opts: Vec<LoadOpt> },
    Resync { key: ProjectKey, opts: Vec<LoadOpt> },
    Add(Project),
    Update(Project),
    Delete(ProjectKey),
    ToggleFavorite(ProjectKey),
    SaveLabels { key: ProjectKey, labels: Vec<Label> },
    AddLabel { key: ProjectKey, label: Label },
    DeleteLabel { key: ProjectKey, label_id: i64 },
    AddVariable { key: ProjectKey, variable: Variable },
    UpdateVariable { key: ProjectKey, name: String, variable: Variable },
    DeleteVariable { key: ProjectKey, name: String },
    AddGroup { key: ProjectKey, group: GroupPermission },
    UpdateGroup { key: ProjectKey, group: GroupPermission },
    DeleteGroup { key: ProjectKey, group: String },
    AddKey { key: ProjectKey, project_key: Key },
    DeleteKey { key: ProjectKey, name: String },
    ExternalChange(ProjectKey),
    DeleteFromCache(ProjectKey),
}

/// Application commands
#[derive(Debug, Clone)]
pub enum ApplicationCommand {
    Fetch(CacheKey),
    Resync(CacheKey),
    Add { project: ProjectKey, application: Application },
    Clone { project: ProjectKey, source: String, application: Application },
    /// Update own fields; a different name renames
    Update { target: CacheKey, changes: Application },
    Delete(CacheKey),
    AddVariable { target: CacheKey, variable: Variable },
    UpdateVariable { target: CacheKey, var_name: String, variable: Variable },
    DeleteVariable { target: CacheKey, var_name: String },
    AddKey { target: CacheKey, key: Key },
    DeleteKey { target: CacheKey, key_name: String },
    SaveDeployment { target: CacheKey, integration: String, config: serde_json::Value },
    DeleteDeployment { target: CacheKey, integration: String },
    AttachRepository { target: CacheKey, repo_manager: String, repo_fullname: String },
    DetachRepository { target: CacheKey, repo_manager: String },
    ExternalChange(CacheKey),
    DeleteFromCache(CacheKey),
    ClearCache,
}

/// Pipeline commands
#[derive(Debug, Clone)]
pub enum PipelineCommand {
    Fetch(CacheKey),
    Resync(CacheKey),
    Add { project: ProjectKey, pipeline: Pipeline },
    Update { target: CacheKey, changes: Pipeline },
    Delete(CacheKey),
    AddParameter { target: CacheKey, parameter: Parameter },
    UpdateParameter { target: CacheKey, param_name: String, parameter: Parameter },
    DeleteParameter { target: CacheKey, param_name: String },
    AddStage { target: CacheKey, stage: Stage },
    UpdateStage { target: CacheKey, stage_ref: SyntheticRef, stage: Stage },
    DeleteStage { target: CacheKey, stage_ref: SyntheticRef },
    /// Move a stage to a 1-based build order
    MoveStage { target: CacheKey, stage_ref: SyntheticRef, build_order: usize },
    AddJob { target: CacheKey, stage_ref: SyntheticRef, job: Job },
    UpdateJob { target: CacheKey, job_ref: SyntheticRef, job: Job },
    DeleteJob { target: CacheKey, job_ref: SyntheticRef },
    CancelEdits(CacheKey),
    ExternalChange(CacheKey),
    DeleteFromCache(CacheKey),
    ClearCache,
}

/// Workflow commands
#[derive(Debug, Clone)]
pub enum WorkflowCommand {
    Fetch(CacheKey),
    Resync(CacheKey),
    Add { project: ProjectKey, workflow: Workflow },
    Update { target: CacheKey, changes: Workflow },
    Delete(CacheKey),
    SetIcon { target: CacheKey, icon: String },
    DeleteIcon(CacheKey),
    AddGroup { target: CacheKey, group: GroupPermission },
    UpdateGroup { target: CacheKey, group: GroupPermission },
    DeleteGroup { target: CacheKey, group: String },
    AddNotification { target: CacheKey, notification: WorkflowNotification },
    UpdateNotification { target: CacheKey, id: i64, notification: WorkflowNotification },
    DeleteNotification { target: CacheKey, id: i64 },
    SetEventIntegrations { target: CacheKey, integrations: Vec<ProjectIntegration> },
    DeleteEventIntegration { target: CacheKey, integration_id: i64 },
    AddTrigger { target: CacheKey, parent: SyntheticRef, trigger: WNodeTrigger },
    AddJoin { target: CacheKey, parents: Vec<SyntheticRef>, join: WNode },
    UpdateNode { target: CacheKey, node_ref: SyntheticRef, node: WNode },
    DeleteNode { target: CacheKey, node_ref: SyntheticRef },
    AddHook { target: CacheKey, node_ref: SyntheticRef, hook: WNodeHook },
    UpdateHook { target: CacheKey, hook_ref: SyntheticRef, hook: WNodeHook },
    DeleteHook { target: CacheKey, hook_ref: SyntheticRef },
    FetchAudits(CacheKey),
    Rollback { target: CacheKey, audit_id: i64 },
    FetchAsCode(CacheKey),
    /// Import YAML; with a name the existing workflow is overwritten
    Import { project: ProjectKey, name: Option<String>, code: String },
    Preview { target: CacheKey, code: String },
    ToggleFavorite(CacheKey),
    CancelEdits(CacheKey),
    ExternalChange(CacheKey),
    DeleteFromCache(CacheKey),
    ClearCache,
}

/// Environment commands
#[derive(Debug, Clone)]
pub enum EnvironmentCommand {
    Fetch(CacheKey),
    Resync(CacheKey),
    Add { project: ProjectKey, environment: Environment },
    Clone { project: ProjectKey, source: String, environment: Environment },
    Update { target: CacheKey, changes: Environment },
    Delete(CacheKey),
    AddVariable { target: CacheKey, variable: Variable },
    UpdateVariable { target: CacheKey, var_name: String, variable: Variable },
    DeleteVariable { target: CacheKey, var_name: String },
    AddKey { target: CacheKey, key: Key },
    DeleteKey { target: CacheKey, key_name: String },
    CancelEdits(CacheKey),
    ExternalChange(CacheKey),
    DeleteFromCache(CacheKey),
    ClearCache,
}

macro_rules! impl_from_command {
    ($($variant:ident($inner:ty)),* $(,)?) => {
        $(
            impl From<$inner> for Command {
                fn from(command: $inner) -> Self {
                    Command::$variant(command)
                }
            }
        )*
    };
}

impl_from_command!(
    Project(ProjectCommand),
    Application(ApplicationCommand),
    Pipeline(PipelineCommand),
    Workflow(WorkflowCommand),
    Environment(EnvironmentCommand),
);

/// Result of a dispatched command
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Project now loaded
    Project(Arc<Project>),
    Application(Applied<Application>),
    Pipeline(Applied<Pipeline>),
    Workflow(Applied<Workflow>),
    Environment(Applied<Environment>),
    /// Messages returned by an import
    Messages(Vec<String>),
    /// Whether a cache-only command found its target
    Flag(bool),
    Done,
}

impl Outcome {
    /// Whether the command stayed in an edit overlay
    #[must_use]
    pub fn is_local(&self) -> bool {
        match self {
            Self::Application(a) => a.is_local(),
            Self::Pipeline(a) => a.is_local(),
            Self::Workflow(a) => a.is_local(),
            Self::Environment(a) => a.is_local(),
            _ => false,
        }
    }
}

macro_rules! impl_from_applied {
    ($($variant:ident($entity:ty)),* $(,)?) => {
        $(
            impl From<Applied<$entity>> for Outcome {
                fn from(applied: Applied<$entity>) -> Self {
                    Outcome::$variant(applied)
                }
            }

            impl From<Arc<$entity>> for Outcome {
                fn from(value: Arc<$entity>) -> Self {
                    Outcome::$variant(Applied::Remote(value))
                }
            }
        )*
    };
}

impl_from_applied!(
    Application(Application),
    Pipeline(Pipeline),
    Workflow(Workflow),
    Environment(Environment),
);

impl From<Arc<Project>> for Outcome {
    fn from(project: Arc<Project>) -> Self {
        Outcome::Project(project)
    }
}

impl From<bool> for Outcome {
    fn from(found: bool) -> Self {
        Outcome::Flag(found)
    }
}

impl From<()> for Outcome {
    fn from((): ()) -> Self {
        Outcome::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_convert_into_command() {
        let key = CacheKey::new(ProjectKey::new("test1").unwrap(), "app1");
        let command: Command = ApplicationCommand::Delete(key).into();
        assert!(matches!(command, Command::Application(ApplicationCommand::Delete(_))));
    }

    #[test]
    fn local_outcomes() {
        assert!(Outcome::from(Applied::<Workflow>::Local).is_local());
        assert!(!Outcome::from(Arc::new(Workflow::named("wf"))).is_local());
        assert!(!Outcome::Done.is_local());
    }
}
