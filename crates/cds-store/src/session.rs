//! Console session: every store of one user session

use crate::command::{
    ApplicationCommand, Command, EnvironmentCommand, Outcome, PipelineCommand, ProjectCommand,
    WorkflowCommand,
};
use crate::config::SessionConfig;
use crate::error::StoreResult;
use crate::events::{EventTarget, ExternalEvent};
use crate::projection::ProjectionUpdater;
use crate::stores::{ApplicationsStore, EnvironmentsStore, PipelinesStore, ProjectStore, WorkflowsStore};
use cds_api::CdsClient;
use cds_cache::EntityCache;
use cds_model::{Application, Entity, EntityKind, Environment, LoadOpt, Pipeline, Project, ProjectKey, Workflow};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Stores of one console session
///
/// Constructed explicitly, torn down with [`Session::teardown`]. Only the
/// stores write to the caches; callers read snapshots.
#[derive(Debug)]
pub struct Session {
    config: SessionConfig,
    project: ProjectStore,
    applications: ApplicationsStore,
    pipelines: PipelinesStore,
    workflows: WorkflowsStore,
    environments: EnvironmentsStore,
}

impl Session {
    /// Create session over a client
    #[must_use]
    pub fn new(client: CdsClient, config: SessionConfig) -> Self {
        let project = ProjectStore::new(client.clone());
        let projections = ProjectionUpdater::new(project.slot());
        let workflow_cache = Arc::new(EntityCache::new());
        let edit = config.edit_repository_entities;

        Self {
            applications: ApplicationsStore::new(
                client.clone(),
                Arc::new(EntityCache::new()),
                Arc::clone(&workflow_cache),
                projections.clone(),
            ),
            pipelines: PipelinesStore::new(client.clone(), Arc::new(EntityCache::new()), projections.clone(), edit),
            workflows: WorkflowsStore::new(client.clone(), workflow_cache, projections.clone(), edit),
            environments: EnvironmentsStore::new(client, Arc::new(EntityCache::new()), projections, edit),
            project,
            config,
        }
    }

    /// Create session talking HTTP to the configured API
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn from_config(config: SessionConfig) -> StoreResult<Self> {
        let client = CdsClient::from_config(&config.api)?;
        Ok(Self::new(client, config))
    }

    /// Session configuration
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Project store
    #[must_use]
    pub fn projects(&self) -> &ProjectStore {
        &self.project
    }

    /// Application store
    #[must_use]
    pub fn applications(&self) -> &ApplicationsStore {
        &self.applications
    }

    /// Pipeline store
    #[must_use]
    pub fn pipelines(&self) -> &PipelinesStore {
        &self.pipelines
    }

    /// Workflow store
    #[must_use]
    pub fn workflows(&self) -> &WorkflowsStore {
        &self.workflows
    }

    /// Environment store
    #[must_use]
    pub fn environments(&self) -> &EnvironmentsStore {
        &self.environments
    }

    /// Loaded project
    #[must_use]
    pub fn project(&self) -> Option<Arc<Project>> {
        self.project.current()
    }

    /// Cached application
    #[must_use]
    pub fn application(&self, project: &ProjectKey, name: &str) -> Option<Arc<Application>> {
        self.applications.get(project, name)
    }

    /// Cached pipeline
    #[must_use]
    pub fn pipeline(&self, project: &ProjectKey, name: &str) -> Option<Arc<Pipeline>> {
        self.pipelines.get(project, name)
    }

    /// Cached workflow
    #[must_use]
    pub fn workflow(&self, project: &ProjectKey, name: &str) -> Option<Arc<Workflow>> {
        self.workflows.get(project, name)
    }

    /// Cached environment
    #[must_use]
    pub fn environment(&self, project: &ProjectKey, name: &str) -> Option<Arc<Environment>> {
        self.environments.get(project, name)
    }

    /// Make `key` the loaded project
    ///
    /// Entities and overlays of the previous project are dropped first.
    ///
    /// # Errors
    /// Returns the API error of the project fetch
    pub async fn switch_project(&self, key: &ProjectKey, opts: &[LoadOpt]) -> StoreResult<Arc<Project>> {
        if let Some(previous) = self.project.current().filter(|p| &p.key != key) {
            tracing::info!(from = %previous.key, to = %key, "switching project");
            self.pipelines.overlays().discard_scope(&previous.key);
            self.workflows.overlays().discard_scope(&previous.key);
            self.environments.overlays().discard_scope(&previous.key);
        }
        self.applications.cache().enter_scope(key);
        self.pipelines.cache().enter_scope(key);
        self.workflows.cache().enter_scope(key);
        self.environments.cache().enter_scope(key);
        self.project.fetch(key, opts).await
    }

    /// Fetch every child entity listed in the project's name indexes
    ///
    /// Fetches run concurrently. Returns the number of entities cached.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::ProjectNotLoaded`], or the first API error
    pub async fn hydrate(&self, key: &ProjectKey) -> StoreResult<usize> {
        let project = self
            .project
            .loaded(key)
            .ok_or_else(|| crate::StoreError::ProjectNotLoaded(key.clone()))?;
        let names = |kind: EntityKind| -> Vec<String> {
            project
                .names(kind)
                .map(|list| list.iter().map(|n| n.name.clone()).collect())
                .unwrap_or_default()
        };

        let apps = names(EntityKind::Application);
        let pips = names(EntityKind::Pipeline);
        let wfs = names(EntityKind::Workflow);
        let envs = names(EntityKind::Environment);
        let (apps, pips, wfs, envs) = futures::try_join!(
            futures::future::try_join_all(apps.iter().map(|n| self.applications.fetch(key, n))),
            futures::future::try_join_all(pips.iter().map(|n| self.pipelines.fetch(key, n))),
            futures::future::try_join_all(wfs.iter().map(|n| self.workflows.fetch(key, n))),
            futures::future::try_join_all(envs.iter().map(|n| self.environments.fetch(key, n))),
        )?;
        let count = apps.len() + pips.len() + wfs.len() + envs.len();
        tracing::debug!(project = %key, count, "project hydrated");
        Ok(count)
    }

    /// Drop every cached entity, overlay and the loaded project
    pub fn teardown(&self) {
        self.applications.clear();
        self.pipelines.clear();
        self.workflows.clear();
        self.environments.clear();
        self.project.clear();
        tracing::info!("session torn down");
    }

    /// Run one command
    ///
    /// # Errors
    /// Returns the error of the command; overlay desyncs are logged at
    /// `error`, other failures at `debug`
    pub async fn dispatch(&self, command: impl Into<Command>) -> StoreResult<Outcome> {
        let command = command.into();
        let result = match command {
            Command::Project(c) => self.dispatch_project(c).await,
            Command::Application(c) => self.dispatch_application(c).await,
            Command::Pipeline(c) => self.dispatch_pipeline(c).await,
            Command::Workflow(c) => self.dispatch_workflow(c).await,
            Command::Environment(c) => self.dispatch_environment(c).await,
        };
        if let Err(e) = &result {
            if e.is_desync() {
                tracing::error!(error = %e, "overlay reference desync");
            } else {
                tracing::debug!(error = %e, "command failed");
            }
        }
        result
    }

    async fn dispatch_project(&self, command: ProjectCommand) -> StoreResult<Outcome> {
        let store = &self.project;
        Ok(match command {
            ProjectCommand::Fetch { key, opts } => self.switch_project(&key, &opts).await?.into(),
            ProjectCommand::Resync { key, opts } => store.resync(&key, &opts).await?.into(),
            ProjectCommand::Add(project) => store.add(&project).await?.into(),
            ProjectCommand::Update(project) => store.update(&project).await?.into(),
            ProjectCommand::Delete(key) => {
                store.delete(&key).await?;
                self.applications.cache().evict_scope(&key);
                self.pipelines.cache().evict_scope(&key);
                self.workflows.cache().evict_scope(&key);
                self.environments.cache().evict_scope(&key);
                Outcome::Done
            }
            ProjectCommand::ToggleFavorite(key) => store.toggle_favorite(&key).await?.into(),
            ProjectCommand::SaveLabels { key, labels } => store.save_labels(&key, &labels).await?.into(),
            ProjectCommand::AddLabel { key, label } => store.add_label(&key, &label).await?.into(),
            ProjectCommand::DeleteLabel { key, label_id } => store.delete_label(&key, label_id).await?.into(),
            ProjectCommand::AddVariable { key, variable } => store.add_variable(&key, &variable).await?.into(),
            ProjectCommand::UpdateVariable { key, name, variable } => {
                store.update_variable(&key, &name, &variable).await?.into()
            }
            ProjectCommand::DeleteVariable { key, name } => store.delete_variable(&key, &name).await?.into(),
            ProjectCommand::AddGroup { key, group } => store.add_group(&key, &group).await?.into(),
            ProjectCommand::UpdateGroup { key, group } => store.update_group(&key, &group).await?.into(),
            ProjectCommand::DeleteGroup { key, group } => store.delete_group(&key, &group).await?.into(),
            ProjectCommand::AddKey { key, project_key } => store.add_key(&key, &project_key).await?.into(),
            ProjectCommand::DeleteKey { key, name } => store.delete_key(&key, &name).await?.into(),
            ProjectCommand::ExternalChange(key) => store.external_change(&key).into(),
            ProjectCommand::DeleteFromCache(key) => store.delete_from_cache(&key).into(),
        })
    }

    async fn dispatch_application(&self, command: ApplicationCommand) -> StoreResult<Outcome> {
        let store = &self.applications;
        Ok(match command {
            ApplicationCommand::Fetch(t) => store.fetch(&t.project, &t.name).await?.into(),
            ApplicationCommand::Resync(t) => store.resync(&t.project, &t.name).await?.into(),
            ApplicationCommand::Add { project, application } => store.add(&project, &application).await?.into(),
            ApplicationCommand::Clone { project, source, application } => {
                store.clone_from(&project, &source, &application).await?.into()
            }
            ApplicationCommand::Update { target: t, changes } => store.update(&t.project, &t.name, &changes).await?.into(),
            ApplicationCommand::Delete(t) => store.delete(&t.project, &t.name).await?.into(),
            ApplicationCommand::AddVariable { target: t, variable } => {
                store.add_variable(&t.project, &t.name, &variable).await?.into()
            }
            ApplicationCommand::UpdateVariable { target: t, var_name, variable } => {
                store.update_variable(&t.project, &t.name, &var_name, &variable).await?.into()
            }
            ApplicationCommand::DeleteVariable { target: t, var_name } => {
                store.delete_variable(&t.project, &t.name, &var_name).await?.into()
            }
            ApplicationCommand::AddKey { target: t, key } => store.add_key(&t.project, &t.name, &key).await?.into(),
            ApplicationCommand::DeleteKey { target: t, key_name } => {
                store.delete_key(&t.project, &t.name, &key_name).await?.into()
            }
            ApplicationCommand::SaveDeployment { target: t, integration, config } => {
                store.save_deployment(&t.project, &t.name, &integration, &config).await?.into()
            }
            ApplicationCommand::DeleteDeployment { target: t, integration } => {
                store.delete_deployment(&t.project, &t.name, &integration).await?.into()
            }
            ApplicationCommand::AttachRepository { target: t, repo_manager, repo_fullname } => store
                .attach_repository(&t.project, &t.name, &repo_manager, &repo_fullname)
                .await?
                .into(),
            ApplicationCommand::DetachRepository { target: t, repo_manager } => {
                store.detach_repository(&t.project, &t.name, &repo_manager).await?.into()
            }
            ApplicationCommand::ExternalChange(t) => store.external_change(&t.project, &t.name).into(),
            ApplicationCommand::DeleteFromCache(t) => store.delete_from_cache(&t.project, &t.name).into(),
            ApplicationCommand::ClearCache => {
                store.clear();
                Outcome::Done
            }
        })
    }

    async fn dispatch_pipeline(&self, command: PipelineCommand) -> StoreResult<Outcome> {
        let store = &self.pipelines;
        Ok(match command {
            PipelineCommand::Fetch(t) => store.fetch(&t.project, &t.name).await?.into(),
            PipelineCommand::Resync(t) => store.resync(&t.project, &t.name).await?.into(),
            PipelineCommand::Add { project, pipeline } => store.add(&project, &pipeline).await?.into(),
            PipelineCommand::Update { target: t, changes } => store.update(&t.project, &t.name, &changes).await?.into(),
            PipelineCommand::Delete(t) => store.delete(&t.project, &t.name).await?.into(),
            PipelineCommand::AddParameter { target: t, parameter } => {
                store.add_parameter(&t.project, &t.name, &parameter).await?.into()
            }
            PipelineCommand::UpdateParameter { target: t, param_name, parameter } => {
                store.update_parameter(&t.project, &t.name, &param_name, &parameter).await?.into()
            }
            PipelineCommand::DeleteParameter { target: t, param_name } => {
                store.delete_parameter(&t.project, &t.name, &param_name).await?.into()
            }
            PipelineCommand::AddStage { target: t, stage } => store.add_stage(&t.project, &t.name, &stage).await?.into(),
            PipelineCommand::UpdateStage { target: t, stage_ref, stage } => {
                store.update_stage(&t.project, &t.name, &stage_ref, &stage).await?.into()
            }
            PipelineCommand::DeleteStage { target: t, stage_ref } => {
                store.delete_stage(&t.project, &t.name, &stage_ref).await?.into()
            }
            PipelineCommand::MoveStage { target: t, stage_ref, build_order } => {
                store.move_stage(&t.project, &t.name, &stage_ref, build_order).await?.into()
            }
            PipelineCommand::AddJob { target: t, stage_ref, job } => {
                store.add_job(&t.project, &t.name, &stage_ref, &job).await?.into()
            }
            PipelineCommand::UpdateJob { target: t, job_ref, job } => {
                store.update_job(&t.project, &t.name, &job_ref, &job).await?.into()
            }
            PipelineCommand::DeleteJob { target: t, job_ref } => store.delete_job(&t.project, &t.name, &job_ref).await?.into(),
            PipelineCommand::CancelEdits(t) => store.cancel_edits(&t.project, &t.name)?.into(),
            PipelineCommand::ExternalChange(t) => store.external_change(&t.project, &t.name).into(),
            PipelineCommand::DeleteFromCache(t) => store.delete_from_cache(&t.project, &t.name).into(),
            PipelineCommand::ClearCache => {
                store.clear();
                Outcome::Done
            }
        })
    }

    async fn dispatch_workflow(&self, command: WorkflowCommand) -> StoreResult<Outcome> {
        let store = &self.workflows;
        Ok(match command {
            WorkflowCommand::Fetch(t) => store.fetch(&t.project, &t.name).await?.into(),
            WorkflowCommand::Resync(t) => store.resync(&t.project, &t.name).await?.into(),
            WorkflowCommand::Add { project, workflow } => store.add(&project, &workflow).await?.into(),
            WorkflowCommand::Update { target: t, changes } => store.update(&t.project, &t.name, &changes).await?.into(),
            WorkflowCommand::Delete(t) => store.delete(&t.project, &t.name).await?.into(),
            WorkflowCommand::SetIcon { target: t, icon } => store.set_icon(&t.project, &t.name, &icon).await?.into(),
            WorkflowCommand::DeleteIcon(t) => store.delete_icon(&t.project, &t.name).await?.into(),
            WorkflowCommand::AddGroup { target: t, group } => store.add_group(&t.project, &t.name, &group).await?.into(),
            WorkflowCommand::UpdateGroup { target: t, group } => {
                store.update_group(&t.project, &t.name, &group).await?.into()
            }
            WorkflowCommand::DeleteGroup { target: t, group } => {
                store.delete_group(&t.project, &t.name, &group).await?.into()
            }
            WorkflowCommand::AddNotification { target: t, notification } => {
                store.add_notification(&t.project, &t.name, &notification).await?.into()
            }
            WorkflowCommand::UpdateNotification { target: t, id, notification } => {
                store.update_notification(&t.project, &t.name, id, &notification).await?.into()
            }
            WorkflowCommand::DeleteNotification { target: t, id } => {
                store.delete_notification(&t.project, &t.name, id).await?.into()
            }
            WorkflowCommand::SetEventIntegrations { target: t, integrations } => {
                store.set_event_integrations(&t.project, &t.name, &integrations).await?.into()
            }
            WorkflowCommand::DeleteEventIntegration { target: t, integration_id } => {
                store.delete_event_integration(&t.project, &t.name, integration_id).await?.into()
            }
            WorkflowCommand::AddTrigger { target: t, parent, trigger } => {
                store.add_trigger(&t.project, &t.name, &parent, &trigger).await?.into()
            }
            WorkflowCommand::AddJoin { target: t, parents, join } => {
                store.add_join(&t.project, &t.name, &parents, &join).await?.into()
            }
            WorkflowCommand::UpdateNode { target: t, node_ref, node } => {
                store.update_node(&t.project, &t.name, &node_ref, &node).await?.into()
            }
            WorkflowCommand::DeleteNode { target: t, node_ref } => {
                store.delete_node(&t.project, &t.name, &node_ref).await?.into()
            }
            WorkflowCommand::AddHook { target: t, node_ref, hook } => {
                store.add_hook(&t.project, &t.name, &node_ref, &hook).await?.into()
            }
            WorkflowCommand::UpdateHook { target: t, hook_ref, hook } => {
                store.update_hook(&t.project, &t.name, &hook_ref, &hook).await?.into()
            }
            WorkflowCommand::DeleteHook { target: t, hook_ref } => {
                store.delete_hook(&t.project, &t.name, &hook_ref).await?.into()
            }
            WorkflowCommand::FetchAudits(t) => store.fetch_audits(&t.project, &t.name).await?.into(),
            WorkflowCommand::Rollback { target: t, audit_id } => {
                store.rollback(&t.project, &t.name, audit_id).await?.into()
            }
            WorkflowCommand::FetchAsCode(t) => store.fetch_as_code(&t.project, &t.name).await?.into(),
            WorkflowCommand::Import { project, name, code } => {
                Outcome::Messages(store.import(&project, name.as_deref(), &code).await?)
            }
            WorkflowCommand::Preview { target: t, code } => store.preview(&t.project, &t.name, &code).await?.into(),
            WorkflowCommand::ToggleFavorite(t) => store.toggle_favorite(&t.project, &t.name).await?.into(),
            WorkflowCommand::CancelEdits(t) => store.cancel_edits(&t.project, &t.name)?.into(),
            WorkflowCommand::ExternalChange(t) => store.external_change(&t.project, &t.name).into(),
            WorkflowCommand::DeleteFromCache(t) => store.delete_from_cache(&t.project, &t.name).into(),
            WorkflowCommand::ClearCache => {
                store.clear();
                Outcome::Done
            }
        })
    }

    async fn dispatch_environment(&self, command: EnvironmentCommand) -> StoreResult<Outcome> {
        let store = &self.environments;
        Ok(match command {
            EnvironmentCommand::Fetch(t) => store.fetch(&t.project, &t.name).await?.into(),
            EnvironmentCommand::Resync(t) => store.resync(&t.project, &t.name).await?.into(),
            EnvironmentCommand::Add { project, environment } => store.add(&project, &environment).await?.into(),
            EnvironmentCommand::Clone { project, source, environment } => {
                store.clone_from(&project, &source, &environment).await?.into()
            }
            EnvironmentCommand::Update { target: t, changes } => store.update(&t.project, &t.name, &changes).await?.into(),
            EnvironmentCommand::Delete(t) => store.delete(&t.project, &t.name).await?.into(),
            EnvironmentCommand::AddVariable { target: t, variable } => {
                store.add_variable(&t.project, &t.name, &variable).await?.into()
            }
            EnvironmentCommand::UpdateVariable { target: t, var_name, variable } => {
                store.update_variable(&t.project, &t.name, &var_name, &variable).await?.into()
            }
            EnvironmentCommand::DeleteVariable { target: t, var_name } => {
                store.delete_variable(&t.project, &t.name, &var_name).await?.into()
            }
            EnvironmentCommand::AddKey { target: t, key } => store.add_key(&t.project, &t.name, &key).await?.into(),
            EnvironmentCommand::DeleteKey { target: t, key_name } => {
                store.delete_key(&t.project, &t.name, &key_name).await?.into()
            }
            EnvironmentCommand::CancelEdits(t) => store.cancel_edits(&t.project, &t.name)?.into(),
            EnvironmentCommand::ExternalChange(t) => store.external_change(&t.project, &t.name).into(),
            EnvironmentCommand::DeleteFromCache(t) => store.delete_from_cache(&t.project, &t.name).into(),
            EnvironmentCommand::ClearCache => {
                store.clear();
                Outcome::Done
            }
        })
    }

    /// Apply one external event
    ///
    /// `Changed` sets the external flag and returns whether the target was
    /// cached; `Resync` refetches it, clearing the flag.
    ///
    /// # Errors
    /// Returns the API error of a refetch
    pub async fn handle_event(&self, event: &ExternalEvent) -> StoreResult<bool> {
        tracing::debug!(target_entity = %event.target(), "external event");
        match event {
            ExternalEvent::Changed(EventTarget::Project(key)) => Ok(self.project.external_change(key)),
            ExternalEvent::Changed(EventTarget::Child { kind, key }) => Ok(match kind {
                EntityKind::Application => self.applications.external_change(&key.project, &key.name),
                EntityKind::Pipeline => self.pipelines.external_change(&key.project, &key.name),
                EntityKind::Workflow => self.workflows.external_change(&key.project, &key.name),
                EntityKind::Environment => self.environments.external_change(&key.project, &key.name),
            }),
            ExternalEvent::Resync(EventTarget::Project(key)) => {
                let Some(current) = self.project.loaded(key) else {
                    return Ok(false);
                };
                let opts: Vec<LoadOpt> = LoadOpt::ALL
                    .into_iter()
                    .filter(|opt| current.has_field(*opt))
                    .collect();
                self.project.resync(key, &opts).await?;
                Ok(true)
            }
            ExternalEvent::Resync(EventTarget::Child { kind, key }) => {
                let (project, name) = (&key.project, key.name.as_str());
                match kind {
                    EntityKind::Application => self.applications.resync(project, name).await.map(|v| log_resync(&*v)),
                    EntityKind::Pipeline => self.pipelines.resync(project, name).await.map(|v| log_resync(&*v)),
                    EntityKind::Workflow => self.workflows.resync(project, name).await.map(|v| log_resync(&*v)),
                    EntityKind::Environment => self.environments.resync(project, name).await.map(|v| log_resync(&*v)),
                }
            }
        }
    }

    /// Drain an event channel until every sender is dropped
    ///
    /// Failed events are logged and skipped.
    pub async fn run_events(&self, mut events: mpsc::Receiver<ExternalEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle_event(&event).await {
                tracing::warn!(target_entity = %event.target(), error = %e, "external event not applied");
            }
        }
        tracing::debug!("event channel closed");
    }
}

fn log_resync<E: Entity>(value: &E) -> bool {
    tracing::debug!(kind = %E::KIND, name = value.name(), "resynced after external event");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use cds_api::Method;
    use cds_test_utils::{create_application, create_project, project_key, scripted_client};

    fn session() -> (Session, std::sync::Arc<cds_test_utils::ScriptedTransport>) {
        let (client, transport) = scripted_client();
        transport
            .on_json(Method::Get, "/project/test1", &create_project("test1"))
            .on_json(
                Method::Get,
                "/project/test1/application/app1",
                &create_application("test1", "app1"),
            );
        (Session::new(client, SessionConfig::default()), transport)
    }

    #[test]
    fn teardown_empties_every_store() {
        let (session, _transport) = session();
        let key = project_key("test1");
        tokio_test::block_on(async {
            session.switch_project(&key, &[LoadOpt::ApplicationNames]).await.unwrap();
            session.applications().fetch(&key, "app1").await.unwrap();
        });
        assert_eq!(session.applications().cache().len(), 1);

        session.teardown();
        assert!(session.applications().cache().is_empty());
        assert!(session.project().is_none());
    }

    #[test]
    fn project_resync_event_keeps_loaded_fields() {
        let (session, transport) = session();
        let key = project_key("test1");
        let resynced = tokio_test::block_on(async {
            session.switch_project(&key, &[LoadOpt::ApplicationNames]).await.unwrap();
            session
                .handle_event(&ExternalEvent::Resync(EventTarget::Project(key.clone())))
                .await
                .unwrap()
        });

        assert!(resynced);
        assert_eq!(transport.calls_to(Method::Get, "/project/test1"), 2);
        assert!(session.project().unwrap().application_names.is_some());
    }

    #[test]
    fn resync_event_for_unloaded_project_is_skipped() {
        let (session, transport) = session();
        let handled = tokio_test::block_on(
            session.handle_event(&ExternalEvent::Resync(EventTarget::Project(project_key("other")))),
        )
        .unwrap();
        assert!(!handled);
        assert_eq!(transport.call_count(), 0);
    }
}
