//! Application store

use crate::error::StoreResult;
use crate::executor::{Applied, Commit, MutationExecutor};
use crate::projection::ProjectionUpdater;
use cds_api::CdsClient;
use cds_cache::{CacheKey, EntityCache};
use cds_model::{Application, Key, ProjectKey, Variable, Workflow};
use std::sync::Arc;

/// Cached applications of the loaded project
#[derive(Debug)]
pub struct ApplicationsStore {
    client: CdsClient,
    executor: MutationExecutor<Application>,
    workflows: Arc<EntityCache<Workflow>>,
}

impl ApplicationsStore {
    pub(crate) fn new(
        client: CdsClient,
        cache: Arc<EntityCache<Application>>,
        workflows: Arc<EntityCache<Workflow>>,
        projections: ProjectionUpdater,
    ) -> Self {
        Self {
            client,
            executor: MutationExecutor::new(cache, projections),
            workflows,
        }
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &EntityCache<Application> {
        self.executor.cache()
    }

    /// Cached application
    #[must_use]
    pub fn get(&self, project: &ProjectKey, name: &str) -> Option<Arc<Application>> {
        self.cache().get(&CacheKey::new(project.clone(), name))
    }

    /// Cached application, fetched when absent or changed elsewhere
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn fetch(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Application>> {
        let key = CacheKey::new(project.clone(), name);
        match self.cache().get(&key) {
            Some(app) if !self.cache().is_external(&key) => Ok(app),
            _ => self.resync(project, name).await,
        }
    }

    /// Fetch an application from the server, whatever is cached
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn resync(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Application>> {
        let app = self.client.get_application(project, name).await?;
        Ok(self.executor.load(CacheKey::new(project.clone(), name), app))
    }

    /// Create an application
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn add(&self, project: &ProjectKey, app: &Application) -> StoreResult<Arc<Application>> {
        self.executor
            .create(project, self.client.create_application(project, app))
            .await
    }

    /// Create an application as a copy of `source`
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn clone_from(&self, project: &ProjectKey, source: &str, app: &Application) -> StoreResult<Arc<Application>> {
        self.executor
            .create(project, self.client.clone_application(project, source, app))
            .await
    }

    /// Update an application's own fields, possibly renaming it
    ///
    /// A rename also evicts the cached workflows using the application, as
    /// their nodes embed the old name.
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn update(&self, project: &ProjectKey, name: &str, changes: &Application) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let applied = self
            .executor
            .write(&target, Commit::Merge, self.client.update_application(project, name, changes))
            .await?;
        if let Some(app) = applied.value().filter(|app| app.name != name) {
            for workflow in app.used_by_workflows() {
                if self.workflows.evict(&CacheKey::new(project.clone(), workflow.as_str())).is_some() {
                    tracing::debug!(%project, %workflow, "evicted workflow using renamed application");
                }
            }
        }
        Ok(applied)
    }

    /// Delete an application
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn delete(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        self.executor
            .delete(&target, self.client.delete_application(project, name))
            .await
    }

    /// Add a variable
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_variable(&self, project: &ProjectKey, name: &str, variable: &Variable) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.add_application_variable(project, name, variable).await?;
            self.with_variables(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Replace the variable currently named `var_name`
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn update_variable(
        &self,
        project: &ProjectKey,
        name: &str,
        var_name: &str,
        variable: &Variable,
    ) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self
                .client
                .update_application_variable(project, name, var_name, variable)
                .await?;
            self.with_variables(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Remove a variable
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_variable(&self, project: &ProjectKey, name: &str, var_name: &str) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.delete_application_variable(project, name, var_name).await?;
            self.with_variables(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    fn with_variables(&self, target: &CacheKey, response: Application) -> StoreResult<Application> {
        self.executor
            .patched(target, |app| app.variables = Some(response.variables.unwrap_or_default()))
    }

    /// Add an SSH or PGP key
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_key(&self, project: &ProjectKey, name: &str, key: &Key) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let created = self.client.add_application_key(project, name, key).await?;
            self.executor
                .patched(&target, |app| app.keys.get_or_insert_with(Vec::new).push(created))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Remove a key by name
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_key(&self, project: &ProjectKey, name: &str, key_name: &str) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client.delete_application_key(project, name, key_name).await?;
            self.executor.patched(&target, |app| {
                app.keys.get_or_insert_with(Vec::new).retain(|k| k.name != key_name);
            })
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Save the deployment settings of one integration
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn save_deployment(
        &self,
        project: &ProjectKey,
        name: &str,
        integration: &str,
        config: &serde_json::Value,
    ) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self
                .client
                .save_application_deployment(project, name, integration, config)
                .await?;
            self.with_deployments(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Drop the deployment settings of one integration
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_deployment(&self, project: &ProjectKey, name: &str, integration: &str) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self
                .client
                .delete_application_deployment(project, name, integration)
                .await?;
            self.with_deployments(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    fn with_deployments(&self, target: &CacheKey, response: Application) -> StoreResult<Application> {
        self.executor.patched(target, |app| {
            app.deployment_strategies = Some(response.deployment_strategies.unwrap_or_default());
        })
    }

    /// Link the application to a repository
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn attach_repository(
        &self,
        project: &ProjectKey,
        name: &str,
        repo_manager: &str,
        repo_fullname: &str,
    ) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self
                .client
                .attach_repository(project, name, repo_manager, repo_fullname)
                .await?;
            self.with_repository(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Unlink the application from its repository
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn detach_repository(&self, project: &ProjectKey, name: &str, repo_manager: &str) -> StoreResult<Applied<Application>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.detach_repository(project, name, repo_manager).await?;
            self.with_repository(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    fn with_repository(&self, target: &CacheKey, response: Application) -> StoreResult<Application> {
        self.executor.patched(target, |app| {
            app.vcs_server = response.vcs_server;
            app.repository_fullname = response.repository_fullname;
            app.vcs_strategy = response.vcs_strategy;
        })
    }

    /// Flag a cached application as changed elsewhere
    pub fn external_change(&self, project: &ProjectKey, name: &str) -> bool {
        self.cache().mark_external(&CacheKey::new(project.clone(), name))
    }

    /// Drop one application from the cache
    pub fn delete_from_cache(&self, project: &ProjectKey, name: &str) -> bool {
        self.cache().evict(&CacheKey::new(project.clone(), name)).is_some()
    }

    /// Drop every cached application
    pub fn clear(&self) {
        self.cache().clear();
    }
}
