//! Environment store
//!
//! Environment writes answer with the whole project; the written
//! environment is picked from it by name.

use crate::error::StoreResult;
use crate::executor::{Applied, Commit, MutationExecutor};
use crate::overlays::OverlaySet;
use crate::projection::ProjectionUpdater;
use cds_api::CdsClient;
use cds_cache::{CacheKey, EntityCache};
use cds_model::{Environment, Key, Project, ProjectKey, Variable};
use cds_overlay::EnvironmentDraft;
use std::sync::Arc;

/// Environment named `name` inside a project response, or `fallback`
fn pick(project: Project, name: &str, fallback: &Environment) -> Environment {
    project
        .environments
        .into_iter()
        .flatten()
        .find(|e| e.name == name)
        .unwrap_or_else(|| fallback.clone())
}

/// Cached environments of the loaded project, with their edit overlays
#[derive(Debug)]
pub struct EnvironmentsStore {
    client: CdsClient,
    executor: MutationExecutor<Environment>,
    overlays: OverlaySet<EnvironmentDraft>,
}

impl EnvironmentsStore {
    pub(crate) fn new(
        client: CdsClient,
        cache: Arc<EntityCache<Environment>>,
        projections: ProjectionUpdater,
        edit_repository_entities: bool,
    ) -> Self {
        Self {
            client,
            executor: MutationExecutor::new(cache, projections),
            overlays: OverlaySet::new(edit_repository_entities),
        }
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &EntityCache<Environment> {
        self.executor.cache()
    }

    /// Edit overlays
    #[must_use]
    pub fn overlays(&self) -> &OverlaySet<EnvironmentDraft> {
        &self.overlays
    }

    /// Cached environment
    #[must_use]
    pub fn get(&self, project: &ProjectKey, name: &str) -> Option<Arc<Environment>> {
        self.cache().get(&CacheKey::new(project.clone(), name))
    }

    /// Environment as the user sees it: the draft in edit mode, the cached value otherwise
    #[must_use]
    pub fn view(&self, project: &ProjectKey, name: &str) -> Option<Environment> {
        let key = CacheKey::new(project.clone(), name);
        self.overlays
            .snapshot(&key)
            .or_else(|| self.cache().get(&key).map(|e| Environment::clone(&e)))
    }

    /// Cached environment, fetched when absent or changed elsewhere
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn fetch(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Environment>> {
        let key = CacheKey::new(project.clone(), name);
        match self.cache().get(&key) {
            Some(env) if !self.cache().is_external(&key) => Ok(env),
            _ => self.resync(project, name).await,
        }
    }

    /// Fetch an environment from the server, whatever is cached
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn resync(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Environment>> {
        let env = self.client.get_environment(project, name).await?;
        let key = CacheKey::new(project.clone(), name);
        let stored = self.executor.load(key.clone(), env);
        self.overlays.sync(&key, &stored);
        Ok(stored)
    }

    /// Create an environment
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn add(&self, project: &ProjectKey, env: &Environment) -> StoreResult<Arc<Environment>> {
        let remote = async {
            let response = self.client.create_environment(project, env).await?;
            StoreResult::Ok(pick(response, &env.name, env))
        };
        self.executor.create(project, remote).await
    }

    /// Create an environment as a copy of `source`
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn clone_from(&self, project: &ProjectKey, source: &str, env: &Environment) -> StoreResult<Arc<Environment>> {
        let remote = async {
            let response = self.client.clone_environment(project, source, env).await?;
            StoreResult::Ok(pick(response, &env.name, env))
        };
        self.executor.create(project, remote).await
    }

    /// Update an environment's own fields, possibly renaming it
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn update(&self, project: &ProjectKey, name: &str, changes: &Environment) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.update_environment(project, name, changes).await?;
            StoreResult::Ok(pick(response, &changes.name, changes))
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut EnvironmentDraft| d.rename(&changes.name),
                Commit::Merge,
                remote,
            )
            .await
    }

    /// Delete an environment
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn delete(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let applied = self
            .executor
            .delete(&target, self.client.delete_environment(project, name))
            .await?;
        self.overlays.discard(&target);
        Ok(applied)
    }

    /// Add a variable
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_variable(&self, project: &ProjectKey, name: &str, variable: &Variable) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let created = self.client.add_environment_variable(project, name, variable).await?;
            self.executor
                .patched(&target, |e| e.variables.get_or_insert_with(Vec::new).push(created))
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut EnvironmentDraft| d.add_variable(variable.clone()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Replace the variable currently named `var_name`
    ///
    /// # Errors
    /// Returns the API error, [`crate::StoreError::NotLoaded`], or an
    /// unknown-name error in edit mode
    pub async fn update_variable(
        &self,
        project: &ProjectKey,
        name: &str,
        var_name: &str,
        variable: &Variable,
    ) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let updated = self
                .client
                .update_environment_variable(project, name, var_name, variable)
                .await?;
            self.executor.patched(&target, |e| {
                let vars = e.variables.get_or_insert_with(Vec::new);
                match vars.iter_mut().find(|v| v.name == var_name) {
                    Some(slot) => *slot = updated,
                    None => vars.push(updated),
                }
            })
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut EnvironmentDraft| d.update_variable(var_name, variable.clone()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Remove a variable
    ///
    /// # Errors
    /// Returns the API error, [`crate::StoreError::NotLoaded`], or an
    /// unknown-name error in edit mode
    pub async fn delete_variable(&self, project: &ProjectKey, name: &str, var_name: &str) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client.delete_environment_variable(project, name, var_name).await?;
            self.executor.patched(&target, |e| {
                e.variables.get_or_insert_with(Vec::new).retain(|v| v.name != var_name);
            })
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut EnvironmentDraft| d.delete_variable(var_name),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Add an SSH or PGP key
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_key(&self, project: &ProjectKey, name: &str, key: &Key) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let created = self.client.add_environment_key(project, name, key).await?;
            self.executor
                .patched(&target, |e| e.keys.get_or_insert_with(Vec::new).push(created))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Remove a key by name
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_key(&self, project: &ProjectKey, name: &str, key_name: &str) -> StoreResult<Applied<Environment>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client.delete_environment_key(project, name, key_name).await?;
            self.executor.patched(&target, |e| {
                e.keys.get_or_insert_with(Vec::new).retain(|k| k.name != key_name);
            })
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Throw local edits away and restart from the cached value
    ///
    /// # Errors
    /// Returns [`crate::StoreError::NotLoaded`] if the environment is not cached
    pub fn cancel_edits(&self, project: &ProjectKey, name: &str) -> StoreResult<bool> {
        let target = CacheKey::new(project.clone(), name);
        let canonical = self.executor.current(&target)?;
        Ok(self.overlays.cancel(&target, &canonical))
    }

    /// Flag a cached environment as changed elsewhere
    pub fn external_change(&self, project: &ProjectKey, name: &str) -> bool {
        self.cache().mark_external(&CacheKey::new(project.clone(), name))
    }

    /// Drop one environment from the cache, with its overlay
    pub fn delete_from_cache(&self, project: &ProjectKey, name: &str) -> bool {
        let key = CacheKey::new(project.clone(), name);
        self.overlays.discard(&key);
        self.cache().evict(&key).is_some()
    }

    /// Drop every cached environment and overlay
    pub fn clear(&self) {
        self.overlays.clear();
        self.cache().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_prefers_response_entry() {
        let mut project = Project::new(ProjectKey::new("test1").unwrap(), "Test 1");
        let mut prod = Environment::named("prod");
        prod.id = Some(7);
        project.environments = Some(vec![Environment::named("dev"), prod]);

        let fallback = Environment::named("prod");
        assert_eq!(pick(project.clone(), "prod", &fallback).id, Some(7));
        assert_eq!(pick(project, "staging", &fallback).name, "prod");
    }
}
