//! Workflow store
//!
//! Graph edits (nodes, hooks, joins, notifications, event integrations)
//! have no dedicated endpoint: on the server path the edit runs on a draft
//! derived from the cached workflow and the result is saved whole.

use crate::error::StoreResult;
use crate::executor::{Applied, Commit, MutationExecutor};
use crate::overlays::OverlaySet;
use crate::projection::ProjectionUpdater;
use cds_api::{CdsClient, Favorite};
use cds_cache::{CacheKey, EntityCache};
use cds_model::{
    GroupPermission, ProjectIntegration, ProjectKey, WNode, WNodeHook, WNodeTrigger, Workflow,
    WorkflowNotification,
};
use cds_overlay::{Draft, OverlayResult, SyntheticRef, WorkflowDraft};
use std::sync::Arc;

/// Cached workflows of the loaded project, with their edit overlays
#[derive(Debug)]
pub struct WorkflowsStore {
    client: CdsClient,
    executor: MutationExecutor<Workflow>,
    overlays: OverlaySet<WorkflowDraft>,
}

impl WorkflowsStore {
    pub(crate) fn new(
        client: CdsClient,
        cache: Arc<EntityCache<Workflow>>,
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
    pub fn cache(&self) -> &EntityCache<Workflow> {
        self.executor.cache()
    }

    /// Edit overlays
    #[must_use]
    pub fn overlays(&self) -> &OverlaySet<WorkflowDraft> {
        &self.overlays
    }

    /// Cached workflow
    #[must_use]
    pub fn get(&self, project: &ProjectKey, name: &str) -> Option<Arc<Workflow>> {
        self.cache().get(&CacheKey::new(project.clone(), name))
    }

    /// Workflow as the user sees it: the draft in edit mode, the cached value otherwise
    #[must_use]
    pub fn view(&self, project: &ProjectKey, name: &str) -> Option<Workflow> {
        let key = CacheKey::new(project.clone(), name);
        self.overlays
            .snapshot(&key)
            .or_else(|| self.cache().get(&key).map(|w| Workflow::clone(&w)))
    }

    /// Cached workflow, fetched when absent or changed elsewhere
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn fetch(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Workflow>> {
        let key = CacheKey::new(project.clone(), name);
        match self.cache().get(&key) {
            Some(workflow) if !self.cache().is_external(&key) => Ok(workflow),
            _ => self.resync(project, name).await,
        }
    }

    /// Fetch a workflow from the server, whatever is cached
    ///
    /// Hooks get their uuid as reference when the value is cached.
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn resync(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Workflow>> {
        let workflow = self.client.get_workflow(project, name).await?;
        let key = CacheKey::new(project.clone(), name);
        let stored = self.executor.load(key.clone(), workflow);
        self.overlays.sync(&key, &stored);
        Ok(stored)
    }

    /// Create a workflow
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn add(&self, project: &ProjectKey, workflow: &Workflow) -> StoreResult<Arc<Workflow>> {
        self.executor
            .create(project, self.client.create_workflow(project, workflow))
            .await
    }

    /// Save a whole workflow, possibly renaming it
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn update(&self, project: &ProjectKey, name: &str, changes: &Workflow) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut WorkflowDraft| d.replace_with(changes),
                Commit::Merge,
                self.client.update_workflow(project, name, changes),
            )
            .await
    }

    /// Delete a workflow
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn delete(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let applied = self
            .executor
            .delete(&target, self.client.delete_workflow(project, name))
            .await?;
        self.overlays.discard(&target);
        Ok(applied)
    }

    /// Set the icon
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn set_icon(&self, project: &ProjectKey, name: &str, icon: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client.put_workflow_icon(project, name, icon).await?;
            self.executor.patched(&target, |w| w.icon = Some(icon.to_string()))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Remove the icon
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_icon(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client.delete_workflow_icon(project, name).await?;
            self.executor.patched(&target, |w| w.icon = None)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Grant a group access to the workflow
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_group(&self, project: &ProjectKey, name: &str, group: &GroupPermission) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.add_workflow_group(project, name, group).await?;
            self.with_groups(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Change the permission of a group
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn update_group(&self, project: &ProjectKey, name: &str, group: &GroupPermission) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.update_workflow_group(project, name, group).await?;
            self.with_groups(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Revoke a group's access
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_group(&self, project: &ProjectKey, name: &str, group: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.delete_workflow_group(project, name, group).await?;
            self.with_groups(&target, response)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    fn with_groups(&self, target: &CacheKey, response: Workflow) -> StoreResult<Workflow> {
        self.executor
            .patched(target, |w| w.groups = Some(response.groups.unwrap_or_default()))
    }

    /// Run a graph edit: on the draft in edit mode, else on a derived
    /// draft that is then saved whole
    async fn edit<L>(&self, target: &CacheKey, edit: L) -> StoreResult<Applied<Workflow>>
    where
        L: Fn(&mut WorkflowDraft) -> OverlayResult<()>,
    {
        let remote = async {
            let mut draft = WorkflowDraft::derive(&*self.executor.current(target)?);
            edit(&mut draft)?;
            let next = draft.try_materialize()?;
            StoreResult::Ok(
                self.client
                    .update_workflow(&target.project, &target.name, &next)
                    .await?,
            )
        };
        self.executor
            .execute(target, &self.overlays, &edit, Commit::Merge, remote)
            .await
    }

    /// Attach a trigger, and the node it carries, under `parent`
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown parent
    pub async fn add_trigger(
        &self,
        project: &ProjectKey,
        name: &str,
        parent: &SyntheticRef,
        trigger: &WNodeTrigger,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.add_trigger(parent, trigger.clone()).map(|_| ()))
            .await
    }

    /// Add a join waiting on `parents`
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown parent
    pub async fn add_join(
        &self,
        project: &ProjectKey,
        name: &str,
        parents: &[SyntheticRef],
        join: &WNode,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.add_join(parents, join.clone()).map(|_| ()))
            .await
    }

    /// Overwrite the name and context of a node
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown reference
    pub async fn update_node(
        &self,
        project: &ProjectKey,
        name: &str,
        node_ref: &SyntheticRef,
        node: &WNode,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.update_node(node_ref, node.clone()))
            .await
    }

    /// Remove a node and its subtree
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or a
    /// root-removal error
    pub async fn delete_node(&self, project: &ProjectKey, name: &str, node_ref: &SyntheticRef) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.remove_node(node_ref)).await
    }

    /// Attach a hook to a node
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown node
    pub async fn add_hook(
        &self,
        project: &ProjectKey,
        name: &str,
        node_ref: &SyntheticRef,
        hook: &WNodeHook,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.add_hook(node_ref, hook.clone()).map(|_| ()))
            .await
    }

    /// Overwrite a hook
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown reference
    pub async fn update_hook(
        &self,
        project: &ProjectKey,
        name: &str,
        hook_ref: &SyntheticRef,
        hook: &WNodeHook,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.update_hook(hook_ref, hook.clone()))
            .await
    }

    /// Remove a hook
    ///
    /// # Errors
    /// Returns the API error, or a desync for an unknown reference
    pub async fn delete_hook(&self, project: &ProjectKey, name: &str, hook_ref: &SyntheticRef) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.remove_hook(hook_ref).map(|_| ()))
            .await
    }

    /// Append a notification
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn add_notification(
        &self,
        project: &ProjectKey,
        name: &str,
        notification: &WorkflowNotification,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.add_notification(notification.clone()))
            .await
    }

    /// Replace the notification with id `id`
    ///
    /// # Errors
    /// Returns the API error, or an unknown-notification error
    pub async fn update_notification(
        &self,
        project: &ProjectKey,
        name: &str,
        id: i64,
        notification: &WorkflowNotification,
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.update_notification(id, notification.clone()))
            .await
    }

    /// Remove the notification with id `id`
    ///
    /// # Errors
    /// Returns the API error, or an unknown-notification error
    pub async fn delete_notification(&self, project: &ProjectKey, name: &str, id: i64) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.delete_notification(id)).await
    }

    /// Replace the event integrations
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn set_event_integrations(
        &self,
        project: &ProjectKey,
        name: &str,
        integrations: &[ProjectIntegration],
    ) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.edit(&target, |d| d.set_event_integrations(integrations.to_vec()))
            .await
    }

    /// Remove one event integration
    ///
    /// The integration is detached on the server, then dropped from the
    /// cached list.
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn delete_event_integration(&self, project: &ProjectKey, name: &str, integration_id: i64) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client
                .delete_workflow_event_integration(project, name, integration_id)
                .await?;
            self.executor.patched(&target, |w| {
                w.event_integrations
                    .get_or_insert_with(Vec::new)
                    .retain(|i| i.id != Some(integration_id));
            })
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut WorkflowDraft| d.remove_event_integration(integration_id),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Load the audit trail into the cached workflow
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn fetch_audits(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let audits = self.client.get_workflow_audits(project, name).await?;
            self.executor.patched(&target, |w| w.audits = Some(audits))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Restore the workflow as recorded by an audit
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn rollback(&self, project: &ProjectKey, name: &str, audit_id: i64) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        self.executor
            .write(
                &target,
                Commit::Merge,
                self.client.rollback_workflow(project, name, audit_id),
            )
            .await
    }

    /// Load the YAML export into the cached workflow
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn fetch_as_code(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let code = self.client.export_workflow(project, name).await?;
            self.executor.patched(&target, |w| w.as_code = Some(code))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Import a workflow from YAML
    ///
    /// With a name the existing workflow is overwritten and refetched.
    /// Returns the server messages.
    ///
    /// # Errors
    /// Returns an invalid-payload error for malformed YAML, or the API error
    pub async fn import(&self, project: &ProjectKey, name: Option<&str>, code: &str) -> StoreResult<Vec<String>> {
        let messages = self.client.import_workflow(project, name, code).await?;
        if let Some(name) = name {
            self.resync(project, name).await?;
        }
        tracing::info!(%project, messages = messages.len(), "workflow imported");
        Ok(messages)
    }

    /// Render YAML as a workflow and keep it as the preview of `name`
    ///
    /// # Errors
    /// Returns an invalid-payload error for malformed YAML, the API error,
    /// or [`crate::StoreError::NotLoaded`]
    pub async fn preview(&self, project: &ProjectKey, name: &str, code: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let preview = self.client.preview_workflow(project, code).await?;
            self.executor
                .patched(&target, |w| w.preview = Some(Box::new(preview)))
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Flip the favorite flag
    ///
    /// # Errors
    /// Returns the API error, or [`crate::StoreError::NotLoaded`]
    pub async fn toggle_favorite(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Workflow>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            self.client
                .toggle_favorite(&Favorite::workflow(project.clone(), name))
                .await?;
            self.executor.patched(&target, |w| w.favorite = !w.favorite)
        };
        self.executor.write(&target, Commit::Replace, remote).await
    }

    /// Throw local edits away and restart from the cached value
    ///
    /// # Errors
    /// Returns [`crate::StoreError::NotLoaded`] if the workflow is not cached
    pub fn cancel_edits(&self, project: &ProjectKey, name: &str) -> StoreResult<bool> {
        let target = CacheKey::new(project.clone(), name);
        let canonical = self.executor.current(&target)?;
        Ok(self.overlays.cancel(&target, &canonical))
    }

    /// Flag a cached workflow as changed elsewhere
    pub fn external_change(&self, project: &ProjectKey, name: &str) -> bool {
        self.cache().mark_external(&CacheKey::new(project.clone(), name))
    }

    /// Drop one workflow from the cache, with its overlay
    pub fn delete_from_cache(&self, project: &ProjectKey, name: &str) -> bool {
        let key = CacheKey::new(project.clone(), name);
        self.overlays.discard(&key);
        self.cache().evict(&key).is_some()
    }

    /// Drop every cached workflow and overlay
    pub fn clear(&self) {
        self.overlays.clear();
        self.cache().clear();
    }
}
