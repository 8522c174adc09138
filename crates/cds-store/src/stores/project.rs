//! Project store: the single loaded project and its settings

use crate::error::{StoreError, StoreResult};
use crate::projection::ProjectSlot;
use cds_api::{CdsClient, Favorite};
use cds_model::{overlay_response, GroupPermission, Key, Label, LoadOpt, Project, ProjectKey, Variable};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Holds the currently loaded project
///
/// Child stores publish name-index changes into the same slot.
#[derive(Debug)]
pub struct ProjectStore {
    client: CdsClient,
    slot: ProjectSlot,
    external: AtomicBool,
}

impl ProjectStore {
    pub(crate) fn new(client: CdsClient) -> Self {
        Self {
            client,
            slot: Arc::new(RwLock::new(None)),
            external: AtomicBool::new(false),
        }
    }

    pub(crate) fn slot(&self) -> ProjectSlot {
        Arc::clone(&self.slot)
    }

    /// Loaded project, if any
    #[must_use]
    pub fn current(&self) -> Option<Arc<Project>> {
        self.slot.read().clone()
    }

    /// Loaded project if it has that key
    #[must_use]
    pub fn loaded(&self, key: &ProjectKey) -> Option<Arc<Project>> {
        self.slot.read().as_ref().filter(|p| &p.key == key).cloned()
    }

    /// Whether the loaded project was flagged as changed elsewhere
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.external.load(Ordering::Acquire)
    }

    /// Project `key` with at least the fields behind `opts`
    ///
    /// The cached project is returned when it already carries every field
    /// and was not flagged as changed elsewhere.
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn fetch(&self, key: &ProjectKey, opts: &[LoadOpt]) -> StoreResult<Arc<Project>> {
        if let Some(project) = self.loaded(key) {
            if !self.is_external() && opts.iter().all(|opt| project.has_field(*opt)) {
                return Ok(project);
            }
        }
        self.resync(key, opts).await
    }

    /// Fetch project `key` from the server, whatever is cached
    ///
    /// The index fields are always requested. Requested lists absent from
    /// the response are stored empty.
    ///
    /// # Errors
    /// Returns the API error of the fetch, or a merge error
    pub async fn resync(&self, key: &ProjectKey, opts: &[LoadOpt]) -> StoreResult<Arc<Project>> {
        let mut requested: Vec<LoadOpt> = LoadOpt::ALWAYS.to_vec();
        for opt in opts {
            if !requested.contains(opt) {
                requested.push(*opt);
            }
        }

        let mut response = self.client.get_project(key, &requested).await?;
        for opt in &requested {
            response.ensure_field(*opt);
        }

        let mut slot = self.slot.write();
        let next = match slot.as_ref().filter(|p| &p.key == key) {
            Some(prior) => overlay_response("project", prior.as_ref(), &response)?,
            None => {
                if let Some(prior) = slot.as_ref() {
                    tracing::info!(from = %prior.key, to = %key, "project switched");
                }
                response
            }
        };
        let next = Arc::new(next);
        *slot = Some(Arc::clone(&next));
        self.external.store(false, Ordering::Release);
        tracing::debug!(project = %key, "project loaded");
        Ok(next)
    }

    /// Create a project and make it the loaded one
    ///
    /// # Errors
    /// Returns the API error; nothing changes in that case
    pub async fn add(&self, project: &Project) -> StoreResult<Arc<Project>> {
        let created = Arc::new(self.client.create_project(project).await?);
        *self.slot.write() = Some(Arc::clone(&created));
        self.external.store(false, Ordering::Release);
        tracing::info!(project = %created.key, "project created");
        Ok(created)
    }

    /// Update the project's own fields
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn update(&self, project: &Project) -> StoreResult<Arc<Project>> {
        let response = self.client.update_project(project).await?;
        self.patch(&project.key, |current| {
            *current = overlay_response("project", &*current, &response)?;
            Ok(())
        })
    }

    /// Delete a project, unloading it if it is the loaded one
    ///
    /// # Errors
    /// Returns the API error; nothing changes in that case
    pub async fn delete(&self, key: &ProjectKey) -> StoreResult<()> {
        self.client.delete_project(key).await?;
        self.delete_from_cache(key);
        tracing::info!(project = %key, "project deleted");
        Ok(())
    }

    /// Flip the favorite flag of the project
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn toggle_favorite(&self, key: &ProjectKey) -> StoreResult<Arc<Project>> {
        self.client.toggle_favorite(&Favorite::project(key.clone())).await?;
        self.patch(key, |p| {
            p.favorite = !p.favorite;
            Ok(())
        })
    }

    /// Replace every label of the project
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn save_labels(&self, key: &ProjectKey, labels: &[Label]) -> StoreResult<Arc<Project>> {
        let response = self.client.save_project_labels(key, labels).await?;
        self.set_labels(key, response)
    }

    /// Add one label
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn add_label(&self, key: &ProjectKey, label: &Label) -> StoreResult<Arc<Project>> {
        let response = self.client.add_project_label(key, label).await?;
        self.set_labels(key, response)
    }

    /// Remove one label by id
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn delete_label(&self, key: &ProjectKey, label_id: i64) -> StoreResult<Arc<Project>> {
        let response = self.client.delete_project_label(key, label_id).await?;
        self.set_labels(key, response)
    }

    fn set_labels(&self, key: &ProjectKey, response: Project) -> StoreResult<Arc<Project>> {
        self.patch(key, |p| {
            p.labels = Some(response.labels.unwrap_or_default());
            Ok(())
        })
    }

    /// Add a project variable
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn add_variable(&self, key: &ProjectKey, variable: &Variable) -> StoreResult<Arc<Project>> {
        let created = self.client.add_project_variable(key, variable).await?;
        self.patch(key, |p| {
            p.variables.get_or_insert_with(Vec::new).push(created);
            Ok(())
        })
    }

    /// Replace the variable currently named `name`
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn update_variable(&self, key: &ProjectKey, name: &str, variable: &Variable) -> StoreResult<Arc<Project>> {
        let updated = self.client.update_project_variable(key, name, variable).await?;
        self.patch(key, |p| {
            let vars = p.variables.get_or_insert_with(Vec::new);
            match vars.iter_mut().find(|v| v.name == name) {
                Some(slot) => *slot = updated,
                None => vars.push(updated),
            }
            Ok(())
        })
    }

    /// Remove a project variable
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn delete_variable(&self, key: &ProjectKey, name: &str) -> StoreResult<Arc<Project>> {
        self.client.delete_project_variable(key, name).await?;
        self.patch(key, |p| {
            p.variables.get_or_insert_with(Vec::new).retain(|v| v.name != name);
            Ok(())
        })
    }

    /// Grant a group access to the project
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn add_group(&self, key: &ProjectKey, group: &GroupPermission) -> StoreResult<Arc<Project>> {
        let groups = self.client.add_project_group(key, group).await?;
        self.patch(key, |p| {
            p.groups = Some(groups);
            Ok(())
        })
    }

    /// Change the permission of a group
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn update_group(&self, key: &ProjectKey, group: &GroupPermission) -> StoreResult<Arc<Project>> {
        let updated = self.client.update_project_group(key, group).await?;
        self.patch(key, |p| {
            let groups = p.groups.get_or_insert_with(Vec::new);
            match groups.iter_mut().find(|g| g.group.name == updated.group.name) {
                Some(slot) => *slot = updated,
                None => groups.push(updated),
            }
            Ok(())
        })
    }

    /// Revoke a group's access
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn delete_group(&self, key: &ProjectKey, group: &str) -> StoreResult<Arc<Project>> {
        self.client.delete_project_group(key, group).await?;
        self.patch(key, |p| {
            p.groups.get_or_insert_with(Vec::new).retain(|g| g.group.name != group);
            Ok(())
        })
    }

    /// Add a project key
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn add_key(&self, key: &ProjectKey, project_key: &Key) -> StoreResult<Arc<Project>> {
        let created = self.client.add_project_key(key, project_key).await?;
        self.patch(key, |p| {
            p.keys.get_or_insert_with(Vec::new).push(created);
            Ok(())
        })
    }

    /// Remove a project key by name
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::ProjectNotLoaded`]
    pub async fn delete_key(&self, key: &ProjectKey, name: &str) -> StoreResult<Arc<Project>> {
        self.client.delete_project_key(key, name).await?;
        self.patch(key, |p| {
            p.keys.get_or_insert_with(Vec::new).retain(|k| k.name != name);
            Ok(())
        })
    }

    /// Flag the loaded project as changed elsewhere
    ///
    /// Returns `false` when `key` is not the loaded project.
    pub fn external_change(&self, key: &ProjectKey) -> bool {
        if self.loaded(key).is_none() {
            return false;
        }
        self.external.store(true, Ordering::Release);
        tracing::debug!(project = %key, "project flagged as changed elsewhere");
        true
    }

    /// Unload the project if it is `key`
    pub fn delete_from_cache(&self, key: &ProjectKey) -> bool {
        let mut slot = self.slot.write();
        if slot.as_ref().is_some_and(|p| &p.key == key) {
            *slot = None;
            self.external.store(false, Ordering::Release);
            return true;
        }
        false
    }

    /// Unload whatever project is loaded
    pub fn clear(&self) {
        *self.slot.write() = None;
        self.external.store(false, Ordering::Release);
    }

    /// Publish a modified copy of the loaded project
    fn patch(
        &self,
        key: &ProjectKey,
        f: impl FnOnce(&mut Project) -> StoreResult<()>,
    ) -> StoreResult<Arc<Project>> {
        let mut slot = self.slot.write();
        let current = slot
            .as_ref()
            .filter(|p| &p.key == key)
            .ok_or_else(|| StoreError::ProjectNotLoaded(key.clone()))?;
        let mut next = Project::clone(current);
        f(&mut next)?;
        let next = Arc::new(next);
        *slot = Some(Arc::clone(&next));
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cds_api::Method;
    use cds_test_utils::{create_project, project_key, scripted_client};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn key() -> ProjectKey {
        project_key("test1")
    }

    #[tokio::test]
    async fn fetch_reuses_project_with_every_field() {
        let (client, transport) = scripted_client();
        transport.on_json(Method::Get, "/project/test1", &create_project("test1"));
        let store = ProjectStore::new(client);

        store.fetch(&key(), &[]).await.unwrap();
        store.fetch(&key(), &[LoadOpt::WorkflowNames]).await.unwrap();
        assert_eq!(transport.call_count(), 1);

        store.fetch(&key(), &[LoadOpt::Variables]).await.unwrap();
        assert_eq!(transport.call_count(), 2);
        assert!(store.current().unwrap().variables.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn external_flag_forces_refetch() {
        let (client, transport) = scripted_client();
        transport.on_json(Method::Get, "/project/test1", &create_project("test1"));
        let store = ProjectStore::new(client);
        store.fetch(&key(), &[]).await.unwrap();

        assert!(store.external_change(&key()));
        assert!(store.is_external());
        store.fetch(&key(), &[]).await.unwrap();
        assert_eq!(transport.call_count(), 2);
        assert!(!store.is_external());
    }

    #[tokio::test]
    async fn variable_lifecycle() {
        let (client, transport) = scripted_client();
        transport
            .on_json(Method::Get, "/project/test1", &create_project("test1"))
            .on_json(Method::Post, "/project/test1/variable/foo", &json!({"name": "foo", "value": "bar"}))
            .on_ok(Method::Delete, "/project/test1/variable/foo");
        let store = ProjectStore::new(client);
        store.fetch(&key(), &[]).await.unwrap();

        let project = store.add_variable(&key(), &Variable::new("foo", "bar")).await.unwrap();
        assert_eq!(project.variables.as_ref().unwrap()[0].value, "bar");

        let project = store.delete_variable(&key(), "foo").await.unwrap();
        assert!(project.variables.as_ref().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_keeps_loaded_project() {
        let (client, transport) = scripted_client();
        transport
            .on_json(Method::Get, "/project/test1", &create_project("test1"))
            .on_status(Method::Post, "/project/test1/keys", 403);
        let store = ProjectStore::new(client);
        let before = store.fetch(&key(), &[]).await.unwrap();

        let key_def = Key {
            name: "proj-ssh".to_string(),
            key_type: "ssh".to_string(),
            ..Key::default()
        };
        assert!(store.add_key(&key(), &key_def).await.is_err());
        assert!(Arc::ptr_eq(&before, &store.current().unwrap()));
    }

    #[tokio::test]
    async fn delete_unloads() {
        let (client, transport) = scripted_client();
        transport
            .on_json(Method::Get, "/project/test1", &create_project("test1"))
            .on_ok(Method::Delete, "/project/test1");
        let store = ProjectStore::new(client);
        store.fetch(&key(), &[]).await.unwrap();

        store.delete(&key()).await.unwrap();
        assert!(store.current().is_none());
    }
}
