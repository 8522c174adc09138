//! Optimistic mutation executor
//!
//! ```text
//!  overlay active? ──yes──▶ edit draft, mark changed ──▶ Applied::Local
//!        │no
//!        ▼
//!  remote write ──err──▶ cache untouched, error returned
//!        │ok
//!        ▼
//!  merge over prior ─▶ rekey on rename ─▶ project index update ─▶ Applied::Remote
//! ```

use crate::error::{StoreError, StoreResult};
use crate::overlays::OverlaySet;
use crate::projection::ProjectionUpdater;
use cds_cache::{CacheKey, EntityCache};
use cds_model::{Entity, ProjectKey};
use cds_overlay::{Draft, OverlayResult};
use std::future::Future;
use std::sync::Arc;

/// How a mutation ended
#[derive(Debug, Clone, PartialEq)]
pub enum Applied<E> {
    /// Applied to the edit overlay; nothing was sent
    Local,
    /// Written to the server; the new cached value
    Remote(Arc<E>),
    /// Deleted on the server and evicted
    Removed,
}

impl<E> Applied<E> {
    /// New cached value of a remote write
    #[must_use]
    pub fn value(&self) -> Option<&Arc<E>> {
        match self {
            Self::Remote(value) => Some(value),
            _ => None,
        }
    }

    /// Whether the mutation stayed in the overlay
    #[must_use]
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Local)
    }
}

/// How a successful write reaches the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commit {
    /// The value is a server response: fold it over the prior value
    Merge,
    /// The value was derived from the prior one: store it as is
    Replace,
}

/// Wraps remote writes of one entity kind
#[derive(Debug)]
pub struct MutationExecutor<E> {
    cache: Arc<EntityCache<E>>,
    projections: ProjectionUpdater,
}

impl<E: Entity> MutationExecutor<E> {
    pub(crate) fn new(cache: Arc<EntityCache<E>>, projections: ProjectionUpdater) -> Self {
        Self { cache, projections }
    }

    /// Underlying cache
    #[must_use]
    pub fn cache(&self) -> &EntityCache<E> {
        &self.cache
    }

    /// Cached value of `target`
    ///
    /// # Errors
    /// Returns [`StoreError::NotLoaded`] if nothing is cached under `target`
    pub fn current(&self, target: &CacheKey) -> StoreResult<Arc<E>> {
        self.cache
            .get(target)
            .ok_or_else(|| StoreError::not_loaded(E::KIND, target))
    }

    /// Copy of the cached value of `target` with `patch` applied
    ///
    /// # Errors
    /// Returns [`StoreError::NotLoaded`] if nothing is cached under `target`
    pub fn patched(&self, target: &CacheKey, patch: impl FnOnce(&mut E)) -> StoreResult<E> {
        let mut next = E::clone(&*self.current(target)?);
        patch(&mut next);
        Ok(next)
    }

    /// Apply a mutation locally when `target` is in edit mode, remotely otherwise
    ///
    /// `remote` is only polled on the remote path.
    ///
    /// # Errors
    /// Returns the edit error on the local path and the API or merge error on
    /// the remote path
    pub async fn execute<D, L, Fut, Er>(
        &self,
        target: &CacheKey,
        overlays: &OverlaySet<D>,
        local: L,
        commit: Commit,
        remote: Fut,
    ) -> StoreResult<Applied<E>>
    where
        D: Draft<Canonical = E>,
        L: FnOnce(&mut D) -> OverlayResult<()>,
        Fut: Future<Output = Result<E, Er>>,
        StoreError: From<Er>,
    {
        if overlays.is_active(target) {
            overlays.mutate(target, local)?;
            return Ok(Applied::Local);
        }
        self.write(target, commit, remote).await
    }

    /// Issue a remote write and commit its result
    ///
    /// # Errors
    /// Returns the API error, leaving the cache untouched, or a merge error
    pub async fn write<Fut, Er>(&self, target: &CacheKey, commit: Commit, remote: Fut) -> StoreResult<Applied<E>>
    where
        Fut: Future<Output = Result<E, Er>>,
        StoreError: From<Er>,
    {
        let value = match remote.await {
            Ok(value) => value,
            Err(e) => {
                let e = StoreError::from(e);
                tracing::debug!(kind = %E::KIND, %target, error = %e, "mutation rejected; cache untouched");
                return Err(e);
            }
        };
        self.commit(target, commit, value).map(Applied::Remote)
    }

    /// Store the result of a successful write to `target`
    ///
    /// A result carrying another name moves the entry. Any change of the
    /// summary fields is pushed to the project's name index.
    ///
    /// # Errors
    /// Returns error if the response cannot be merged over the prior value
    pub fn commit(&self, target: &CacheKey, commit: Commit, value: E) -> StoreResult<Arc<E>> {
        let prior = self.cache.get(target);
        let next = match (&prior, commit) {
            (Some(prior), Commit::Merge) => E::merge_response(prior, value)?,
            _ => {
                let mut value = value;
                value.sanitize();
                value
            }
        };
        let summary_changed = prior.as_ref().map_or(true, |p| p.summary() != next.summary());

        let stored = if next.name() == target.name {
            self.cache.put(target.clone(), next)
        } else {
            let to = target.renamed(next.name());
            tracing::info!(kind = %E::KIND, from = %target, %to, "entity renamed");
            self.cache.rekey(target, to, next)
        };
        if summary_changed {
            self.projections
                .on_child_changed(&target.project, &target.name, stored.as_ref());
        }
        Ok(stored)
    }

    /// Issue a remote creation and cache the created entity
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn create<Fut, Er>(&self, project: &ProjectKey, remote: Fut) -> StoreResult<Arc<E>>
    where
        Fut: Future<Output = Result<E, Er>>,
        StoreError: From<Er>,
    {
        let mut created = remote.await?;
        created.sanitize();
        let name = created.name().to_string();
        tracing::info!(kind = %E::KIND, %project, %name, "entity created");
        let stored = self.cache.load(CacheKey::new(project.clone(), name.as_str()), created);
        self.projections.on_child_changed(project, &name, stored.as_ref());
        Ok(stored)
    }

    /// Issue a remote deletion, then evict and drop the index entry
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn delete<Fut, T, Er>(&self, target: &CacheKey, remote: Fut) -> StoreResult<Applied<E>>
    where
        Fut: Future<Output = Result<T, Er>>,
        StoreError: From<Er>,
    {
        remote.await?;
        self.cache.evict(target);
        self.projections
            .on_child_removed::<E>(&target.project, &target.name);
        tracing::info!(kind = %E::KIND, %target, "entity deleted");
        Ok(Applied::Removed)
    }

    /// Cache a value freshly fetched from the server
    pub fn load(&self, target: CacheKey, mut value: E) -> Arc<E> {
        value.sanitize();
        self.cache.load(target, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::ProjectSlot;
    use cds_api::{ApiError, Method};
    use cds_model::{Application, Pipeline, Project};
    use cds_overlay::PipelineDraft;
    use parking_lot::RwLock;
    use pretty_assertions::assert_eq;

    fn key() -> ProjectKey {
        ProjectKey::new("test1").unwrap()
    }

    fn executor<E: Entity>() -> (MutationExecutor<E>, ProjectSlot) {
        let mut project = Project::new(key(), "Test 1");
        project.application_names = Some(Vec::new());
        project.pipeline_names = Some(Vec::new());
        let slot: ProjectSlot = Arc::new(RwLock::new(Some(Arc::new(project))));
        let executor = MutationExecutor::new(
            Arc::new(EntityCache::new()),
            ProjectionUpdater::new(Arc::clone(&slot)),
        );
        (executor, slot)
    }

    #[tokio::test]
    async fn rejected_write_keeps_same_arc() {
        let (executor, _) = executor::<Application>();
        let target = CacheKey::new(key(), "app1");
        let before = executor.cache().load(target.clone(), Application::named("app1"));

        let result = executor
            .write(
                &target,
                Commit::Merge,
                async { Err::<Application, _>(ApiError::status(Method::Put, "/x", 500, "boom")) },
            )
            .await;
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &executor.cache().get(&target).unwrap()));
    }

    #[tokio::test]
    async fn merge_keeps_audits_missing_from_response() {
        let (executor, _) = executor::<Pipeline>();
        let target = CacheKey::new(key(), "build");
        let mut prior = Pipeline::named("build");
        prior.audits = Some(vec![serde_json::json!({"id": 1})]);
        executor.cache().load(target.clone(), prior);

        let mut response = Pipeline::named("build");
        response.description = Some("new".to_string());
        let applied = executor
            .write(&target, Commit::Merge, async { Ok::<_, StoreError>(response) })
            .await
            .unwrap();

        let stored = applied.value().unwrap();
        assert_eq!(stored.description.as_deref(), Some("new"));
        assert_eq!(stored.audits.as_ref().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn replace_can_clear_fields() {
        let (executor, _) = executor::<Application>();
        let target = CacheKey::new(key(), "app1");
        let mut prior = Application::named("app1");
        prior.vcs_server = Some("github".to_string());
        executor.cache().load(target.clone(), prior);

        let next = executor.patched(&target, |a| a.vcs_server = None).unwrap();
        executor
            .write(&target, Commit::Replace, async { Ok::<_, StoreError>(next) })
            .await
            .unwrap();
        assert!(executor.cache().get(&target).unwrap().vcs_server.is_none());
    }

    #[tokio::test]
    async fn active_overlay_short_circuits() {
        let (executor, _) = executor::<Pipeline>();
        let target = CacheKey::new(key(), "build");
        let mut pipeline = Pipeline::named("build");
        pipeline.from_repository = Some("https://git/repo.git".to_string());
        let canonical = executor.cache().load(target.clone(), pipeline.clone());
        let overlays = OverlaySet::<PipelineDraft>::new(true);
        overlays.sync(&target, &pipeline);

        let applied = executor
            .execute(
                &target,
                &overlays,
                |d: &mut PipelineDraft| d.add_stage(cds_model::Stage::named("test", 0)).map(|_| ()),
                Commit::Replace,
                async { Err::<Pipeline, _>(StoreError::Config("must not run".to_string())) },
            )
            .await
            .unwrap();

        assert!(applied.is_local());
        assert!(overlays.changed(&target));
        assert!(Arc::ptr_eq(&canonical, &executor.cache().get(&target).unwrap()));
    }

    #[tokio::test]
    async fn create_appends_to_index_and_delete_removes() {
        let (executor, slot) = executor::<Application>();
        executor
            .create(&key(), async { Ok::<_, StoreError>(Application::named("app1")) })
            .await
            .unwrap();
        let names = slot.read().as_ref().unwrap().application_names.clone().unwrap();
        assert_eq!(names.len(), 1);

        let target = CacheKey::new(key(), "app1");
        executor
            .delete(&target, async { Ok::<_, StoreError>(()) })
            .await
            .unwrap();
        assert!(executor.cache().is_empty());
        assert!(slot.read().as_ref().unwrap().application_names.as_ref().unwrap().is_empty());
    }
}
