//! Pipeline store
//!
//! Stages and jobs are addressed by [`SyntheticRef`] in both modes. On the
//! server path the reference is resolved against a draft derived from the
//! cached pipeline to find the server id.

use crate::error::{StoreError, StoreResult};
use crate::executor::{Applied, Commit, MutationExecutor};
use crate::overlays::OverlaySet;
use crate::projection::ProjectionUpdater;
use cds_api::CdsClient;
use cds_cache::{CacheKey, EntityCache};
use cds_model::{Job, Parameter, Pipeline, ProjectKey, Stage};
use cds_overlay::{Draft, OverlayError, PipelineDraft, SyntheticRef};
use std::sync::Arc;

/// Cached pipelines of the loaded project, with their edit overlays
#[derive(Debug)]
pub struct PipelinesStore {
    client: CdsClient,
    executor: MutationExecutor<Pipeline>,
    overlays: OverlaySet<PipelineDraft>,
}

impl PipelinesStore {
    pub(crate) fn new(
        client: CdsClient,
        cache: Arc<EntityCache<Pipeline>>,
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
    pub fn cache(&self) -> &EntityCache<Pipeline> {
        self.executor.cache()
    }

    /// Edit overlays
    #[must_use]
    pub fn overlays(&self) -> &OverlaySet<PipelineDraft> {
        &self.overlays
    }

    /// Cached pipeline
    #[must_use]
    pub fn get(&self, project: &ProjectKey, name: &str) -> Option<Arc<Pipeline>> {
        self.cache().get(&CacheKey::new(project.clone(), name))
    }

    /// Pipeline as the user sees it: the draft in edit mode, the cached value otherwise
    #[must_use]
    pub fn view(&self, project: &ProjectKey, name: &str) -> Option<Pipeline> {
        let key = CacheKey::new(project.clone(), name);
        self.overlays
            .snapshot(&key)
            .or_else(|| self.cache().get(&key).map(|p| Pipeline::clone(&p)))
    }

    /// Cached pipeline, fetched when absent or changed elsewhere
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn fetch(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Pipeline>> {
        let key = CacheKey::new(project.clone(), name);
        match self.cache().get(&key) {
            Some(pipeline) if !self.cache().is_external(&key) => Ok(pipeline),
            _ => self.resync(project, name).await,
        }
    }

    /// Fetch a pipeline from the server, whatever is cached
    ///
    /// # Errors
    /// Returns the API error of the fetch
    pub async fn resync(&self, project: &ProjectKey, name: &str) -> StoreResult<Arc<Pipeline>> {
        let pipeline = self.client.get_pipeline(project, name).await?;
        let key = CacheKey::new(project.clone(), name);
        let stored = self.executor.load(key.clone(), pipeline);
        self.overlays.sync(&key, &stored);
        Ok(stored)
    }

    /// Create a pipeline
    ///
    /// # Errors
    /// Returns the API error; nothing is cached in that case
    pub async fn add(&self, project: &ProjectKey, pipeline: &Pipeline) -> StoreResult<Arc<Pipeline>> {
        self.executor
            .create(project, self.client.create_pipeline(project, pipeline))
            .await
    }

    /// Update a pipeline's own fields, possibly renaming it
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn update(&self, project: &ProjectKey, name: &str, changes: &Pipeline) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.update_header(changes),
                Commit::Merge,
                self.client.update_pipeline(project, name, changes),
            )
            .await
    }

    /// Delete a pipeline
    ///
    /// # Errors
    /// Returns the API error; the cache is untouched in that case
    pub async fn delete(&self, project: &ProjectKey, name: &str) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let applied = self
            .executor
            .delete(&target, self.client.delete_pipeline(project, name))
            .await?;
        self.overlays.discard(&target);
        Ok(applied)
    }

    /// Add a parameter
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::NotLoaded`]
    pub async fn add_parameter(&self, project: &ProjectKey, name: &str, parameter: &Parameter) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.add_pipeline_parameter(project, name, parameter).await?;
            self.with_parameters(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.add_parameter(parameter.clone()).map(|_| ()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Replace the parameter currently named `param_name`
    ///
    /// # Errors
    /// Returns the API error, [`StoreError::NotLoaded`], or
    /// [`OverlayError::UnknownName`] in edit mode
    pub async fn update_parameter(
        &self,
        project: &ProjectKey,
        name: &str,
        param_name: &str,
        parameter: &Parameter,
    ) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self
                .client
                .update_pipeline_parameter(project, name, param_name, parameter)
                .await?;
            self.with_parameters(&target, response)
        };
        let local = |d: &mut PipelineDraft| {
            let reference = d
                .find_parameter(param_name)
                .ok_or_else(|| OverlayError::unknown_name("parameter", param_name))?;
            d.update_parameter(&reference, parameter.clone())
        };
        self.executor
            .execute(&target, &self.overlays, local, Commit::Replace, remote)
            .await
    }

    /// Remove a parameter
    ///
    /// # Errors
    /// Returns the API error, [`StoreError::NotLoaded`], or
    /// [`OverlayError::UnknownName`] in edit mode
    pub async fn delete_parameter(&self, project: &ProjectKey, name: &str, param_name: &str) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.delete_pipeline_parameter(project, name, param_name).await?;
            self.with_parameters(&target, response)
        };
        let local = |d: &mut PipelineDraft| {
            let reference = d
                .find_parameter(param_name)
                .ok_or_else(|| OverlayError::unknown_name("parameter", param_name))?;
            d.delete_parameter(&reference).map(|_| ())
        };
        self.executor
            .execute(&target, &self.overlays, local, Commit::Replace, remote)
            .await
    }

    fn with_parameters(&self, target: &CacheKey, response: Pipeline) -> StoreResult<Pipeline> {
        self.executor
            .patched(target, |p| p.parameters = Some(response.parameters.unwrap_or_default()))
    }

    /// Append a stage
    ///
    /// # Errors
    /// Returns the API error, or [`StoreError::NotLoaded`]
    pub async fn add_stage(&self, project: &ProjectKey, name: &str, stage: &Stage) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let response = self.client.add_stage(project, name, stage).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.add_stage(stage.clone()).map(|_| ()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Overwrite a stage's own fields
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn update_stage(
        &self,
        project: &ProjectKey,
        name: &str,
        stage_ref: &SyntheticRef,
        stage: &Stage,
    ) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let stage_id = self.stage_id(&target, stage_ref)?;
            let response = self.client.update_stage(project, name, stage_id, stage).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.update_stage(stage_ref, stage.clone()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Remove a stage and its jobs
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn delete_stage(&self, project: &ProjectKey, name: &str, stage_ref: &SyntheticRef) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let stage_id = self.stage_id(&target, stage_ref)?;
            let response = self.client.delete_stage(project, name, stage_id).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.delete_stage(stage_ref).map(|_| ()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Move a stage to a 1-based build order
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn move_stage(
        &self,
        project: &ProjectKey,
        name: &str,
        stage_ref: &SyntheticRef,
        build_order: usize,
    ) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let mut stage = self.resolve(&target, |d| d.stage(stage_ref).cloned())?;
            if stage.id.is_none() {
                return Err(StoreError::MissingServerId {
                    kind: "stage",
                    reference: stage_ref.clone(),
                });
            }
            stage.build_order = i32::try_from(build_order).unwrap_or(i32::MAX);
            let response = self.client.move_stage(project, name, &stage).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.move_stage(stage_ref, build_order),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Add a job to a stage
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn add_job(
        &self,
        project: &ProjectKey,
        name: &str,
        stage_ref: &SyntheticRef,
        job: &Job,
    ) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let stage_id = self.stage_id(&target, stage_ref)?;
            let response = self.client.add_job(project, name, stage_id, job).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.add_job(stage_ref, job.clone()).map(|_| ()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Overwrite a job
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn update_job(
        &self,
        project: &ProjectKey,
        name: &str,
        job_ref: &SyntheticRef,
        job: &Job,
    ) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let (stage_id, job_id) = self.job_ids(&target, job_ref)?;
            let response = self
                .client
                .update_job(project, name, stage_id, job_id, job)
                .await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.update_job(job_ref, job.clone()),
                Commit::Replace,
                remote,
            )
            .await
    }

    /// Remove a job
    ///
    /// # Errors
    /// Returns the API error, a desync for an unknown reference, or
    /// [`StoreError::MissingServerId`]
    pub async fn delete_job(&self, project: &ProjectKey, name: &str, job_ref: &SyntheticRef) -> StoreResult<Applied<Pipeline>> {
        let target = CacheKey::new(project.clone(), name);
        let remote = async {
            let (stage_id, job_id) = self.job_ids(&target, job_ref)?;
            let response = self.client.delete_job(project, name, stage_id, job_id).await?;
            self.with_stages(&target, response)
        };
        self.executor
            .execute(
                &target,
                &self.overlays,
                |d: &mut PipelineDraft| d.delete_job(job_ref).map(|_| ()),
                Commit::Replace,
                remote,
            )
            .await
    }

    fn with_stages(&self, target: &CacheKey, response: Pipeline) -> StoreResult<Pipeline> {
        self.executor
            .patched(target, |p| p.stages = Some(response.stages.unwrap_or_default()))
    }

    /// Run a lookup against a draft derived from the cached pipeline
    fn resolve<R>(
        &self,
        target: &CacheKey,
        lookup: impl FnOnce(&PipelineDraft) -> Result<R, OverlayError>,
    ) -> StoreResult<R> {
        let draft = PipelineDraft::derive(&*self.executor.current(target)?);
        Ok(lookup(&draft)?)
    }

    fn stage_id(&self, target: &CacheKey, stage_ref: &SyntheticRef) -> StoreResult<i64> {
        self.resolve(target, |d| d.stage(stage_ref).map(|s| s.id))?
            .ok_or_else(|| StoreError::MissingServerId {
                kind: "stage",
                reference: stage_ref.clone(),
            })
    }

    fn job_ids(&self, target: &CacheKey, job_ref: &SyntheticRef) -> StoreResult<(i64, i64)> {
        let (stage_id, job_id) = self.resolve(target, |d| {
            let (stage_ref, job) = d.job(job_ref)?;
            Ok((d.stage(stage_ref)?.id, job.pipeline_action_id))
        })?;
        stage_id.zip(job_id).ok_or_else(|| StoreError::MissingServerId {
            kind: "job",
            reference: job_ref.clone(),
        })
    }

    /// Throw local edits away and restart from the cached value
    ///
    /// # Errors
    /// Returns [`StoreError::NotLoaded`] if the pipeline is not cached
    pub fn cancel_edits(&self, project: &ProjectKey, name: &str) -> StoreResult<bool> {
        let target = CacheKey::new(project.clone(), name);
        let canonical = self.executor.current(&target)?;
        Ok(self.overlays.cancel(&target, &canonical))
    }

    /// Flag a cached pipeline as changed elsewhere
    pub fn external_change(&self, project: &ProjectKey, name: &str) -> bool {
        self.cache().mark_external(&CacheKey::new(project.clone(), name))
    }

    /// Drop one pipeline from the cache, with its overlay
    pub fn delete_from_cache(&self, project: &ProjectKey, name: &str) -> bool {
        let key = CacheKey::new(project.clone(), name);
        self.overlays.discard(&key);
        self.cache().evict(&key).is_some()
    }

    /// Drop every cached pipeline and overlay
    pub fn clear(&self) {
        self.overlays.clear();
        self.cache().clear();
    }
}
