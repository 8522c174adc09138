//! Pipeline draft: stages, jobs and parameters addressed by reference

use crate::arena::Arena;
use crate::error::OverlayResult;
use crate::overlay::Draft;
use crate::reference::{RefAllocator, SyntheticRef};
use cds_model::{Job, Parameter, Pipeline, Stage};

#[derive(Debug, Clone)]
struct StageSlot {
    stage: Stage,
    jobs: Vec<SyntheticRef>,
}

#[derive(Debug, Clone)]
struct JobSlot {
    stage: SyntheticRef,
    job: Job,
}

/// Working copy of a pipeline
#[derive(Debug, Clone)]
pub struct PipelineDraft {
    header: Pipeline,
    stage_order: Vec<SyntheticRef>,
    stages: Arena<StageSlot>,
    jobs: Arena<JobSlot>,
    param_order: Vec<SyntheticRef>,
    parameters: Arena<Parameter>,
    stage_refs: RefAllocator,
    job_refs: RefAllocator,
    param_refs: RefAllocator,
}

impl PipelineDraft {
    fn insert_stage(&mut self, mut stage: Stage) -> SyntheticRef {
        let stage_ref = self.stage_refs.assign(None, None, stage.id);
        let jobs = stage.jobs.take().unwrap_or_default();
        let job_refs = jobs
            .into_iter()
            .map(|job| self.insert_job(&stage_ref, job))
            .collect();
        self.stages.insert(
            stage_ref.clone(),
            StageSlot {
                stage,
                jobs: job_refs,
            },
        );
        stage_ref
    }

    fn insert_job(&mut self, stage: &SyntheticRef, job: Job) -> SyntheticRef {
        let job_ref = self.job_refs.assign(None, None, job.pipeline_action_id);
        self.jobs.insert(
            job_ref.clone(),
            JobSlot {
                stage: stage.clone(),
                job,
            },
        );
        job_ref
    }

    fn renumber(&mut self) -> OverlayResult<()> {
        for (index, stage_ref) in self.stage_order.clone().iter().enumerate() {
            let order = i32::try_from(index + 1).unwrap_or(i32::MAX);
            self.stages.get_mut(stage_ref)?.stage.build_order = order;
        }
        Ok(())
    }

    /// Stage references in build order
    #[must_use]
    pub fn stages(&self) -> &[SyntheticRef] {
        &self.stage_order
    }

    /// Parameter references in declaration order
    #[must_use]
    pub fn parameters(&self) -> &[SyntheticRef] {
        &self.param_order
    }

    /// Job references of a stage
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn jobs_of(&self, stage: &SyntheticRef) -> OverlayResult<Vec<SyntheticRef>> {
        self.stages.get(stage).map(|slot| slot.jobs.clone())
    }

    /// Reference of the first stage with that name
    #[must_use]
    pub fn find_stage(&self, name: &str) -> Option<SyntheticRef> {
        self.stages.find(|slot| slot.stage.name == name)
    }

    /// Reference of the first job whose action has that name
    #[must_use]
    pub fn find_job(&self, name: &str) -> Option<SyntheticRef> {
        self.jobs.find(|slot| slot.job.action.name == name)
    }

    /// Reference of the parameter with that name
    #[must_use]
    pub fn find_parameter(&self, name: &str) -> Option<SyntheticRef> {
        self.parameters.find(|p| p.name == name)
    }

    /// Stage behind a reference, without its jobs
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn stage(&self, reference: &SyntheticRef) -> OverlayResult<&Stage> {
        self.stages.get(reference).map(|slot| &slot.stage)
    }

    /// Job behind a reference, with the reference of its stage
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the job is unknown
    pub fn job(&self, reference: &SyntheticRef) -> OverlayResult<(&SyntheticRef, &Job)> {
        self.jobs.get(reference).map(|slot| (&slot.stage, &slot.job))
    }

    /// Copy the header fields of `changes`: name and description
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn update_header(&mut self, changes: &Pipeline) -> OverlayResult<()> {
        self.header.name.clone_from(&changes.name);
        self.header.description.clone_from(&changes.description);
        Ok(())
    }

    /// Append a stage at the end of the build order
    ///
    /// # Errors
    /// Returns an error only if the draft is already inconsistent
    pub fn add_stage(&mut self, stage: Stage) -> OverlayResult<SyntheticRef> {
        let stage_ref = self.insert_stage(stage);
        self.stage_order.push(stage_ref.clone());
        self.renumber()?;
        Ok(stage_ref)
    }

    /// Overwrite a stage's own fields, keeping its jobs and position
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn update_stage(&mut self, reference: &SyntheticRef, mut stage: Stage) -> OverlayResult<()> {
        let slot = self.stages.get_mut(reference)?;
        stage.jobs = None;
        stage.build_order = slot.stage.build_order;
        slot.stage = stage;
        Ok(())
    }

    /// Remove a stage and its jobs
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn delete_stage(&mut self, reference: &SyntheticRef) -> OverlayResult<Stage> {
        let slot = self.stages.remove(reference)?;
        self.stage_refs.release(reference);
        for job_ref in &slot.jobs {
            self.jobs.remove(job_ref)?;
            self.job_refs.release(job_ref);
        }
        self.stage_order.retain(|s| s != reference);
        self.renumber()?;
        Ok(slot.stage)
    }

    /// Move a stage to a 1-based build order position
    ///
    /// Positions past the end move the stage last.
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn move_stage(&mut self, reference: &SyntheticRef, build_order: usize) -> OverlayResult<()> {
        self.stages.get(reference)?;
        self.stage_order.retain(|s| s != reference);
        let index = build_order.saturating_sub(1).min(self.stage_order.len());
        self.stage_order.insert(index, reference.clone());
        self.renumber()
    }

    /// Append a job to a stage
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the stage is unknown
    pub fn add_job(&mut self, stage: &SyntheticRef, job: Job) -> OverlayResult<SyntheticRef> {
        self.stages.get(stage)?;
        let job_ref = self.insert_job(stage, job);
        self.stages.get_mut(stage)?.jobs.push(job_ref.clone());
        Ok(job_ref)
    }

    /// Replace a job
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the job is unknown
    pub fn update_job(&mut self, reference: &SyntheticRef, job: Job) -> OverlayResult<()> {
        self.jobs.get_mut(reference)?.job = job;
        Ok(())
    }

    /// Remove a job
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the job is unknown
    pub fn delete_job(&mut self, reference: &SyntheticRef) -> OverlayResult<Job> {
        let stage = self.jobs.get(reference)?.stage.clone();
        self.stages.get_mut(&stage)?.jobs.retain(|j| j != reference);
        self.job_refs.release(reference);
        Ok(self.jobs.remove(reference)?.job)
    }

    /// Append a parameter
    ///
    /// # Errors
    /// Never fails; returns a result to compose inside overlay edits
    pub fn add_parameter(&mut self, parameter: Parameter) -> OverlayResult<SyntheticRef> {
        let param_ref = self.param_refs.assign(None, None, parameter.id);
        self.parameters.insert(param_ref.clone(), parameter);
        self.param_order.push(param_ref.clone());
        Ok(param_ref)
    }

    /// Replace a parameter
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the parameter is unknown
    pub fn update_parameter(&mut self, reference: &SyntheticRef, parameter: Parameter) -> OverlayResult<()> {
        *self.parameters.get_mut(reference)? = parameter;
        Ok(())
    }

    /// Remove a parameter
    ///
    /// # Errors
    /// Returns [`crate::OverlayError::Desync`] if the parameter is unknown
    pub fn delete_parameter(&mut self, reference: &SyntheticRef) -> OverlayResult<Parameter> {
        let parameter = self.parameters.remove(reference)?;
        self.param_refs.release(reference);
        self.param_order.retain(|p| p != reference);
        Ok(parameter)
    }

    fn build(&self) -> OverlayResult<Pipeline> {
        let mut pipeline = self.header.clone();
        let stages = self
            .stage_order
            .iter()
            .map(|stage_ref| -> OverlayResult<Stage> {
                let slot = self.stages.get(stage_ref)?;
                let jobs = slot
                    .jobs
                    .iter()
                    .map(|j| self.jobs.get(j).map(|s| s.job.clone()))
                    .collect::<OverlayResult<Vec<_>>>()?;
                let mut stage = slot.stage.clone();
                stage.jobs = Some(jobs);
                Ok(stage)
            })
            .collect::<OverlayResult<Vec<_>>>()?;
        let parameters = self
            .param_order
            .iter()
            .map(|p| self.parameters.get(p).cloned())
            .collect::<OverlayResult<Vec<_>>>()?;
        pipeline.stages = Some(stages);
        pipeline.parameters = Some(parameters);
        Ok(pipeline)
    }
}

impl Draft for PipelineDraft {
    type Canonical = Pipeline;

    fn derive(canonical: &Pipeline) -> Self {
        let mut header = canonical.clone();
        let mut stages = header.stages.take().unwrap_or_default();
        let parameters = header.parameters.take().unwrap_or_default();
        stages.sort_by_key(|s| s.build_order);

        let mut draft = Self {
            header,
            stage_order: Vec::new(),
            stages: Arena::new("stage"),
            jobs: Arena::new("job"),
            param_order: Vec::new(),
            parameters: Arena::new("parameter"),
            stage_refs: RefAllocator::new(),
            job_refs: RefAllocator::new(),
            param_refs: RefAllocator::new(),
        };
        for stage in stages {
            let stage_ref = draft.insert_stage(stage);
            draft.stage_order.push(stage_ref);
        }
        for parameter in parameters {
            let param_ref = draft.param_refs.assign(None, None, parameter.id);
            draft.parameters.insert(param_ref.clone(), parameter);
            draft.param_order.push(param_ref);
        }
        draft
    }

    fn materialize(&self) -> Pipeline {
        self.build().unwrap_or_else(|_| self.header.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pipeline() -> Pipeline {
        let mut compile = Stage::named("Compile", 1);
        compile.id = Some(1);
        compile.jobs = Some(vec![Job::named("make")]);
        let mut test = Stage::named("Test", 2);
        test.id = Some(2);

        let mut pip = Pipeline::named("build");
        pip.stages = Some(vec![test, compile]);
        pip.parameters = Some(vec![Parameter::new("branch", "master")]);
        pip
    }

    fn stage_names(pip: &Pipeline) -> Vec<(String, i32)> {
        pip.stages
            .iter()
            .flatten()
            .map(|s| (s.name.clone(), s.build_order))
            .collect()
    }

    #[test]
    fn derive_orders_stages() {
        let draft = PipelineDraft::derive(&pipeline());
        assert_eq!(draft.stages()[0], SyntheticRef::from_server_id(1));
        assert_eq!(
            stage_names(&draft.materialize()),
            vec![("Compile".to_string(), 1), ("Test".to_string(), 2)]
        );
    }

    #[test]
    fn move_stage_renumbers() {
        let mut draft = PipelineDraft::derive(&pipeline());
        let test = draft.find_stage("Test").unwrap();
        draft.add_stage(Stage::named("Deploy", 0)).unwrap();

        draft.move_stage(&test, 1).unwrap();
        assert_eq!(
            stage_names(&draft.materialize()),
            vec![
                ("Test".to_string(), 1),
                ("Compile".to_string(), 2),
                ("Deploy".to_string(), 3)
            ]
        );
    }

    #[test]
    fn delete_stage_drops_jobs() {
        let mut draft = PipelineDraft::derive(&pipeline());
        let compile = draft.find_stage("Compile").unwrap();
        let make = draft.find_job("make").unwrap();

        draft.delete_stage(&compile).unwrap();
        assert!(draft.update_job(&make, Job::named("x")).unwrap_err().is_desync());
        assert_eq!(stage_names(&draft.materialize()), vec![("Test".to_string(), 1)]);
    }

    #[test]
    fn job_edits() {
        let mut draft = PipelineDraft::derive(&pipeline());
        let test = draft.find_stage("Test").unwrap();
        let lint = draft.add_job(&test, Job::named("lint")).unwrap();
        draft.update_job(&lint, Job::named("clippy")).unwrap();

        let out = draft.materialize();
        let test_stage = &out.stages.as_ref().unwrap()[1];
        assert_eq!(test_stage.jobs.as_ref().unwrap()[0].action.name, "clippy");

        assert_eq!(draft.delete_job(&lint).unwrap().action.name, "clippy");
        assert!(draft.jobs_of(&test).unwrap().is_empty());
    }

    #[test]
    fn parameter_edits() {
        let mut draft = PipelineDraft::derive(&pipeline());
        let branch = draft.find_parameter("branch").unwrap();
        draft
            .update_parameter(&branch, Parameter::new("branch", "main"))
            .unwrap();
        draft.add_parameter(Parameter::new("env", "prod")).unwrap();

        let params = draft.materialize().parameters.unwrap();
        assert_eq!(params[0].value, "main");
        assert_eq!(params[1].name, "env");

        draft.delete_parameter(&branch).unwrap();
        assert_eq!(draft.parameters().len(), 1);
    }

    #[test]
    fn header_update_keeps_stages() {
        let mut draft = PipelineDraft::derive(&pipeline());
        let mut changes = Pipeline::named("renamed");
        changes.description = Some("new".to_string());
        draft.update_header(&changes).unwrap();

        let pip = draft.materialize();
        assert_eq!(pip.name, "renamed");
        assert_eq!(stage_names(&pip).len(), 2);
    }
}
