use super::{child_path, project_path};
use crate::client::{segment, CdsClient};
use crate::error::ApiResult;
use crate::request::ApiRequest;
use cds_model::{Job, Parameter, Pipeline, ProjectKey, Stage};

fn pipeline_path(key: &ProjectKey, name: &str) -> String {
    child_path(key, "pipeline", name)
}

fn stage_path(key: &ProjectKey, name: &str, stage_id: i64) -> String {
    format!("{}/stage/{stage_id}", pipeline_path(key, name))
}

impl CdsClient {
    /// `GET /project/{key}/pipeline/{name}`
    pub async fn get_pipeline(&self, key: &ProjectKey, name: &str) -> ApiResult<Pipeline> {
        let request = ApiRequest::get(pipeline_path(key, name)).with_query("withUsage", "true");
        self.json(request).await
    }

    /// `POST /project/{key}/pipelines`
    pub async fn create_pipeline(&self, key: &ProjectKey, pipeline: &Pipeline) -> ApiResult<Pipeline> {
        let path = format!("{}/pipelines", project_path(key));
        self.json(ApiRequest::post(path).with_json(pipeline)?).await
    }

    /// `PUT /project/{key}/pipeline/{name}`, `name` being the current name
    pub async fn update_pipeline(&self, key: &ProjectKey, name: &str, pipeline: &Pipeline) -> ApiResult<Pipeline> {
        self.json(ApiRequest::put(pipeline_path(key, name)).with_json(pipeline)?)
            .await
    }

    /// `DELETE /project/{key}/pipeline/{name}`
    pub async fn delete_pipeline(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(pipeline_path(key, name))).await
    }

    /// `POST .../pipeline/{name}/parameter/{param}`
    pub async fn add_pipeline_parameter(
        &self,
        key: &ProjectKey,
        name: &str,
        parameter: &Parameter,
    ) -> ApiResult<Pipeline> {
        let path = format!("{}/parameter/{}", pipeline_path(key, name), segment(&parameter.name));
        self.json(ApiRequest::post(path).with_json(parameter)?).await
    }

    /// `PUT .../pipeline/{name}/parameter/{param}`, `param` being the current name
    pub async fn update_pipeline_parameter(
        &self,
        key: &ProjectKey,
        name: &str,
        param_name: &str,
        parameter: &Parameter,
    ) -> ApiResult<Pipeline> {
        let path = format!("{}/parameter/{}", pipeline_path(key, name), segment(param_name));
        self.json(ApiRequest::put(path).with_json(parameter)?).await
    }

    /// `DELETE .../pipeline/{name}/parameter/{param}`
    pub async fn delete_pipeline_parameter(&self, key: &ProjectKey, name: &str, param_name: &str) -> ApiResult<Pipeline> {
        let path = format!("{}/parameter/{}", pipeline_path(key, name), segment(param_name));
        self.json(ApiRequest::delete(path)).await
    }

    /// `POST .../pipeline/{name}/stage`
    pub async fn add_stage(&self, key: &ProjectKey, name: &str, stage: &Stage) -> ApiResult<Pipeline> {
        let path = format!("{}/stage", pipeline_path(key, name));
        self.json(ApiRequest::post(path).with_json(stage)?).await
    }

    /// `PUT .../pipeline/{name}/stage/{id}`
    pub async fn update_stage(&self, key: &ProjectKey, name: &str, stage_id: i64, stage: &Stage) -> ApiResult<Pipeline> {
        self.json(ApiRequest::put(stage_path(key, name, stage_id)).with_json(stage)?)
            .await
    }

    /// `DELETE .../pipeline/{name}/stage/{id}`
    pub async fn delete_stage(&self, key: &ProjectKey, name: &str, stage_id: i64) -> ApiResult<Pipeline> {
        self.json(ApiRequest::delete(stage_path(key, name, stage_id)))
            .await
    }

    /// `POST .../pipeline/{name}/stage/move`; `stage.build_order` is the target position
    pub async fn move_stage(&self, key: &ProjectKey, name: &str, stage: &Stage) -> ApiResult<Pipeline> {
        let path = format!("{}/stage/move", pipeline_path(key, name));
        self.json(ApiRequest::post(path).with_json(stage)?).await
    }

    /// `POST .../pipeline/{name}/stage/{id}/job`
    pub async fn add_job(&self, key: &ProjectKey, name: &str, stage_id: i64, job: &Job) -> ApiResult<Pipeline> {
        let path = format!("{}/job", stage_path(key, name, stage_id));
        self.json(ApiRequest::post(path).with_json(job)?).await
    }

    /// `PUT .../pipeline/{name}/stage/{id}/job/{job}`
    pub async fn update_job(
        &self,
        key: &ProjectKey,
        name: &str,
        stage_id: i64,
        job_id: i64,
        job: &Job,
    ) -> ApiResult<Pipeline> {
        let path = format!("{}/job/{job_id}", stage_path(key, name, stage_id));
        self.json(ApiRequest::put(path).with_json(job)?).await
    }

    /// `DELETE .../pipeline/{name}/stage/{id}/job/{job}`
    pub async fn delete_job(&self, key: &ProjectKey, name: &str, stage_id: i64, job_id: i64) -> ApiResult<Pipeline> {
        let path = format!("{}/job/{job_id}", stage_path(key, name, stage_id));
        self.json(ApiRequest::delete(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client_returning, key};
    use crate::request::Method;

    #[tokio::test]
    async fn pipeline_paths_use_pipeline_segment() {
        let (client, seen) = client_returning(serde_json::json!({"name": "build"}));
        let k = key("test1");

        client.update_pipeline(&k, "build", &Pipeline::named("build")).await.unwrap();
        client.delete_job(&k, "build", 3, 9).await.unwrap();
        client.move_stage(&k, "build", &Stage::named("s", 2)).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].path, "/project/test1/pipeline/build");
        assert_eq!(seen[1].method, Method::Delete);
        assert_eq!(seen[1].path, "/project/test1/pipeline/build/stage/3/job/9");
        assert_eq!(seen[2].path, "/project/test1/pipeline/build/stage/move");
    }
}
