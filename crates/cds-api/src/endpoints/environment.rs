use super::{child_path, project_path};
use crate::client::{segment, CdsClient};
use crate::error::ApiResult;
use crate::request::ApiRequest;
use cds_model::{Environment, Key, Project, ProjectKey, Variable};

fn environment_path(key: &ProjectKey, name: &str) -> String {
    child_path(key, "environment", name)
}

impl CdsClient {
    /// `GET /project/{key}/environment/{name}`
    pub async fn get_environment(&self, key: &ProjectKey, name: &str) -> ApiResult<Environment> {
        let request = ApiRequest::get(environment_path(key, name)).with_query("withUsage", "true");
        self.json(request).await
    }

    /// `POST /project/{key}/environment`; returns the owning project
    pub async fn create_environment(&self, key: &ProjectKey, env: &Environment) -> ApiResult<Project> {
        let path = format!("{}/environment", project_path(key));
        self.json(ApiRequest::post(path).with_json(env)?).await
    }

    /// `POST /project/{key}/environment/{source}/clone/{name}`
    pub async fn clone_environment(&self, key: &ProjectKey, source: &str, env: &Environment) -> ApiResult<Project> {
        let path = format!("{}/clone/{}", environment_path(key, source), segment(&env.name));
        self.json(ApiRequest::post(path).with_json(env)?).await
    }

    /// `PUT /project/{key}/environment/{name}`, `name` being the current name
    pub async fn update_environment(&self, key: &ProjectKey, name: &str, env: &Environment) -> ApiResult<Project> {
        self.json(ApiRequest::put(environment_path(key, name)).with_json(env)?)
            .await
    }

    /// `DELETE /project/{key}/environment/{name}`
    pub async fn delete_environment(&self, key: &ProjectKey, name: &str) -> ApiResult<Project> {
        self.json(ApiRequest::delete(environment_path(key, name))).await
    }

    /// `POST .../environment/{name}/variable/{var}`
    pub async fn add_environment_variable(&self, key: &ProjectKey, name: &str, variable: &Variable) -> ApiResult<Variable> {
        let path = format!("{}/variable/{}", environment_path(key, name), segment(&variable.name));
        self.json(ApiRequest::post(path).with_json(variable)?).await
    }

    /// `PUT .../environment/{name}/variable/{var}`, `var` being the current name
    pub async fn update_environment_variable(
        &self,
        key: &ProjectKey,
        name: &str,
        var_name: &str,
        variable: &Variable,
    ) -> ApiResult<Variable> {
        let path = format!("{}/variable/{}", environment_path(key, name), segment(var_name));
        self.json(ApiRequest::put(path).with_json(variable)?).await
    }

    /// `DELETE .../environment/{name}/variable/{var}`
    pub async fn delete_environment_variable(&self, key: &ProjectKey, name: &str, var_name: &str) -> ApiResult<()> {
        let path = format!("{}/variable/{}", environment_path(key, name), segment(var_name));
        self.unit(ApiRequest::delete(path)).await
    }

    /// `POST .../environment/{name}/keys`
    pub async fn add_environment_key(&self, key: &ProjectKey, name: &str, env_key: &Key) -> ApiResult<Key> {
        let path = format!("{}/keys", environment_path(key, name));
        self.json(ApiRequest::post(path).with_json(env_key)?).await
    }

    /// `DELETE .../environment/{name}/keys/{key}`
    pub async fn delete_environment_key(&self, key: &ProjectKey, name: &str, key_name: &str) -> ApiResult<()> {
        let path = format!("{}/keys/{}", environment_path(key, name), segment(key_name));
        self.unit(ApiRequest::delete(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client_returning, key};

    #[tokio::test]
    async fn clone_targets_source_and_new_name() {
        let (client, seen) = client_returning(serde_json::json!({"key": "test1", "name": "Test 1"}));
        client
            .clone_environment(&key("test1"), "prod", &Environment::named("prod 2"))
            .await
            .unwrap();
        assert_eq!(
            seen.lock().unwrap()[0].path,
            "/project/test1/environment/prod/clone/prod%202"
        );
    }
}
