use super::{child_path, project_path};
use crate::client::{segment, CdsClient};
use crate::error::ApiResult;
use crate::request::ApiRequest;
use cds_model::{Application, Key, ProjectKey, Variable};

/// Expansion flags sent when loading one application
const APPLICATION_FLAGS: [&str; 6] = [
    "withNotifs",
    "withUsage",
    "withIcon",
    "withKeys",
    "withDeploymentStrategies",
    "withVulnerabilities",
];

fn application_path(key: &ProjectKey, name: &str) -> String {
    child_path(key, "application", name)
}

impl CdsClient {
    /// `GET /project/{key}/application/{name}` with every expansion flag
    pub async fn get_application(&self, key: &ProjectKey, name: &str) -> ApiResult<Application> {
        let request = APPLICATION_FLAGS
            .iter()
            .fold(ApiRequest::get(application_path(key, name)), |req, flag| {
                req.with_query(*flag, "true")
            });
        self.json(request).await
    }

    /// `POST /project/{key}/applications`
    pub async fn create_application(&self, key: &ProjectKey, app: &Application) -> ApiResult<Application> {
        let path = format!("{}/applications", project_path(key));
        self.json(ApiRequest::post(path).with_json(app)?).await
    }

    /// `POST /project/{key}/application/{source}/clone`
    pub async fn clone_application(
        &self,
        key: &ProjectKey,
        source: &str,
        app: &Application,
    ) -> ApiResult<Application> {
        let path = format!("{}/clone", application_path(key, source));
        self.json(ApiRequest::post(path).with_json(app)?).await
    }

    /// `PUT /project/{key}/application/{name}`, `name` being the current name
    pub async fn update_application(
        &self,
        key: &ProjectKey,
        name: &str,
        app: &Application,
    ) -> ApiResult<Application> {
        self.json(ApiRequest::put(application_path(key, name)).with_json(app)?)
            .await
    }

    /// `DELETE /project/{key}/application/{name}`
    pub async fn delete_application(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(application_path(key, name))).await
    }

    /// `POST .../application/{name}/variable/{var}`
    pub async fn add_application_variable(
        &self,
        key: &ProjectKey,
        name: &str,
        variable: &Variable,
    ) -> ApiResult<Application> {
        let path = format!("{}/variable/{}", application_path(key, name), segment(&variable.name));
        self.json(ApiRequest::post(path).with_json(variable)?).await
    }

    /// `PUT .../application/{name}/variable/{var}`, `var` being the current name
    pub async fn update_application_variable(
        &self,
        key: &ProjectKey,
        name: &str,
        var_name: &str,
        variable: &Variable,
    ) -> ApiResult<Application> {
        let path = format!("{}/variable/{}", application_path(key, name), segment(var_name));
        self.json(ApiRequest::put(path).with_json(variable)?).await
    }

    /// `DELETE .../application/{name}/variable/{var}`
    pub async fn delete_application_variable(
        &self,
        key: &ProjectKey,
        name: &str,
        var_name: &str,
    ) -> ApiResult<Application> {
        let path = format!("{}/variable/{}", application_path(key, name), segment(var_name));
        self.json(ApiRequest::delete(path)).await
    }

    /// `POST .../application/{name}/keys`
    pub async fn add_application_key(&self, key: &ProjectKey, name: &str, app_key: &Key) -> ApiResult<Key> {
        let path = format!("{}/keys", application_path(key, name));
        self.json(ApiRequest::post(path).with_json(app_key)?).await
    }

    /// `DELETE .../application/{name}/keys/{key}`
    pub async fn delete_application_key(&self, key: &ProjectKey, name: &str, key_name: &str) -> ApiResult<()> {
        let path = format!("{}/keys/{}", application_path(key, name), segment(key_name));
        self.unit(ApiRequest::delete(path)).await
    }

    /// `POST .../application/{name}/deployment/config/{integration}`
    ///
    /// Adds or replaces the deployment configuration for an integration.
    pub async fn save_application_deployment(
        &self,
        key: &ProjectKey,
        name: &str,
        integration: &str,
        config: &serde_json::Value,
    ) -> ApiResult<Application> {
        let path = format!(
            "{}/deployment/config/{}",
            application_path(key, name),
            segment(integration)
        );
        self.json(ApiRequest::post(path).with_json(config)?).await
    }

    /// `DELETE .../application/{name}/deployment/config/{integration}`
    pub async fn delete_application_deployment(
        &self,
        key: &ProjectKey,
        name: &str,
        integration: &str,
    ) -> ApiResult<Application> {
        let path = format!(
            "{}/deployment/config/{}",
            application_path(key, name),
            segment(integration)
        );
        self.json(ApiRequest::delete(path)).await
    }

    /// `POST /project/{key}/repositories_manager/{manager}/application/{name}/attach`
    pub async fn attach_repository(
        &self,
        key: &ProjectKey,
        name: &str,
        repo_manager: &str,
        repo_fullname: &str,
    ) -> ApiResult<Application> {
        let path = format!(
            "{}/repositories_manager/{}/application/{}/attach",
            project_path(key),
            segment(repo_manager),
            segment(name)
        );
        let request = ApiRequest::post(path)
            .with_query("fullname", repo_fullname)
            .with_form(vec![("fullname".to_string(), repo_fullname.to_string())]);
        self.json(request).await
    }

    /// `POST /project/{key}/repositories_manager/{manager}/application/{name}/detach`
    pub async fn detach_repository(&self, key: &ProjectKey, name: &str, repo_manager: &str) -> ApiResult<Application> {
        let path = format!(
            "{}/repositories_manager/{}/application/{}/detach",
            project_path(key),
            segment(repo_manager),
            segment(name)
        );
        self.json(ApiRequest::post(path)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client_returning, key};
    use crate::request::{Body, Method};

    #[tokio::test]
    async fn get_application_sends_every_flag() {
        let (client, seen) = client_returning(serde_json::json!({"name": "app1"}));
        let app = client.get_application(&key("test1"), "app1").await.unwrap();
        assert_eq!(app.name, "app1");

        let req = seen.lock().unwrap()[0].clone();
        assert_eq!(req.path, "/project/test1/application/app1");
        assert_eq!(req.query.len(), APPLICATION_FLAGS.len());
        assert!(req.query.iter().all(|(_, v)| v == "true"));
    }

    #[tokio::test]
    async fn attach_repository_posts_form() {
        let (client, seen) = client_returning(serde_json::json!({"name": "app1", "vcs_server": "github"}));
        let app = client
            .attach_repository(&key("test1"), "app1", "github", "ovh/cds")
            .await
            .unwrap();
        assert_eq!(app.vcs_server.as_deref(), Some("github"));

        let req = seen.lock().unwrap()[0].clone();
        assert_eq!(req.method, Method::Post);
        assert_eq!(
            req.path,
            "/project/test1/repositories_manager/github/application/app1/attach"
        );
        assert_eq!(
            req.body,
            Body::Form(vec![("fullname".to_string(), "ovh/cds".to_string())])
        );
    }
}
