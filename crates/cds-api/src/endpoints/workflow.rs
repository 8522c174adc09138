use super::{child_path, project_path};
use crate::client::{segment, validate_yaml, CdsClient};
use crate::error::ApiResult;
use crate::request::ApiRequest;
use cds_model::{Audit, GroupPermission, ProjectKey, Workflow};

/// Expansion flags sent when loading one workflow
const WORKFLOW_FLAGS: [&str; 4] = ["withUsage", "withAudits", "withTemplate", "withAsCodeEvents"];

fn workflow_path(key: &ProjectKey, name: &str) -> String {
    child_path(key, "workflows", name)
}

/// Audit and rollback live under the singular `workflow` segment
fn workflow_history_path(key: &ProjectKey, name: &str) -> String {
    child_path(key, "workflow", name)
}

impl CdsClient {
    /// `GET /project/{key}/workflows/{name}` with every expansion flag
    pub async fn get_workflow(&self, key: &ProjectKey, name: &str) -> ApiResult<Workflow> {
        let request = WORKFLOW_FLAGS
            .iter()
            .fold(ApiRequest::get(workflow_path(key, name)), |req, flag| {
                req.with_query(*flag, "true")
            });
        self.json(request).await
    }

    /// `POST /project/{key}/workflows`
    pub async fn create_workflow(&self, key: &ProjectKey, workflow: &Workflow) -> ApiResult<Workflow> {
        let path = format!("{}/workflows", project_path(key));
        self.json(ApiRequest::post(path).with_json(workflow)?).await
    }

    /// `PUT /project/{key}/workflows/{name}`, `name` being the current name
    pub async fn update_workflow(&self, key: &ProjectKey, name: &str, workflow: &Workflow) -> ApiResult<Workflow> {
        self.json(ApiRequest::put(workflow_path(key, name)).with_json(workflow)?)
            .await
    }

    /// `DELETE /project/{key}/workflows/{name}`
    pub async fn delete_workflow(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(workflow_path(key, name))).await
    }

    /// `PUT .../workflows/{name}/icon`
    pub async fn put_workflow_icon(&self, key: &ProjectKey, name: &str, icon: &str) -> ApiResult<()> {
        let path = format!("{}/icon", workflow_path(key, name));
        self.unit(ApiRequest::put(path).with_json(icon)?).await
    }

    /// `DELETE .../workflows/{name}/icon`
    pub async fn delete_workflow_icon(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        let path = format!("{}/icon", workflow_path(key, name));
        self.unit(ApiRequest::delete(path)).await
    }

    /// `POST .../workflows/{name}/groups`
    pub async fn add_workflow_group(&self, key: &ProjectKey, name: &str, group: &GroupPermission) -> ApiResult<Workflow> {
        let path = format!("{}/groups", workflow_path(key, name));
        self.json(ApiRequest::post(path).with_json(group)?).await
    }

    /// `PUT .../workflows/{name}/groups/{group}`
    pub async fn update_workflow_group(
        &self,
        key: &ProjectKey,
        name: &str,
        group: &GroupPermission,
    ) -> ApiResult<Workflow> {
        let path = format!("{}/groups/{}", workflow_path(key, name), segment(&group.group.name));
        self.json(ApiRequest::put(path).with_json(group)?).await
    }

    /// `DELETE .../workflows/{name}/groups/{group}`
    pub async fn delete_workflow_group(&self, key: &ProjectKey, name: &str, group: &str) -> ApiResult<Workflow> {
        let path = format!("{}/groups/{}", workflow_path(key, name), segment(group));
        self.json(ApiRequest::delete(path)).await
    }

    /// `DELETE .../workflows/{name}/eventsintegration/{id}`
    pub async fn delete_workflow_event_integration(
        &self,
        key: &ProjectKey,
        name: &str,
        integration_id: i64,
    ) -> ApiResult<()> {
        let path = format!("{}/eventsintegration/{integration_id}", workflow_path(key, name));
        self.unit(ApiRequest::delete(path)).await
    }

    /// `GET .../workflow/{name}/audits`
    pub async fn get_workflow_audits(&self, key: &ProjectKey, name: &str) -> ApiResult<Vec<Audit>> {
        let path = format!("{}/audits", workflow_history_path(key, name));
        self.json(ApiRequest::get(path)).await
    }

    /// `POST .../workflow/{name}/rollback/{audit}`
    pub async fn rollback_workflow(&self, key: &ProjectKey, name: &str, audit_id: i64) -> ApiResult<Workflow> {
        let path = format!("{}/rollback/{audit_id}", workflow_history_path(key, name));
        self.json(ApiRequest::post(path).with_json(&serde_json::json!({}))?)
            .await
    }

    /// `GET /project/{key}/export/workflows/{name}?format=yaml`
    pub async fn export_workflow(&self, key: &ProjectKey, name: &str) -> ApiResult<String> {
        let path = format!("{}/export/workflows/{}", project_path(key), segment(name));
        let request = ApiRequest::get(path)
            .with_query("format", "yaml")
            .with_query("withPermissions", "true");
        self.text(request).await
    }

    /// Import a workflow from YAML
    ///
    /// `POST /project/{key}/import/workflows`, or `PUT .../{name}` to replace
    /// an existing workflow. Returns the server messages.
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidPayload`](crate::ApiError::InvalidPayload)
    /// without sending anything if `code` is not YAML
    pub async fn import_workflow(&self, key: &ProjectKey, name: Option<&str>, code: &str) -> ApiResult<Vec<String>> {
        validate_yaml(code)?;
        let base = format!("{}/import/workflows", project_path(key));
        let request = match name {
            Some(name) => ApiRequest::put(format!("{base}/{}", segment(name))),
            None => ApiRequest::post(base),
        };
        self.json(request.with_query("format", "yaml").with_yaml(code))
            .await
    }

    /// `POST /project/{key}/preview/workflows`: the workflow `code` would produce
    ///
    /// # Errors
    /// Returns [`ApiError::InvalidPayload`](crate::ApiError::InvalidPayload)
    /// without sending anything if `code` is not YAML
    pub async fn preview_workflow(&self, key: &ProjectKey, code: &str) -> ApiResult<Workflow> {
        validate_yaml(code)?;
        let path = format!("{}/preview/workflows", project_path(key));
        let request = ApiRequest::post(path).with_query("format", "yaml").with_yaml(code);
        self.json(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client_returning, key};
    use crate::error::ApiError;
    use crate::request::{Body, Method};
    use crate::transport::MockTransport;
    use crate::CdsClient;
    use std::sync::Arc;

    #[tokio::test]
    async fn import_with_name_uses_put() {
        let (client, seen) = client_returning(serde_json::json!(["workflow w1 updated"]));
        let msgs = client
            .import_workflow(&key("test1"), Some("w1"), "name: w1\n")
            .await
            .unwrap();
        assert_eq!(msgs, vec!["workflow w1 updated".to_string()]);

        let req = seen.lock().unwrap()[0].clone();
        assert_eq!(req.method, Method::Put);
        assert_eq!(req.path, "/project/test1/import/workflows/w1");
        assert_eq!(req.body, Body::Yaml("name: w1\n".to_string()));
    }

    #[tokio::test]
    async fn invalid_yaml_is_never_sent() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let client = CdsClient::new(Arc::new(transport));

        let err = client
            .preview_workflow(&key("test1"), "name: [w1")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn export_returns_text() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .withf(|req| req.path == "/project/test1/export/workflows/w1")
            .returning(|_| Ok(crate::ApiResponse::new(200, "name: w1\n")));
        let client = CdsClient::new(Arc::new(transport));

        let code = client.export_workflow(&key("test1"), "w1").await.unwrap();
        assert_eq!(code, "name: w1\n");
    }
}
