use super::{child_path, project_path};
use crate::client::CdsClient;
use crate::error::ApiResult;
use crate::request::ApiRequest;
use cds_model::{GroupPermission, Key, Label, LoadOpt, Project, ProjectKey, Variable};
use serde::Serialize;

/// Body of `POST /user/favorite`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Favorite {
    /// `project` or `workflow`
    #[serde(rename = "type")]
    pub favorite_type: &'static str,
    /// Owning project
    pub project_key: ProjectKey,
    /// Workflow, for workflow favorites
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workflow_name: Option<String>,
}

impl Favorite {
    /// Favorite on a project
    #[must_use]
    pub fn project(key: ProjectKey) -> Self {
        Self {
            favorite_type: "project",
            project_key: key,
            workflow_name: None,
        }
    }

    /// Favorite on a workflow
    #[must_use]
    pub fn workflow(key: ProjectKey, name: impl Into<String>) -> Self {
        Self {
            favorite_type: "workflow",
            project_key: key,
            workflow_name: Some(name.into()),
        }
    }
}

impl CdsClient {
    /// `GET /project/{key}` with one `with*` flag per option
    pub async fn get_project(&self, key: &ProjectKey, opts: &[LoadOpt]) -> ApiResult<Project> {
        let request = opts.iter().fold(ApiRequest::get(project_path(key)), |req, opt| {
            req.with_query(opt.query_param(), "true")
        });
        self.json(request).await
    }

    /// `POST /project`
    pub async fn create_project(&self, project: &Project) -> ApiResult<Project> {
        self.json(ApiRequest::post("/project").with_json(project)?).await
    }

    /// `PUT /project/{key}`
    pub async fn update_project(&self, project: &Project) -> ApiResult<Project> {
        self.json(ApiRequest::put(project_path(&project.key)).with_json(project)?)
            .await
    }

    /// `DELETE /project/{key}`
    pub async fn delete_project(&self, key: &ProjectKey) -> ApiResult<()> {
        self.unit(ApiRequest::delete(project_path(key))).await
    }

    /// `POST /user/favorite`; the server toggles the flag
    pub async fn toggle_favorite(&self, favorite: &Favorite) -> ApiResult<()> {
        self.unit(ApiRequest::post("/user/favorite").with_json(favorite)?)
            .await
    }

    /// `PUT /project/{key}/labels`, replacing every label
    pub async fn save_project_labels(&self, key: &ProjectKey, labels: &[Label]) -> ApiResult<Project> {
        let path = format!("{}/labels", project_path(key));
        self.json(ApiRequest::put(path).with_json(labels)?).await
    }

    /// `POST /project/{key}/labels`
    pub async fn add_project_label(&self, key: &ProjectKey, label: &Label) -> ApiResult<Project> {
        let path = format!("{}/labels", project_path(key));
        self.json(ApiRequest::post(path).with_json(label)?).await
    }

    /// `DELETE /project/{key}/labels/{id}`
    pub async fn delete_project_label(&self, key: &ProjectKey, label_id: i64) -> ApiResult<Project> {
        let path = format!("{}/labels/{label_id}", project_path(key));
        self.json(ApiRequest::delete(path)).await
    }

    /// `POST /project/{key}/variable/{name}`
    pub async fn add_project_variable(&self, key: &ProjectKey, variable: &Variable) -> ApiResult<Variable> {
        let path = child_path(key, "variable", &variable.name);
        self.json(ApiRequest::post(path).with_json(variable)?).await
    }

    /// `PUT /project/{key}/variable/{name}`, `name` being the current name
    pub async fn update_project_variable(
        &self,
        key: &ProjectKey,
        name: &str,
        variable: &Variable,
    ) -> ApiResult<Variable> {
        let path = child_path(key, "variable", name);
        self.json(ApiRequest::put(path).with_json(variable)?).await
    }

    /// `DELETE /project/{key}/variable/{name}`
    pub async fn delete_project_variable(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(child_path(key, "variable", name)))
            .await
    }

    /// `POST /project/{key}/group`; returns every group of the project
    pub async fn add_project_group(
        &self,
        key: &ProjectKey,
        group: &GroupPermission,
    ) -> ApiResult<Vec<GroupPermission>> {
        let path = format!("{}/group", project_path(key));
        self.json(ApiRequest::post(path).with_json(group)?).await
    }

    /// `PUT /project/{key}/group/{group}`
    pub async fn update_project_group(
        &self,
        key: &ProjectKey,
        group: &GroupPermission,
    ) -> ApiResult<GroupPermission> {
        let path = child_path(key, "group", &group.group.name);
        self.json(ApiRequest::put(path).with_json(group)?).await
    }

    /// `DELETE /project/{key}/group/{group}`
    pub async fn delete_project_group(&self, key: &ProjectKey, group: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(child_path(key, "group", group)))
            .await
    }

    /// `POST /project/{key}/keys`
    pub async fn add_project_key(&self, key: &ProjectKey, project_key: &Key) -> ApiResult<Key> {
        let path = format!("{}/keys", project_path(key));
        self.json(ApiRequest::post(path).with_json(project_key)?).await
    }

    /// `DELETE /project/{key}/keys/{name}`
    pub async fn delete_project_key(&self, key: &ProjectKey, name: &str) -> ApiResult<()> {
        self.unit(ApiRequest::delete(child_path(key, "keys", name))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoints::testing::{client_returning, key};
    use crate::request::{Body, Method};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn get_project_sends_load_flags() {
        let (client, seen) = client_returning(serde_json::json!({"key": "test1", "name": "Test 1"}));

        let project = client
            .get_project(&key("test1"), &[LoadOpt::WorkflowNames, LoadOpt::Labels])
            .await
            .unwrap();
        assert_eq!(project.name, "Test 1");

        let req = seen.lock().unwrap()[0].clone();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.path, "/project/test1");
        assert_eq!(
            req.query,
            vec![
                ("withWorkflowNames".to_string(), "true".to_string()),
                ("withLabels".to_string(), "true".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn favorite_body() {
        let (client, seen) = client_returning(serde_json::Value::Null);
        client
            .toggle_favorite(&Favorite::workflow(key("test1"), "w1"))
            .await
            .unwrap();

        let req = seen.lock().unwrap()[0].clone();
        assert_eq!(req.path, "/user/favorite");
        assert_eq!(
            req.body,
            Body::Json(serde_json::json!({
                "type": "workflow",
                "project_key": "test1",
                "workflow_name": "w1",
            }))
        );
    }

    #[tokio::test]
    async fn update_variable_targets_previous_name() {
        let (client, seen) = client_returning(serde_json::json!({"name": "new", "type": "string", "value": "v"}));
        let var = client
            .update_project_variable(&key("test1"), "old", &Variable::new("new", "v"))
            .await
            .unwrap();
        assert_eq!(var.name, "new");
        assert_eq!(seen.lock().unwrap()[0].path, "/project/test1/variable/old");
    }
}
