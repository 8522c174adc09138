//! Testing utilities for the CDS console state workspace
//!
//! A scripted [`Transport`] and entity fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use cds_api::{ApiRequest, ApiResponse, ApiResult, CdsClient, Method, Transport};
use cds_model::{
    Application, Environment, IdName, Job, Pipeline, Project, ProjectKey, Stage, Usage, WNode,
    WNodeHook, WNodeTrigger, Workflow, WorkflowData,
};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;

struct Route {
    method: Method,
    path: String,
    responses: VecDeque<ApiResponse>,
}

/// Transport answering from a script
///
/// Responses are queued per method and path and consumed in order; the
/// last response of a route keeps answering. Unscripted requests get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<Vec<Route>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response
    pub fn on(&self, method: Method, path: &str, response: ApiResponse) -> &Self {
        let mut routes = self.routes.lock();
        match routes.iter_mut().find(|r| r.method == method && r.path == path) {
            Some(route) => route.responses.push_back(response),
            None => routes.push(Route {
                method,
                path: path.to_string(),
                responses: VecDeque::from([response]),
            }),
        }
        self
    }

    /// Queue a 200 response carrying `body` as JSON
    pub fn on_json<T: Serialize>(&self, method: Method, path: &str, body: &T) -> &Self {
        let value = serde_json::to_value(body).unwrap();
        self.on(method, path, ApiResponse::json_ok(&value))
    }

    /// Queue an empty 200 response
    pub fn on_ok(&self, method: Method, path: &str) -> &Self {
        self.on(method, path, ApiResponse::new(200, ""))
    }

    /// Queue an error status
    pub fn on_status(&self, method: Method, path: &str, status: u16) -> &Self {
        self.on(method, path, ApiResponse::new(status, r#"{"message":"scripted failure"}"#))
    }

    /// Every request received, in order
    #[must_use]
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of requests received for a method and path
    #[must_use]
    pub fn calls_to(&self, method: Method, path: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> ApiResult<ApiResponse> {
        let response = {
            let mut routes = self.routes.lock();
            let route = routes
                .iter_mut()
                .find(|r| r.method == request.method && r.path == request.path);
            match route {
                Some(route) if route.responses.len() > 1 => route.responses.pop_front(),
                Some(route) => route.responses.front().cloned(),
                None => None,
            }
        };
        self.calls.lock().push(request);
        Ok(response.unwrap_or_else(|| ApiResponse::new(404, r#"{"message":"no scripted response"}"#)))
    }
}

/// Client over a fresh scripted transport
#[must_use]
pub fn scripted_client() -> (CdsClient, Arc<ScriptedTransport>) {
    let transport = Arc::new(ScriptedTransport::new());
    (CdsClient::new(Arc::clone(&transport) as Arc<dyn Transport>), transport)
}

pub fn project_key(raw: &str) -> ProjectKey {
    ProjectKey::new(raw).unwrap()
}

/// Project with empty name indexes for every kind
pub fn create_project(key: &str) -> Project {
    let mut project = Project::new(project_key(key), format!("Project {key}"));
    project.application_names = Some(Vec::new());
    project.pipeline_names = Some(Vec::new());
    project.workflow_names = Some(Vec::new());
    project.environment_names = Some(Vec::new());
    project
}

pub fn create_application(key: &str, name: &str) -> Application {
    let mut app = Application::named(name).with_project(project_key(key));
    app.id = Some(1);
    app
}

/// Application used by the listed workflows
pub fn create_application_used_by(key: &str, name: &str, workflows: &[&str]) -> Application {
    let mut app = create_application(key, name);
    app.usage = Some(Usage {
        workflows: Some(workflows.iter().map(|w| IdName::named(*w)).collect()),
        ..Usage::default()
    });
    app
}

/// Pipeline with stages `build` and `deploy`, one job each
pub fn create_pipeline(key: &str, name: &str) -> Pipeline {
    let mut pipeline = Pipeline::named(name).with_project(project_key(key));
    pipeline.id = Some(1);
    let mut build = Stage::named("build", 1);
    build.id = Some(10);
    build.jobs = Some(vec![job(100, "compile")]);
    let mut deploy = Stage::named("deploy", 2);
    deploy.id = Some(20);
    deploy.jobs = Some(vec![job(200, "push")]);
    pipeline.stages = Some(vec![build, deploy]);
    pipeline
}

fn job(id: i64, name: &str) -> Job {
    let mut job = Job::named(name);
    job.pipeline_action_id = Some(id);
    job
}

pub fn create_environment(key: &str, name: &str) -> Environment {
    let mut env = Environment::named(name).with_project(project_key(key));
    env.id = Some(1);
    env
}

/// Workflow `root -> child`, root carrying one hook
pub fn create_workflow(key: &str, name: &str) -> Workflow {
    let mut root = node(1, "root");
    root.hooks.push(WNodeHook {
        id: Some(5),
        uuid: Some("hook-uuid-1".to_string()),
        node_id: Some(1),
        ..WNodeHook::default()
    });
    root.triggers.push(WNodeTrigger {
        id: Some(3),
        parent_node_id: Some(1),
        child_node_id: Some(2),
        child_node: node(2, "child"),
        ..WNodeTrigger::default()
    });
    let mut workflow = Workflow::named(name)
        .with_project(project_key(key))
        .with_data(WorkflowData {
            node: root,
            joins: Vec::new(),
        });
    workflow.id = Some(1);
    workflow
}

/// [`create_workflow`] sourced from a repository
pub fn create_as_code_workflow(key: &str, name: &str) -> Workflow {
    let mut workflow = create_workflow(key, name);
    workflow.from_repository = Some("https://git.example.com/repo.git".to_string());
    workflow
}

fn node(id: i64, name: &str) -> WNode {
    let mut node = WNode::pipeline(name);
    node.id = Some(id);
    node
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_replays_last_response() {
        let transport = ScriptedTransport::new();
        transport
            .on_status(Method::Get, "/a", 500)
            .on_json(Method::Get, "/a", &serde_json::json!({"ok": true}));

        let first = transport.send(ApiRequest::get("/a")).await.unwrap();
        let second = transport.send(ApiRequest::get("/a")).await.unwrap();
        let third = transport.send(ApiRequest::get("/a")).await.unwrap();
        let missing = transport.send(ApiRequest::get("/b")).await.unwrap();

        assert_eq!(first.status, 500);
        assert_eq!(second.status, 200);
        assert_eq!(third.status, 200);
        assert_eq!(missing.status, 404);
        assert_eq!(transport.calls_to(Method::Get, "/a"), 3);
        assert_eq!(transport.call_count(), 4);
    }
}
