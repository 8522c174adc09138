//! Session scenarios over a scripted transport

use cds_api::{Body, Method};
use cds_cache::CacheKey;
use cds_model::{
    Application, Audit, EntityKind, IdName, LoadOpt, Project, ProjectIntegration, ProjectKey,
    Stage, WorkflowNotification,
};
use cds_overlay::SyntheticRef;
use cds_store::{
    ApplicationCommand, EventTarget, ExternalEvent, Outcome, PipelineCommand, Session,
    SessionConfig, WorkflowCommand,
};
use cds_test_utils::{
    create_application, create_application_used_by, create_as_code_workflow, create_pipeline,
    create_project, create_workflow, project_key, scripted_client, ScriptedTransport,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;

async fn session_with(
    index: impl FnOnce(&mut Project),
) -> (Session, Arc<ScriptedTransport>, ProjectKey) {
    let (client, transport) = scripted_client();
    let mut project = create_project("test1");
    index(&mut project);
    transport.on_json(Method::Get, "/project/test1", &project);

    let session = Session::new(client, SessionConfig::default());
    let key = project_key("test1");
    session
        .switch_project(&key, &[LoadOpt::ApplicationNames, LoadOpt::WorkflowNames])
        .await
        .unwrap();
    (session, transport, key)
}

fn target(key: &ProjectKey, name: &str) -> CacheKey {
    CacheKey::new(key.clone(), name)
}

#[tokio::test]
async fn add_then_rename_application_keeps_index_in_step() {
    let (session, transport, key) = session_with(|_| {}).await;

    transport.on_json(
        Method::Post,
        "/project/test1/applications",
        &json!({"name": "app1", "project_key": "test1"}),
    );
    session
        .dispatch(ApplicationCommand::Add {
            project: key.clone(),
            application: Application::named("app1"),
        })
        .await
        .unwrap();

    assert_eq!(session.applications().cache().len(), 1);
    assert!(session.application(&key, "app1").is_some());
    let names = session.project().unwrap().application_names.clone().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "app1");

    transport.on_json(
        Method::Put,
        "/project/test1/application/app1",
        &json!({"name": "app1bis", "project_key": "test1"}),
    );
    session
        .dispatch(ApplicationCommand::Update {
            target: target(&key, "app1"),
            changes: Application::named("app1bis"),
        })
        .await
        .unwrap();

    assert!(session.application(&key, "app1").is_none());
    assert!(session.application(&key, "app1bis").is_some());
    let names = session.project().unwrap().application_names.clone().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "app1bis");
}

#[tokio::test]
async fn rename_carries_description_and_icon_into_index() {
    let (session, transport, key) = session_with(|p| {
        p.application_names = Some(vec![IdName::named("app1")]);
    })
    .await;
    transport.on_json(
        Method::Get,
        "/project/test1/application/app1",
        &create_application("test1", "app1"),
    );
    session
        .dispatch(ApplicationCommand::Fetch(target(&key, "app1")))
        .await
        .unwrap();

    let mut renamed = create_application("test1", "app2");
    renamed.description = Some("moved".to_string());
    renamed.icon = Some("app.png".to_string());
    transport.on_json(Method::Put, "/project/test1/application/app1", &renamed);
    session
        .dispatch(ApplicationCommand::Update {
            target: target(&key, "app1"),
            changes: Application::named("app2"),
        })
        .await
        .unwrap();

    let names = session.project().unwrap().application_names.clone().unwrap();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "app2");
    assert_eq!(names[0].description.as_deref(), Some("moved"));
    assert_eq!(names[0].icon.as_deref(), Some("app.png"));
}

#[tokio::test]
async fn rejected_update_leaves_cache_and_index_alone() {
    let (session, transport, key) = session_with(|p| {
        p.application_names = Some(vec![IdName::named("app1")]);
    })
    .await;
    transport
        .on_json(
            Method::Get,
            "/project/test1/application/app1",
            &create_application("test1", "app1"),
        )
        .on_status(Method::Put, "/project/test1/application/app1", 500);
    session
        .dispatch(ApplicationCommand::Fetch(target(&key, "app1")))
        .await
        .unwrap();
    let before = session.application(&key, "app1").unwrap();
    let project_before = session.project().unwrap();

    let result = session
        .dispatch(ApplicationCommand::Update {
            target: target(&key, "app1"),
            changes: Application::named("app2"),
        })
        .await;

    assert!(result.is_err());
    assert!(Arc::ptr_eq(&before, &session.application(&key, "app1").unwrap()));
    assert!(Arc::ptr_eq(&project_before, &session.project().unwrap()));
    assert!(session.application(&key, "app2").is_none());
}

#[tokio::test]
async fn workflow_update_keeps_loaded_audits() {
    let (session, transport, key) = session_with(|p| {
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    let mut loaded = create_workflow("test1", "wf");
    loaded.audits = Some(vec![Audit {
        id: 7,
        triggered_by: "admin".to_string(),
        ..Audit::default()
    }]);
    transport
        .on_json(Method::Get, "/project/test1/workflows/wf", &loaded)
        .on_json(Method::Put, "/project/test1/workflows/wf", &create_workflow("test1", "wf"));
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();

    let mut changes = create_workflow("test1", "wf");
    changes.description = Some("nightly".to_string());
    session
        .dispatch(WorkflowCommand::Update {
            target: target(&key, "wf"),
            changes,
        })
        .await
        .unwrap();

    let cached = session.workflow(&key, "wf").unwrap();
    assert_eq!(cached.audits.as_ref().map(Vec::len), Some(1));
    assert_eq!(cached.audits.as_ref().unwrap()[0].id, 7);
}

#[tokio::test]
async fn as_code_edit_stays_local() {
    let (session, transport, key) = session_with(|p| {
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    transport.on_json(
        Method::Get,
        "/project/test1/workflows/wf",
        &create_as_code_workflow("test1", "wf"),
    );
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();
    let canonical = session.workflow(&key, "wf").unwrap();
    let calls = transport.call_count();
    assert!(!session.workflows().overlays().changed(&target(&key, "wf")));

    let outcome = session
        .dispatch(WorkflowCommand::DeleteNode {
            target: target(&key, "wf"),
            node_ref: SyntheticRef::from_server_id(2),
        })
        .await
        .unwrap();

    assert!(outcome.is_local());
    assert_eq!(transport.call_count(), calls);
    assert!(Arc::ptr_eq(&canonical, &session.workflow(&key, "wf").unwrap()));
    assert!(session.workflows().overlays().changed(&target(&key, "wf")));

    let view = session.workflows().view(&key, "wf").unwrap();
    assert!(view.workflow_data.unwrap().node.triggers.is_empty());

    session
        .dispatch(WorkflowCommand::CancelEdits(target(&key, "wf")))
        .await
        .unwrap();
    assert!(!session.workflows().overlays().changed(&target(&key, "wf")));
}

#[tokio::test]
async fn canonical_graph_edit_saves_whole_workflow() {
    let (session, transport, key) = session_with(|p| {
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    let mut saved = create_workflow("test1", "wf");
    if let Some(data) = saved.workflow_data.as_mut() {
        data.node.triggers.clear();
    }
    transport
        .on_json(Method::Get, "/project/test1/workflows/wf", &create_workflow("test1", "wf"))
        .on_json(Method::Put, "/project/test1/workflows/wf", &saved);
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();

    session
        .dispatch(WorkflowCommand::DeleteNode {
            target: target(&key, "wf"),
            node_ref: SyntheticRef::from_server_id(2),
        })
        .await
        .unwrap();

    let put = transport
        .calls()
        .into_iter()
        .find(|r| r.method == Method::Put)
        .unwrap();
    let Body::Json(body) = put.body else {
        panic!("workflow update must send JSON");
    };
    assert_eq!(body["name"], "wf");
    assert!(body["workflow_data"]["node"].get("triggers").is_none());

    let cached = session.workflow(&key, "wf").unwrap();
    assert!(cached.workflow_data.as_ref().unwrap().node.triggers.is_empty());
}

#[tokio::test]
async fn unknown_node_is_a_desync_without_network() {
    let (session, transport, key) = session_with(|_| {}).await;
    transport.on_json(Method::Get, "/project/test1/workflows/wf", &create_workflow("test1", "wf"));
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();
    let calls = transport.call_count();

    let err = session
        .dispatch(WorkflowCommand::DeleteNode {
            target: target(&key, "wf"),
            node_ref: SyntheticRef::new("missing"),
        })
        .await
        .unwrap_err();

    assert!(err.is_desync());
    assert_eq!(transport.call_count(), calls);
}

#[tokio::test]
async fn stage_update_resolves_server_id() {
    let (session, transport, key) = session_with(|_| {}).await;
    let mut renamed = create_pipeline("test1", "pip");
    if let Some(stages) = renamed.stages.as_mut() {
        stages[0].name = "compile".to_string();
    }
    transport
        .on_json(Method::Get, "/project/test1/pipeline/pip", &create_pipeline("test1", "pip"))
        .on_json(Method::Put, "/project/test1/pipeline/pip/stage/10", &renamed);
    session
        .dispatch(PipelineCommand::Fetch(target(&key, "pip")))
        .await
        .unwrap();

    session
        .dispatch(PipelineCommand::UpdateStage {
            target: target(&key, "pip"),
            stage_ref: SyntheticRef::from_server_id(10),
            stage: Stage::named("compile", 1),
        })
        .await
        .unwrap();

    assert_eq!(transport.calls_to(Method::Put, "/project/test1/pipeline/pip/stage/10"), 1);
    let cached = session.pipeline(&key, "pip").unwrap();
    assert_eq!(cached.stages.as_ref().unwrap()[0].name, "compile");
}

#[tokio::test]
async fn renaming_application_evicts_workflows_using_it() {
    let (session, transport, key) = session_with(|p| {
        p.application_names = Some(vec![IdName::named("app1")]);
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    transport
        .on_json(
            Method::Get,
            "/project/test1/application/app1",
            &create_application_used_by("test1", "app1", &["wf"]),
        )
        .on_json(Method::Get, "/project/test1/workflows/wf", &create_workflow("test1", "wf"))
        .on_json(
            Method::Put,
            "/project/test1/application/app1",
            &create_application("test1", "app2"),
        );
    session
        .dispatch(ApplicationCommand::Fetch(target(&key, "app1")))
        .await
        .unwrap();
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();
    assert!(session.workflow(&key, "wf").is_some());

    session
        .dispatch(ApplicationCommand::Update {
            target: target(&key, "app1"),
            changes: Application::named("app2"),
        })
        .await
        .unwrap();

    assert!(session.workflow(&key, "wf").is_none());
}

#[tokio::test]
async fn external_events_flag_then_resync() {
    let (session, transport, key) = session_with(|p| {
        p.application_names = Some(vec![IdName::named("app1")]);
    })
    .await;
    transport.on_json(
        Method::Get,
        "/project/test1/application/app1",
        &create_application("test1", "app1"),
    );
    session
        .dispatch(ApplicationCommand::Fetch(target(&key, "app1")))
        .await
        .unwrap();

    let event_target = EventTarget::Child {
        kind: EntityKind::Application,
        key: target(&key, "app1"),
    };
    let (tx, rx) = mpsc::channel(4);
    tx.send(ExternalEvent::Changed(event_target.clone())).await.unwrap();
    drop(tx);
    session.run_events(rx).await;
    assert!(session.applications().cache().is_external(&target(&key, "app1")));

    // flagged entities are refetched instead of served from cache
    let before = transport.calls_to(Method::Get, "/project/test1/application/app1");
    session
        .dispatch(ApplicationCommand::Fetch(target(&key, "app1")))
        .await
        .unwrap();
    assert_eq!(
        transport.calls_to(Method::Get, "/project/test1/application/app1"),
        before + 1
    );
    assert!(!session.applications().cache().is_external(&target(&key, "app1")));

    session.handle_event(&ExternalEvent::Changed(event_target.clone())).await.unwrap();
    let resynced = session
        .handle_event(&ExternalEvent::Resync(event_target))
        .await
        .unwrap();
    assert!(resynced);
    assert!(!session.applications().cache().is_external(&target(&key, "app1")));
}

#[tokio::test]
async fn flag_on_uncached_entity_reports_false() {
    let (session, _transport, key) = session_with(|_| {}).await;
    let outcome = session
        .dispatch(ApplicationCommand::ExternalChange(target(&key, "ghost")))
        .await
        .unwrap();
    assert!(matches!(outcome, Outcome::Flag(false)));
}

#[tokio::test]
async fn switching_project_drops_previous_entities() {
    let (session, transport, key) = session_with(|p| {
        p.application_names = Some(vec![IdName::named("app1")]);
    })
    .await;
    transport
        .on_json(
            Method::Get,
            "/project/test1/application/app1",
            &create_application("test1", "app1"),
        )
        .on_json(Method::Get, "/project/other", &create_project("other"));
    assert_eq!(session.hydrate(&key).await.unwrap(), 1);
    assert_eq!(session.applications().cache().len(), 1);

    session
        .switch_project(&project_key("other"), &[LoadOpt::ApplicationNames])
        .await
        .unwrap();

    assert!(session.applications().cache().is_empty());
    assert_eq!(session.project().unwrap().key, project_key("other"));
}

#[tokio::test]
async fn deleting_last_notification_empties_cached_list() {
    let (session, transport, key) = session_with(|p| {
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    let mut loaded = create_workflow("test1", "wf");
    loaded.notifications = Some(vec![WorkflowNotification {
        id: Some(4),
        ..WorkflowNotification::default()
    }]);
    transport
        .on_json(Method::Get, "/project/test1/workflows/wf", &loaded)
        .on_json(Method::Put, "/project/test1/workflows/wf", &create_workflow("test1", "wf"));
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();

    session
        .dispatch(WorkflowCommand::DeleteNotification {
            target: target(&key, "wf"),
            id: 4,
        })
        .await
        .unwrap();

    assert_eq!(transport.calls_to(Method::Put, "/project/test1/workflows/wf"), 1);
    let cached = session.workflow(&key, "wf").unwrap();
    assert_eq!(cached.notifications, Some(vec![]));
}

#[tokio::test]
async fn deleting_last_event_integration_skips_workflow_save() {
    let (session, transport, key) = session_with(|p| {
        p.workflow_names = Some(vec![IdName::named("wf")]);
    })
    .await;
    let mut loaded = create_workflow("test1", "wf");
    loaded.event_integrations = Some(vec![ProjectIntegration {
        id: Some(7),
        name: "kafka".to_string(),
        ..ProjectIntegration::default()
    }]);
    transport
        .on_json(Method::Get, "/project/test1/workflows/wf", &loaded)
        .on_ok(Method::Delete, "/project/test1/workflows/wf/eventsintegration/7");
    session
        .dispatch(WorkflowCommand::Fetch(target(&key, "wf")))
        .await
        .unwrap();

    session
        .dispatch(WorkflowCommand::DeleteEventIntegration {
            target: target(&key, "wf"),
            integration_id: 7,
        })
        .await
        .unwrap();

    assert_eq!(
        transport.calls_to(Method::Delete, "/project/test1/workflows/wf/eventsintegration/7"),
        1
    );
    assert_eq!(transport.calls_to(Method::Put, "/project/test1/workflows/wf"), 0);
    let cached = session.workflow(&key, "wf").unwrap();
    assert_eq!(cached.event_integrations, Some(vec![]));
}
