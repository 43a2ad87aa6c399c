use promptdeck_core::backend::BackendClient;
use promptdeck_core::domain::Workflow;
use promptdeck_core::store::{ModelRegistry, NewModel, WorkflowStore};
use promptdeck_inspector::schema::{ChoiceSource, FieldType};
use promptdeck_sdk::Session;
use promptdeck_sdk::activity::NoticeLevel;
use serde_json::json;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn sample_workflow() -> Workflow {
    serde_json::from_value(json!({
        "nodes": [
            {
                "id": 4,
                "type": "CheckpointLoaderSimple",
                "title": "Loader",
                "mode": 0,
                "inputs": [{"name": "ckpt_name", "type": "COMBO"}],
                "widgets_values": ["sd15"]
            },
            {
                "id": 3,
                "type": "KSampler",
                "title": "Sampler",
                "mode": 0,
                "inputs": [
                    {"name": "seed", "type": "INT"},
                    {"name": "sampler_name", "type": "COMBO"}
                ],
                "widgets_values": [5, "euler"]
            }
        ],
        "links": []
    }))
    .unwrap()
}

fn setup(server: &MockServer) -> (TempDir, Session) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let dir = tempfile::tempdir().unwrap();
    let store = WorkflowStore::new(dir.path().join("workflow.json"));
    store.save(&sample_workflow()).unwrap();
    let mut registry = ModelRegistry::open(dir.path().join("models.json")).unwrap();
    registry.create(NewModel::new("sdxl", "checkpoint")).unwrap();
    registry.create(NewModel::new("sd15", "checkpoint")).unwrap();

    let client = BackendClient::new(&server.uri(), Duration::from_secs(5)).unwrap();
    let workflow = store.load().unwrap();
    let session = Session::new(client, store, workflow, registry)
        .with_poll_delay(Duration::from_millis(10));
    (dir, session)
}

async fn mount_object_info(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/object_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "KSampler": {"input": {"required": {
                "seed": ["INT", {"default": 0}],
                "sampler_name": [["euler", "ddim", "dpmpp_2m"]]
            }}}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_metadata_failure_degrades_to_heuristics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/object_info"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let (_dir, mut session) = setup(&server);

    assert!(!session.refresh_metadata().await);
    assert!(session.resolver().is_degraded());
    assert_eq!(
        session.activity().latest().unwrap().level,
        NoticeLevel::Warning
    );

    let loader = session.node_view(4).unwrap();
    assert_eq!(
        loader.fields[0].field_type,
        FieldType::Select {
            options: vec!["sdxl".into(), "sd15".into()],
            source: ChoiceSource::ModelRegistry
        }
    );
    assert_eq!(loader.fields[0].display, "sd15");

    let sampler = session.node_view(3).unwrap();
    assert_eq!(sampler.fields[1].field_type, FieldType::Text);
}

#[tokio::test]
async fn test_refresh_keeps_edits() {
    let server = MockServer::start().await;
    mount_object_info(&server).await;
    let (_dir, mut session) = setup(&server);

    session.edit_by_name(3, "sampler_name", "ddim").unwrap();
    assert!(session.refresh_metadata().await);

    let sampler = session.node_view(3).unwrap();
    assert_eq!(sampler.fields[1].value, json!("ddim"));
    assert_eq!(sampler.fields[1].display, "ddim");
    assert!(sampler.fields[1].field_type.is_select());

    let headings: Vec<String> = session.views().into_iter().map(|v| v.heading).collect();
    assert_eq!(headings, vec!["Loader".to_string(), "Sampler".to_string()]);
}

#[tokio::test]
async fn test_edit_toggle_and_save_persist() {
    let server = MockServer::start().await;
    let (dir, mut session) = setup(&server);

    session.edit(3, 0, "1234").unwrap();
    assert!(!session.toggle(4).unwrap());
    session.save().unwrap();

    let reloaded = WorkflowStore::new(dir.path().join("workflow.json")).load().unwrap();
    assert_eq!(reloaded, *session.workflow());
    let sampler = reloaded.node(3).unwrap();
    assert_eq!(sampler.widgets(), Some(&[json!("1234"), json!("euler")][..]));
    assert_eq!(reloaded.node(4).unwrap().mode, Some(4));

    assert!(session.edit(99, 0, "x").unwrap_err().is_not_found());
    assert!(session.toggle(99).unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_submit_and_poll() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"prompt_id": "p-42", "number": 1})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/history/p-42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "p-42": {"outputs": {"9": {"images": [
                {"filename": "ComfyUI_00001_.png", "type": "output", "subfolder": ""}
            ]}}}
        })))
        .mount(&server)
        .await;
    let (_dir, mut session) = setup(&server);

    let prompt_id = session.submit().await.unwrap();
    assert_eq!(prompt_id.as_deref(), Some("p-42"));
    assert_eq!(session.history().latest().unwrap().images.len(), 0);

    let poll = session.schedule_poll("p-42");
    let count = session.complete_poll(poll).await.unwrap();
    assert_eq!(count, 1);

    let entry = session.history().get("p-42").unwrap();
    assert_eq!(entry.images[0].filename, "ComfyUI_00001_.png");
    let url = session.image_url(&entry.images[0]).unwrap();
    assert!(url.as_str().ends_with("/view?filename=ComfyUI_00001_.png&type=output&subfolder="));

    assert_eq!(session.refresh_latest().await.unwrap(), 1);
}

#[tokio::test]
async fn test_submit_failure_leaves_history_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "invalid prompt"})))
        .mount(&server)
        .await;
    let (_dir, mut session) = setup(&server);
    let before = session.workflow().clone();

    let err = session.submit().await.unwrap_err();
    assert_eq!(err.to_string(), "invalid prompt");
    assert!(session.history().is_empty());
    assert_eq!(*session.workflow(), before);
    let latest = session.activity().latest().unwrap();
    assert_eq!(latest.level, NoticeLevel::Error);
    assert_eq!(latest.message, "invalid prompt");
}

#[tokio::test]
async fn test_submission_without_id_is_not_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/prompt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let (_dir, mut session) = setup(&server);

    assert_eq!(session.submit().await.unwrap(), None);
    assert!(session.history().is_empty());
    assert_eq!(
        session.activity().latest().unwrap().message,
        "Submitted prompt: unknown"
    );
}

#[tokio::test]
async fn test_cancelled_poll_attaches_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/history/p-7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;
    let (_dir, session) = setup(&server);
    let mut session = session.with_poll_delay(Duration::from_secs(60));

    let poll = session.schedule_poll("p-7");
    assert!(!poll.is_finished());
    poll.cancel();

    // A dropped handle is cancelled too.
    drop(session.schedule_poll("p-7"));

    assert!(session.history().is_empty());
    assert!(session.refresh_latest().await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_model_registry_feeds_heuristic() {
    let server = MockServer::start().await;
    let (_dir, mut session) = setup(&server);

    let entry = session
        .register_model(NewModel::new("flux-dev", "checkpoint"))
        .unwrap();
    let options = match session.node_view(4).unwrap().fields[0].field_type.clone() {
        FieldType::Select { options, .. } => options,
        other => panic!("expected select, got {other:?}"),
    };
    assert_eq!(options.last().map(String::as_str), Some("flux-dev"));

    session.remove_model(&entry.id).unwrap();
    assert!(session.remove_model(&entry.id).unwrap_err().is_not_found());
    assert_eq!(session.models().len(), 2);
}
