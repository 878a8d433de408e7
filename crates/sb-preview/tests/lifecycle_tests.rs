use pretty_assertions::assert_eq;
use sb_args::{args_from_json, parse_args_param, ArgUpdate, ArgValue, ArgsUpdate};
use sb_index::{build_index, CsfFile, CsfMeta, CsfStory, IndexerConfig};
use sb_preview::{PreviewError, PreviewEvent, RenderOutcome, RenderPhase, RenderState};
use sb_test_utils::{controller, fixture_loader, init_tracing, RecordingRenderer, BUTTON_PATH};
use serde_json::json;
use std::sync::Arc;

use RenderState::{Errored, Preparing, Rendered, Rendering, TearingDown, TornDown};

fn set(key: &str, value: impl Into<ArgValue>) -> ArgsUpdate {
    ArgsUpdate::from([(key.to_string(), ArgUpdate::set(value))])
}

#[tokio::test]
async fn test_select_renders_with_merged_args_and_globals() {
    init_tracing();
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    let outcome = preview.select("button--primary").await.unwrap();
    assert_eq!(outcome, RenderOutcome::Rendered);

    let handle = preview.current().unwrap();
    assert_eq!(handle.history(), vec![Preparing, Rendering, Rendered]);

    let calls = renderer.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].args,
        args_from_json(json!({"label": "Button", "size": "small", "primary": true}))
    );
    assert_eq!(calls[0].globals["theme"], ArgValue::from("light"));
    assert!(calls[0].force_remount);
}

#[tokio::test]
async fn test_newer_selection_aborts_older_one() {
    init_tracing();
    let loader = Arc::new(fixture_loader());
    let gate = loader.gate(BUTTON_PATH);
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(loader.clone(), renderer.clone());

    let first = tokio::spawn({
        let preview = Arc::clone(&preview);
        async move { preview.select("button--primary").await }
    });
    gate.entered().await;

    let second = preview.select("card--default").await.unwrap();
    assert_eq!(second, RenderOutcome::Rendered);

    gate.open();
    let first = first.await.unwrap().unwrap();
    assert_eq!(first, RenderOutcome::Aborted);

    assert!(renderer.calls_for("button--primary").is_empty());
    assert!(preview.args("button--primary").is_err());
    assert_eq!(preview.current().unwrap().story_id(), "card--default");
}

#[tokio::test]
async fn test_teardown_while_preparing_stops_lifecycle() {
    let loader = Arc::new(fixture_loader());
    let gate = loader.gate(BUTTON_PATH);
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(loader.clone(), renderer.clone());

    let task = tokio::spawn({
        let preview = Arc::clone(&preview);
        async move { preview.select("button--primary").await }
    });
    gate.entered().await;

    let handle = preview.current().unwrap();
    assert_eq!(handle.state(), Preparing);
    assert!(preview.unmount());

    gate.open();
    assert_eq!(task.await.unwrap().unwrap(), RenderOutcome::Aborted);
    assert_eq!(handle.history(), vec![Preparing, TearingDown, TornDown]);
    assert!(renderer.calls().is_empty());
    assert!(preview.current().is_none());
}

#[tokio::test]
async fn test_late_render_result_is_torn_down() {
    let renderer = Arc::new(RecordingRenderer::new());
    let gate = renderer.gate();
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    let task = tokio::spawn({
        let preview = Arc::clone(&preview);
        async move { preview.select("button--primary").await }
    });
    gate.entered().await;

    let handle = preview.current().unwrap();
    assert_eq!(handle.state(), Rendering);
    preview.unmount();
    assert_eq!(renderer.teardowns(), 0);

    gate.open();
    assert_eq!(task.await.unwrap().unwrap(), RenderOutcome::Aborted);
    assert_eq!(renderer.teardowns(), 1);
    assert_eq!(handle.state(), TornDown);
}

#[tokio::test]
async fn test_args_update_rerenders_with_new_args() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());
    preview.select("button--primary").await.unwrap();

    let args = preview
        .update_args("button--primary", &set("label", "Go"))
        .await
        .unwrap();
    assert_eq!(args["label"], ArgValue::from("Go"));

    let handle = preview.current().unwrap();
    assert_eq!(
        handle.history(),
        vec![Preparing, Rendering, Rendered, Rendering, Rendered]
    );
    let calls = renderer.calls_for("button--primary");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args["label"], ArgValue::from("Go"));
    assert!(!calls[1].force_remount);
}

#[tokio::test]
async fn test_update_during_render_runs_another_pass() {
    let renderer = Arc::new(RecordingRenderer::new());
    let gate = renderer.gate();
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    let task = tokio::spawn({
        let preview = Arc::clone(&preview);
        async move { preview.select("button--primary").await }
    });
    gate.entered().await;

    preview
        .update_args("button--primary", &set("label", "Late"))
        .await
        .unwrap();
    gate.open_all();

    assert_eq!(task.await.unwrap().unwrap(), RenderOutcome::Rendered);
    let calls = renderer.calls_for("button--primary");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].args["label"], ArgValue::from("Late"));
    assert_eq!(
        preview.current().unwrap().history(),
        vec![Preparing, Rendering, Rendered]
    );
}

#[tokio::test]
async fn test_load_failure_is_errored_not_aborted() {
    let loader = fixture_loader().with_failure(BUTTON_PATH, "unexpected token");
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(loader), renderer.clone());

    let outcome = preview.select("button--primary").await.unwrap();
    let failure = match outcome {
        RenderOutcome::Errored(failure) => failure,
        other => panic!("expected errored outcome, got {other:?}"),
    };
    assert_eq!(failure.phase, RenderPhase::Load);
    assert!(failure.message.contains("unexpected token"));

    let handle = preview.current().unwrap();
    assert_eq!(handle.state(), Errored);
    assert_eq!(handle.failure(), Some(failure));
    assert!(renderer.calls().is_empty());
}

#[tokio::test]
async fn test_render_failure_recovers_on_args_update() {
    let renderer = Arc::new(RecordingRenderer::new());
    renderer.fail_story("card--default", "boom");
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    let outcome = preview.select("card--default").await.unwrap();
    let failure = match outcome {
        RenderOutcome::Errored(failure) => failure,
        other => panic!("expected errored outcome, got {other:?}"),
    };
    assert_eq!(failure.phase, RenderPhase::Render);
    assert!(failure.stack.is_some());

    renderer.clear_failure("card--default");
    preview
        .update_args("card--default", &set("count", 2))
        .await
        .unwrap();

    let handle = preview.current().unwrap();
    assert_eq!(handle.state(), Rendered);
    assert_eq!(handle.failure(), None);
    assert_eq!(
        handle.history(),
        vec![Preparing, Rendering, Errored, Rendering, Rendered]
    );
}

#[tokio::test]
async fn test_missing_story() {
    let preview = controller(Arc::new(fixture_loader()), Arc::new(RecordingRenderer::new()));

    assert_eq!(
        preview.select("nope--missing").await,
        Err(PreviewError::MissingStory("nope--missing".into()))
    );
    assert!(preview.current().is_none());
}

#[tokio::test]
async fn test_switching_stories_tears_down_previous() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    preview.select("button--primary").await.unwrap();
    let button = preview.current().unwrap();
    preview.select("card--default").await.unwrap();

    assert_eq!(button.state(), TornDown);
    assert_eq!(renderer.teardowns(), 1);
    assert!(preview.handle("button--primary").is_none());
    assert!(preview.handle("card--default").is_some());
}

#[tokio::test]
async fn test_edited_args_survive_reselection() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());

    preview.select("button--primary").await.unwrap();
    preview
        .update_args("button--primary", &set("label", "Kept"))
        .await
        .unwrap();
    preview.select("card--default").await.unwrap();
    preview.select("button--primary").await.unwrap();

    let calls = renderer.calls_for("button--primary");
    assert_eq!(calls.last().unwrap().args["label"], ArgValue::from("Kept"));
}

#[tokio::test]
async fn test_args_update_outside_options_is_dropped() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());
    preview.select("button--primary").await.unwrap();

    let args = preview
        .update_args("button--primary", &set("size", "huge"))
        .await
        .unwrap();
    assert_eq!(args["size"], ArgValue::from("small"));

    let mut update = set("size", "large");
    update.insert("label".to_string(), ArgUpdate::Unset);
    let args = preview.update_args("button--primary", &update).await.unwrap();
    assert_eq!(args, args_from_json(json!({"size": "large", "primary": true})));
    assert_eq!(
        renderer.calls_for("button--primary").last().unwrap().args,
        args
    );
}

#[tokio::test]
async fn test_reset_args_restores_initial() {
    let preview = controller(Arc::new(fixture_loader()), Arc::new(RecordingRenderer::new()));
    preview.select("button--primary").await.unwrap();
    preview
        .update_args("button--primary", &set("label", "Changed"))
        .await
        .unwrap();

    let args = preview.reset_args("button--primary", None).await.unwrap();
    assert_eq!(args["label"], ArgValue::from("Button"));
}

#[tokio::test]
async fn test_globals_update_rerenders_live_story() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());
    preview.select("button--primary").await.unwrap();

    let globals = preview
        .update_globals(&args_from_json(json!({"theme": "dark", "bogus": 1})))
        .await;

    assert_eq!(globals, args_from_json(json!({"theme": "dark"})));
    let calls = renderer.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].globals["theme"], ArgValue::from("dark"));
}

#[tokio::test]
async fn test_persisted_args_are_validated() {
    let preview = controller(Arc::new(fixture_loader()), Arc::new(RecordingRenderer::new()));

    let early = preview
        .apply_persisted_args("button--primary", &parse_args_param("size:large"))
        .await;
    assert!(early.is_err());

    preview.select("button--primary").await.unwrap();
    let args = preview
        .apply_persisted_args("button--primary", &parse_args_param("size:large;label:Hi"))
        .await
        .unwrap();
    assert_eq!(args["size"], ArgValue::from("large"));
    assert_eq!(args["label"], ArgValue::from("Hi"));

    let args = preview
        .apply_persisted_args("button--primary", &parse_args_param("size:huge"))
        .await
        .unwrap();
    assert_eq!(args["size"], ArgValue::from("large"));
}

#[tokio::test]
async fn test_replace_index_drops_removed_stories() {
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(Arc::new(fixture_loader()), renderer.clone());
    preview.select("card--default").await.unwrap();
    let card = preview.current().unwrap();

    let button_only = build_index(
        IndexerConfig::default(),
        [CsfFile::new(BUTTON_PATH, CsfMeta::titled("Button")).with_story(CsfStory::new("Primary"))],
    )
    .index;
    let dropped = preview.replace_index(button_only);

    assert_eq!(dropped, vec!["card--default".to_string()]);
    assert!(preview.args("card--default").is_err());
    assert!(preview.current().is_none());
    assert_eq!(card.state(), TornDown);
    assert!(preview.index().contains("button--primary"));
    assert!(!preview.index().contains("card--default"));
}

#[tokio::test]
async fn test_events_follow_lifecycle() {
    let preview = controller(Arc::new(fixture_loader()), Arc::new(RecordingRenderer::new()));
    let mut events = preview.subscribe();

    preview.select("button--primary").await.unwrap();
    preview.select("card--default").await.unwrap();

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }

    let kinds: Vec<(&str, Option<&str>)> = seen
        .iter()
        .map(|event| {
            let kind = match event {
                PreviewEvent::StoryPrepared { .. } => "prepared",
                PreviewEvent::StoryRendered { .. } => "rendered",
                PreviewEvent::StoryTornDown { .. } => "torn-down",
                PreviewEvent::StoryErrored { .. } => "errored",
                PreviewEvent::ArgsUpdated { .. } => "args",
                PreviewEvent::GlobalsUpdated { .. } => "globals",
            };
            (kind, event.story_id())
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            ("prepared", Some("button--primary")),
            ("rendered", Some("button--primary")),
            ("torn-down", Some("button--primary")),
            ("prepared", Some("card--default")),
            ("rendered", Some("card--default")),
        ]
    );
}

#[tokio::test]
async fn test_reselecting_same_story_keeps_single_live_handle() {
    let loader = Arc::new(fixture_loader());
    let gate = loader.gate(BUTTON_PATH);
    let renderer = Arc::new(RecordingRenderer::new());
    let preview = controller(loader.clone(), renderer.clone());

    let (first, second) = futures::join!(preview.select("button--primary"), async {
        gate.entered().await;
        gate.open_all();
        preview.select("button--primary").await
    });

    assert_eq!(first.unwrap(), RenderOutcome::Aborted);
    assert_eq!(second.unwrap(), RenderOutcome::Rendered);
    assert_eq!(renderer.calls_for("button--primary").len(), 1);
    assert_eq!(loader.loads().len(), 2);

    let live = preview.handle("button--primary").unwrap();
    assert_eq!(live.id(), preview.current().unwrap().id());
    assert_eq!(live.state(), Rendered);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_selects_leave_only_open_live_handles() {
    let preview = controller(Arc::new(fixture_loader()), Arc::new(RecordingRenderer::new()));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let preview = Arc::clone(&preview);
            let story_id = if i % 2 == 0 { "button--primary" } else { "card--default" };
            tokio::spawn(async move { preview.select(story_id).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let current = preview.current().unwrap();
    assert!(!current.is_closed());
    assert_eq!(preview.handle(current.story_id()).unwrap().id(), current.id());
    for story_id in ["button--primary", "card--default"] {
        if let Some(handle) = preview.handle(story_id) {
            assert!(!handle.is_closed());
        }
    }
}
