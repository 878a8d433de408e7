//! Testing utilities for the storyboard workspace
//!
//! In-memory collaborators, gates for interleaving async steps, and
//! fixtures shared by the crate test suites.

#![allow(missing_docs)]

use parking_lot::Mutex;
use sb_args::{args_from_json, ArgType, ArgTypes, Args};
use sb_index::{build_index, CsfFile, CsfMeta, CsfStory, IndexerConfig, StoryIndex};
use sb_preview::{
    ComponentAnnotations, CsfModule, LoadError, ModuleLoader, PreviewConfig, PreviewController,
    ProjectAnnotations, RenderContext, RenderFailure, Renderer, StoryAnnotations, Teardown,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, Semaphore};

pub const BUTTON_PATH: &str = "./Button.stories.ts";
pub const CARD_PATH: &str = "./Card.stories.ts";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Blocks async steps until a test lets them through
#[derive(Debug)]
pub struct Gate {
    entered: Notify,
    release: Semaphore,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
        })
    }

    /// Called by the gated step
    pub async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.release.acquire().await {
            permit.forget();
        }
    }

    /// Wait until a step reached the gate
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Let one waiting step through
    pub fn open(&self) {
        self.release.add_permits(1);
    }

    /// Let every current and future step through
    pub fn open_all(&self) {
        self.release.close();
    }
}

#[derive(Default)]
pub struct InMemoryLoader {
    modules: Mutex<HashMap<String, Result<CsfModule, String>>>,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    loads: Mutex<Vec<String>>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(self, import_path: &str, module: CsfModule) -> Self {
        self.modules.lock().insert(import_path.to_string(), Ok(module));
        self
    }

    pub fn with_failure(self, import_path: &str, message: &str) -> Self {
        self.modules
            .lock()
            .insert(import_path.to_string(), Err(message.to_string()));
        self
    }

    /// Gate every future load of `import_path`
    pub fn gate(&self, import_path: &str) -> Arc<Gate> {
        let gate = Gate::new();
        self.gates.lock().insert(import_path.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn loads(&self) -> Vec<String> {
        self.loads.lock().clone()
    }
}

#[async_trait::async_trait]
impl ModuleLoader for InMemoryLoader {
    async fn load(&self, import_path: &str) -> Result<CsfModule, LoadError> {
        self.loads.lock().push(import_path.to_string());

        let gate = self.gates.lock().get(import_path).cloned();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        match self.modules.lock().get(import_path) {
            Some(Ok(module)) => Ok(module.clone()),
            Some(Err(message)) => Err(LoadError::new(import_path, message.clone())),
            None => Err(LoadError::new(import_path, "module not found")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderCall {
    pub story_id: String,
    pub args: Args,
    pub globals: Args,
    pub force_remount: bool,
}

#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<RenderCall>>,
    failures: Mutex<HashMap<String, String>>,
    gate: Mutex<Option<Arc<Gate>>>,
    teardowns: Arc<AtomicUsize>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_story(&self, story_id: &str, message: &str) {
        self.failures
            .lock()
            .insert(story_id.to_string(), message.to_string());
    }

    pub fn clear_failure(&self, story_id: &str) {
        self.failures.lock().remove(story_id);
    }

    /// Gate every future render
    pub fn gate(&self) -> Arc<Gate> {
        let gate = Gate::new();
        *self.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn ungate(&self) {
        if let Some(gate) = self.gate.lock().take() {
            gate.open_all();
        }
    }

    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, story_id: &str) -> Vec<RenderCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.story_id == story_id)
            .cloned()
            .collect()
    }

    /// Number of teardown callbacks that ran
    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Renderer for RecordingRenderer {
    async fn render(&self, context: RenderContext) -> Result<Option<Teardown>, RenderFailure> {
        self.calls.lock().push(RenderCall {
            story_id: context.story_id().to_string(),
            args: context.args.clone(),
            globals: context.globals.clone(),
            force_remount: context.force_remount,
        });

        let gate = self.gate.lock().clone();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        if let Some(message) = self.failures.lock().get(context.story_id()) {
            return Err(RenderFailure::render(message.clone()).with_stack("at render (test)"));
        }

        let teardowns = Arc::clone(&self.teardowns);
        Ok(Some(Box::new(move || {
            teardowns.fetch_add(1, Ordering::SeqCst);
        })))
    }
}

fn csf(path: &str, title: &str, exports: &[&str]) -> CsfFile {
    exports
        .iter()
        .fold(CsfFile::new(path, CsfMeta::titled(title)), |file, export| {
            file.with_story(CsfStory::new(*export))
        })
}

/// Index with `button--primary`, `button--secondary` and `card--default`
pub fn fixture_index() -> StoryIndex {
    build_index(
        IndexerConfig::default(),
        [
            csf(BUTTON_PATH, "Button", &["Primary", "Secondary"]),
            csf(CARD_PATH, "Card", &["Default"]),
        ],
    )
    .index
}

pub fn button_module() -> CsfModule {
    let mut arg_types = ArgTypes::new();
    arg_types.insert(
        "size".into(),
        ArgType::new("size").with_options(vec!["small".into(), "large".into()]),
    );

    let meta = ComponentAnnotations {
        args: args_from_json(json!({"label": "Button", "size": "small"})),
        arg_types,
        ..ComponentAnnotations::default()
    };
    CsfModule::new(meta)
        .with_story(
            "Primary",
            StoryAnnotations::new().with_args(args_from_json(json!({"primary": true}))),
        )
        .with_story(
            "Secondary",
            StoryAnnotations::new().with_args(args_from_json(json!({"primary": false}))),
        )
}

pub fn card_module() -> CsfModule {
    CsfModule::new(ComponentAnnotations::default()).with_story(
        "Default",
        StoryAnnotations::new().with_args(args_from_json(json!({"count": 1}))),
    )
}

pub fn fixture_loader() -> InMemoryLoader {
    InMemoryLoader::new()
        .with_module(BUTTON_PATH, button_module())
        .with_module(CARD_PATH, card_module())
}

pub fn fixture_project() -> ProjectAnnotations {
    let mut global_types = ArgTypes::new();
    global_types.insert("theme".into(), ArgType::new("theme").with_default("light"));
    ProjectAnnotations::new().with_globals(Args::new(), global_types)
}

pub fn controller(loader: Arc<InMemoryLoader>, renderer: Arc<RecordingRenderer>) -> Arc<PreviewController> {
    Arc::new(PreviewController::new(
        PreviewConfig::default(),
        fixture_project(),
        fixture_index(),
        loader,
        renderer,
    ))
}
