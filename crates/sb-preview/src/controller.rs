//! Preview controller
//!
//! Owns the story index, the args and globals stores and the live render
//! handles. Each selection creates a fresh [`RenderHandle`], tears down
//! whatever was showing before, then loads, prepares and renders the story.
//!
//! # Concurrency
//!
//! - At most one live handle per story id, and one current selection.
//! - `parking_lot` locks are never held across `.await`.
//! - Lock order is handle, then args or globals store.
//! - `current` and `live` change together under the `current` lock.

use crate::annotations::ProjectAnnotations;
use crate::collaborators::{ModuleLoader, RenderContext, Renderer};
use crate::config::PreviewConfig;
use crate::error::{Interrupt, PreviewError, RenderFailure};
use crate::events::PreviewEvent;
use crate::handle::{RenderHandle, Rerender};
use crate::prepare::{prepare_story, PreparedStory};
use crate::state_machine::RenderState;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use sb_args::{Args, ArgsError, ArgsStore, ArgsUpdate, GlobalsStore};
use sb_index::{StoryIndex, StoryIndexEntry};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Result of a selection or re-render
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// Story is on screen
    Rendered,

    /// Failure is on screen in place of the story
    Errored(RenderFailure),

    /// Superseded by a newer selection or a teardown
    Aborted,
}

/// Preview controller
pub struct PreviewController {
    config: PreviewConfig,
    project: ProjectAnnotations,
    index: RwLock<Arc<StoryIndex>>,
    loader: Arc<dyn ModuleLoader>,
    renderer: Arc<dyn Renderer>,
    args: Mutex<ArgsStore>,
    globals: Mutex<GlobalsStore>,
    prepared: DashMap<String, Arc<PreparedStory>>,
    live: DashMap<String, Arc<RenderHandle>>,
    current: Mutex<Option<Arc<RenderHandle>>>,
    next_handle: AtomicU64,
    events: broadcast::Sender<PreviewEvent>,
}

impl PreviewController {
    /// Create controller; globals are seeded from the project annotations
    #[must_use]
    pub fn new(
        config: PreviewConfig,
        project: ProjectAnnotations,
        index: StoryIndex,
        loader: Arc<dyn ModuleLoader>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let mut globals = GlobalsStore::new();
        globals.set(project.globals.clone(), project.global_types.clone());
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        tracing::info!(stories = index.stories().count(), "preview controller ready");

        Self {
            config,
            project,
            index: RwLock::new(Arc::new(index)),
            loader,
            renderer,
            args: Mutex::new(ArgsStore::new()),
            globals: Mutex::new(globals),
            prepared: DashMap::new(),
            live: DashMap::new(),
            current: Mutex::new(None),
            next_handle: AtomicU64::new(1),
            events,
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Current index
    #[must_use]
    pub fn index(&self) -> Arc<StoryIndex> {
        Arc::clone(&*self.index.read())
    }

    /// Subscribe to preview events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<PreviewEvent> {
        self.events.subscribe()
    }

    /// Handle of the current selection
    #[must_use]
    pub fn current(&self) -> Option<Arc<RenderHandle>> {
        self.current.lock().clone()
    }

    /// Live handle for a story
    #[must_use]
    pub fn handle(&self, story_id: &str) -> Option<Arc<RenderHandle>> {
        self.live.get(story_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Current args of a story
    ///
    /// # Errors
    /// Returns [`PreviewError::Args`] if the story was never prepared
    pub fn args(&self, story_id: &str) -> Result<Args, PreviewError> {
        Ok(self.args.lock().get(story_id)?.clone())
    }

    /// Current globals
    #[must_use]
    pub fn globals(&self) -> Args {
        self.globals.lock().get().clone()
    }

    /// Select and render a story
    ///
    /// Tears down the previous selection and any live handle for the same
    /// story first.
    ///
    /// # Errors
    /// Returns [`PreviewError::MissingStory`] if the id is not a story entry
    /// of the current index.
    pub async fn select(&self, story_id: &str) -> Result<RenderOutcome, PreviewError> {
        let entry = self
            .index
            .read()
            .get(story_id)
            .filter(|entry| entry.is_story())
            .cloned()
            .ok_or_else(|| PreviewError::MissingStory(story_id.to_string()))?;

        let handle = Arc::new(RenderHandle::new(
            self.next_handle.fetch_add(1, Ordering::Relaxed),
            story_id,
        ));
        let generation = handle.generation();

        let (previous, same_story) = {
            let mut current = self.current.lock();
            let previous = current.replace(Arc::clone(&handle));
            let same_story = self.live.insert(story_id.to_string(), Arc::clone(&handle));
            if let Some(previous) = &previous {
                self.live
                    .remove_if(previous.story_id(), |_, live| Arc::ptr_eq(live, previous));
            }
            (previous, same_story)
        };
        if let Some(previous) = previous {
            self.close(&previous);
        }
        if let Some(same_story) = same_story {
            self.close(&same_story);
        }

        tracing::info!(story = story_id, handle = handle.id(), "selecting story");
        let result = self.load_and_render(&handle, generation, &entry).await;
        Ok(self.settle(&handle, result))
    }

    /// Shallow-merge an update into a story's args and re-render it
    ///
    /// Set values outside a declared `options` list are dropped.
    ///
    /// # Errors
    /// Returns [`PreviewError::Args`] if the story was never prepared
    pub async fn update_args(&self, story_id: &str, update: &ArgsUpdate) -> Result<Args, PreviewError> {
        let story = self.prepared_story(story_id)?;
        let args = self
            .args
            .lock()
            .update_validated(story.as_ref(), update)?
            .clone();
        Ok(self.args_changed(story_id, args).await)
    }

    /// Restore initial args (all, or only `keys`) and re-render
    ///
    /// # Errors
    /// Returns [`PreviewError::Args`] if the story was never prepared
    pub async fn reset_args(&self, story_id: &str, keys: Option<&[String]>) -> Result<Args, PreviewError> {
        let args = self.args.lock().reset(story_id, keys)?.clone();
        Ok(self.args_changed(story_id, args).await)
    }

    /// Apply persisted raw args, coerced to the story's arg types
    ///
    /// # Errors
    /// Returns [`PreviewError::Args`] if the story was never prepared
    pub async fn apply_persisted_args(&self, story_id: &str, persisted: &Args) -> Result<Args, PreviewError> {
        let story = self.prepared_story(story_id)?;
        let args = self
            .args
            .lock()
            .update_from_persisted(story.as_ref(), persisted)?
            .clone();
        Ok(self.args_changed(story_id, args).await)
    }

    /// Shallow-merge globals and re-render every live story
    pub async fn update_globals(&self, partial: &Args) -> Args {
        let globals = self.globals.lock().update(partial).clone();
        self.globals_changed(globals).await
    }

    /// Apply persisted raw globals and re-render every live story
    pub async fn apply_persisted_globals(&self, persisted: &Args) -> Args {
        let globals = self.globals.lock().update_from_persisted(persisted).clone();
        self.globals_changed(globals).await
    }

    /// Tear down the current selection
    ///
    /// Returns `false` when nothing was selected.
    pub fn unmount(&self) -> bool {
        let handle = {
            let mut current = self.current.lock();
            let Some(handle) = current.take() else {
                return false;
            };
            self.live
                .remove_if(handle.story_id(), |_, live| Arc::ptr_eq(live, &handle));
            handle
        };
        self.close(&handle);
        true
    }

    /// Swap in a new index
    ///
    /// Stories that disappeared lose their args state and live handles.
    /// Returns the ids that were dropped.
    pub fn replace_index(&self, index: StoryIndex) -> Vec<String> {
        let is_story = |id: &str| index.get(id).is_some_and(StoryIndexEntry::is_story);

        let removed: Vec<String> = {
            let mut store = self.args.lock();
            let gone: Vec<String> = store
                .story_ids()
                .filter(|id| !is_story(*id))
                .map(str::to_string)
                .collect();
            for id in &gone {
                store.remove(id);
            }
            gone
        };
        self.prepared.retain(|id, _| is_story(id.as_str()));

        let stale: Vec<Arc<RenderHandle>> = self
            .live
            .iter()
            .filter(|entry| !is_story(entry.key().as_str()))
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        for handle in &stale {
            self.live.remove_if(handle.story_id(), |_, live| Arc::ptr_eq(live, handle));
            {
                let mut current = self.current.lock();
                if current.as_ref().is_some_and(|c| Arc::ptr_eq(c, handle)) {
                    *current = None;
                }
            }
            self.close(handle);
        }

        tracing::info!(
            stories = index.stories().count(),
            dropped = removed.len(),
            closed = stale.len(),
            "story index replaced"
        );
        *self.index.write() = Arc::new(index);
        removed
    }

    fn prepared_story(&self, story_id: &str) -> Result<Arc<PreparedStory>, PreviewError> {
        self.prepared
            .get(story_id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ArgsError::NotRendered(story_id.to_string()).into())
    }

    async fn load_and_render(
        &self,
        handle: &RenderHandle,
        generation: u64,
        entry: &StoryIndexEntry,
    ) -> Result<(), Interrupt> {
        let module = match self.loader.load(&entry.import_path).await {
            Ok(module) => module,
            Err(err) => {
                tracing::warn!(story = %entry.id, %err, "module load failed");
                return Err(self.fail(handle, generation, err.into()));
            }
        };

        let story = match prepare_story(entry, &module, &self.project) {
            Ok(story) => Arc::new(story),
            Err(failure) => return Err(self.fail(handle, generation, failure)),
        };

        let context = {
            let mut guard = handle.guard(generation)?;
            let args = {
                let mut store = self.args.lock();
                store.set_initial(story.as_ref());
                store.get(&story.id).cloned().unwrap_or_default()
            };
            guard.set_story(Arc::clone(&story));
            guard.transition(RenderState::Rendering)?;
            self.prepared.insert(story.id.clone(), Arc::clone(&story));

            RenderContext {
                story: Arc::clone(&story),
                args,
                globals: self.globals(),
                mount_point: self.config.mount_point.clone(),
                force_remount: self.config.force_remount_on_select,
            }
        };
        self.emit(PreviewEvent::StoryPrepared {
            story_id: story.id.clone(),
            args: context.args.clone(),
        });

        self.render_passes(handle, generation, context).await
    }

    async fn render_passes(
        &self,
        handle: &RenderHandle,
        generation: u64,
        mut context: RenderContext,
    ) -> Result<(), Interrupt> {
        loop {
            let result = self.renderer.render(context.clone()).await;

            let again = match handle.guard(generation) {
                Err(interrupt) => {
                    if let Ok(Some(teardown)) = result {
                        tracing::debug!(story = handle.story_id(), "tearing down superseded render");
                        teardown();
                    }
                    return Err(interrupt);
                }
                Ok(mut guard) => match result {
                    Ok(teardown) => {
                        guard.set_teardown(teardown);
                        if guard.take_pending_rerender() {
                            true
                        } else {
                            guard.transition(RenderState::Rendered)?;
                            false
                        }
                    }
                    Err(failure) => {
                        guard.fail(failure.clone())?;
                        drop(guard);
                        self.emit_failure(handle, &failure);
                        return Err(Interrupt::Failed(failure));
                    }
                },
            };

            if !again {
                self.emit(PreviewEvent::StoryRendered {
                    story_id: handle.story_id().to_string(),
                });
                return Ok(());
            }
            context = self.rerender_context(Arc::clone(&context.story));
        }
    }

    async fn rerender(&self, handle: &RenderHandle) -> Option<RenderOutcome> {
        let Rerender::Start { generation, story } = handle.request_rerender() else {
            return None;
        };
        let context = self.rerender_context(story);
        let result = self.render_passes(handle, generation, context).await;
        Some(self.settle(handle, result))
    }

    fn rerender_context(&self, story: Arc<PreparedStory>) -> RenderContext {
        let args = self.args.lock().get(&story.id).cloned().unwrap_or_default();
        RenderContext {
            story,
            args,
            globals: self.globals(),
            mount_point: self.config.mount_point.clone(),
            force_remount: false,
        }
    }

    async fn args_changed(&self, story_id: &str, args: Args) -> Args {
        self.emit(PreviewEvent::ArgsUpdated {
            story_id: story_id.to_string(),
            args: args.clone(),
        });
        if let Some(handle) = self.handle(story_id) {
            self.rerender(&handle).await;
        }
        args
    }

    async fn globals_changed(&self, globals: Args) -> Args {
        self.emit(PreviewEvent::GlobalsUpdated {
            globals: globals.clone(),
        });
        let handles: Vec<Arc<RenderHandle>> =
            self.live.iter().map(|entry| Arc::clone(entry.value())).collect();
        for handle in handles {
            self.rerender(&handle).await;
        }
        globals
    }

    fn fail(&self, handle: &RenderHandle, generation: u64, failure: RenderFailure) -> Interrupt {
        let recorded = match handle.guard(generation) {
            Ok(mut guard) => guard.fail(failure.clone()),
            Err(interrupt) => return interrupt,
        };
        if let Err(err) = recorded {
            return err.into();
        }
        self.emit_failure(handle, &failure);
        Interrupt::Failed(failure)
    }

    fn settle(&self, handle: &RenderHandle, result: Result<(), Interrupt>) -> RenderOutcome {
        match result {
            Ok(()) => {
                tracing::info!(story = handle.story_id(), "story rendered");
                RenderOutcome::Rendered
            }
            Err(Interrupt::Aborted) => {
                tracing::debug!(story = handle.story_id(), handle = handle.id(), "render aborted");
                RenderOutcome::Aborted
            }
            Err(Interrupt::Failed(failure)) => RenderOutcome::Errored(failure),
        }
    }

    fn emit_failure(&self, handle: &RenderHandle, failure: &RenderFailure) {
        tracing::warn!(story = handle.story_id(), %failure, "story errored");
        self.emit(PreviewEvent::StoryErrored {
            story_id: handle.story_id().to_string(),
            failure: failure.clone(),
        });
    }

    fn close(&self, handle: &RenderHandle) {
        if handle.teardown() {
            self.emit(PreviewEvent::StoryTornDown {
                story_id: handle.story_id().to_string(),
            });
        }
    }

    fn emit(&self, event: PreviewEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for PreviewController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewController")
            .field("config", &self.config)
            .field("live", &self.live.len())
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}
