//! Render handle: one selection of one story
//!
//! Every handle carries a generation counter. Each async step of the
//! lifecycle captures the generation when it starts and must pass
//! [`RenderHandle::guard`] before touching state or running side effects.
//! Teardown and re-render requests bump the generation, so continuations
//! that were in flight fail the guard with [`Interrupt::Aborted`].

use crate::collaborators::Teardown;
use crate::error::{Interrupt, RenderFailure, StateMachineError};
use crate::prepare::PreparedStory;
use crate::state_machine::{self, RenderState};
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::Arc;

/// Answer to a re-render request
#[derive(Debug, Clone)]
pub enum Rerender {
    /// Caller owns a new render pass at this generation
    Start {
        /// Generation the pass must guard with
        generation: u64,
        /// Story to render
        story: Arc<PreparedStory>,
    },

    /// A render is in flight; it will run again with the latest args
    Queued,

    /// Still preparing; the first render reads the latest args anyway
    Deferred,

    /// Nothing to render (torn down, or failed before preparation)
    Closed,
}

struct HandleState {
    state: RenderState,
    generation: u64,
    failure: Option<RenderFailure>,
    history: Vec<RenderState>,
    teardown: Option<Teardown>,
    story: Option<Arc<PreparedStory>>,
    pending_rerender: bool,
}

/// Render handle
pub struct RenderHandle {
    id: u64,
    story_id: String,
    inner: Mutex<HandleState>,
}

impl RenderHandle {
    /// Create handle in `Preparing` at generation 0
    #[must_use]
    pub fn new(id: u64, story_id: impl Into<String>) -> Self {
        Self {
            id,
            story_id: story_id.into(),
            inner: Mutex::new(HandleState {
                state: RenderState::Preparing,
                generation: 0,
                failure: None,
                history: vec![RenderState::Preparing],
                teardown: None,
                story: None,
                pending_rerender: false,
            }),
        }
    }

    /// Handle id, unique per controller
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Story this handle renders
    #[inline]
    #[must_use]
    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> RenderState {
        self.inner.lock().state
    }

    /// Current generation
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Failure recorded by the last render attempt
    #[must_use]
    pub fn failure(&self) -> Option<RenderFailure> {
        self.inner.lock().failure.clone()
    }

    /// Every state the handle has been in, oldest first
    #[must_use]
    pub fn history(&self) -> Vec<RenderState> {
        self.inner.lock().history.clone()
    }

    /// Prepared story, once preparation succeeded
    #[must_use]
    pub fn story(&self) -> Option<Arc<PreparedStory>> {
        self.inner.lock().story.clone()
    }

    /// Check if the handle is torn down or tearing down
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.lock().state.is_closing()
    }

    /// Lock the handle for a continuation that started at `captured`
    ///
    /// # Errors
    /// Returns [`Interrupt::Aborted`] if the generation moved on or the
    /// handle is closing.
    pub fn guard(&self, captured: u64) -> Result<HandleGuard<'_>, Interrupt> {
        let inner = self.inner.lock();
        if inner.generation != captured || inner.state.is_closing() {
            return Err(Interrupt::Aborted);
        }
        Ok(HandleGuard {
            story_id: &self.story_id,
            inner,
        })
    }

    /// Ask for another render pass with fresh args
    pub fn request_rerender(&self) -> Rerender {
        let mut inner = self.inner.lock();
        match inner.state {
            RenderState::Preparing => Rerender::Deferred,
            RenderState::Rendering => {
                inner.pending_rerender = true;
                Rerender::Queued
            }
            RenderState::Rendered | RenderState::Errored => {
                let Some(story) = inner.story.clone() else {
                    return Rerender::Closed;
                };
                inner.generation += 1;
                inner.failure = None;
                inner.state = RenderState::Rendering;
                inner.history.push(RenderState::Rendering);
                tracing::debug!(story = %self.story_id, generation = inner.generation, "re-rendering");
                Rerender::Start {
                    generation: inner.generation,
                    story,
                }
            }
            RenderState::TearingDown | RenderState::TornDown => Rerender::Closed,
        }
    }

    /// Tear the handle down
    ///
    /// Bumps the generation so in-flight continuations abort, then runs the
    /// renderer's teardown outside the lock. Returns `false` if the handle
    /// was already closing.
    pub fn teardown(&self) -> bool {
        let callback = {
            let mut inner = self.inner.lock();
            if inner.state.is_closing() {
                return false;
            }
            inner.generation += 1;
            inner.state = RenderState::TearingDown;
            inner.history.push(RenderState::TearingDown);
            inner.pending_rerender = false;
            inner.teardown.take()
        };

        if let Some(callback) = callback {
            callback();
        }

        let mut inner = self.inner.lock();
        inner.state = RenderState::TornDown;
        inner.history.push(RenderState::TornDown);
        tracing::debug!(story = %self.story_id, handle = self.id, "torn down");
        true
    }
}

impl fmt::Debug for RenderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("RenderHandle")
            .field("id", &self.id)
            .field("story_id", &self.story_id)
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .field("failure", &inner.failure)
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a handle whose generation is still current
///
/// Must not be held across an `.await`.
pub struct HandleGuard<'a> {
    story_id: &'a str,
    inner: MutexGuard<'a, HandleState>,
}

impl HandleGuard<'_> {
    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> RenderState {
        self.inner.state
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns [`StateMachineError::IllegalTransition`] for a transition the
    /// state machine does not allow.
    pub fn transition(&mut self, to: RenderState) -> Result<(), StateMachineError> {
        let from = self.inner.state;
        state_machine::validate_transition(from, to)?;
        self.inner.state = to;
        self.inner.history.push(to);
        tracing::debug!(story = %self.story_id, ?from, ?to, "render state");
        Ok(())
    }

    /// Record a failure and move to `Errored`
    ///
    /// # Errors
    /// Returns [`StateMachineError::IllegalTransition`] if the handle cannot
    /// fail from its current state.
    pub fn fail(&mut self, failure: RenderFailure) -> Result<(), StateMachineError> {
        self.transition(RenderState::Errored)?;
        self.inner.pending_rerender = false;
        self.inner.failure = Some(failure);
        Ok(())
    }

    /// Attach the prepared story
    pub fn set_story(&mut self, story: Arc<PreparedStory>) {
        self.inner.story = Some(story);
    }

    /// Replace the stored teardown
    pub fn set_teardown(&mut self, teardown: Option<Teardown>) {
        self.inner.teardown = teardown;
    }

    /// Consume a queued re-render request
    pub fn take_pending_rerender(&mut self) -> bool {
        std::mem::take(&mut self.inner.pending_rerender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn guard_rejects_stale_generation() {
        let handle = RenderHandle::new(1, "button--primary");
        let captured = handle.generation();
        assert!(handle.teardown());

        assert!(matches!(handle.guard(captured), Err(Interrupt::Aborted)));
        assert_eq!(handle.state(), RenderState::TornDown);
    }

    #[test]
    fn teardown_runs_callback_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let handle = RenderHandle::new(1, "button--primary");
        {
            let counter = Arc::clone(&calls);
            let mut guard = handle.guard(0).unwrap();
            guard.transition(RenderState::Rendering).unwrap();
            guard.set_teardown(Some(Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })));
            guard.transition(RenderState::Rendered).unwrap();
        }

        assert!(handle.teardown());
        assert!(!handle.teardown());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            handle.history(),
            vec![
                RenderState::Preparing,
                RenderState::Rendering,
                RenderState::Rendered,
                RenderState::TearingDown,
                RenderState::TornDown,
            ]
        );
    }

    #[test]
    fn rerender_while_rendering_is_queued() {
        let handle = RenderHandle::new(1, "button--primary");
        handle.guard(0).unwrap().transition(RenderState::Rendering).unwrap();

        assert!(matches!(handle.request_rerender(), Rerender::Queued));
        assert!(handle.guard(0).unwrap().take_pending_rerender());
    }

    #[test]
    fn rerender_after_early_failure_is_closed() {
        let handle = RenderHandle::new(1, "button--primary");
        handle
            .guard(0)
            .unwrap()
            .fail(RenderFailure::prepare("boom"))
            .unwrap();

        assert!(matches!(handle.request_rerender(), Rerender::Closed));
        assert_eq!(handle.failure().map(|f| f.message), Some("boom".to_string()));
    }
}
