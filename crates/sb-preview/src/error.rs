//! Error types for the render lifecycle
//!
//! Two families:
//! - [`Interrupt`]: how a lifecycle step stops early. `Aborted` is silent
//!   cancellation; `Failed` carries a [`RenderFailure`] that ends up on the
//!   handle.
//! - [`PreviewError`]: caller mistakes (unknown story, args not seeded).

use crate::state_machine::RenderState;
use sb_args::ArgsError;
use serde::{Deserialize, Serialize};

/// Lifecycle phase a failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPhase {
    /// Module loading
    Load,
    /// Story preparation
    Prepare,
    /// Renderer call
    Render,
}

impl std::fmt::Display for RenderPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Prepare => "prepare",
            Self::Render => "render",
        };
        f.write_str(name)
    }
}

/// Failure shown in place of a story
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{phase} failed: {message}")]
pub struct RenderFailure {
    /// Phase that failed
    pub phase: RenderPhase,

    /// Human-readable message
    pub message: String,

    /// Stack or backtrace text, when the collaborator supplied one
    pub stack: Option<String>,
}

impl RenderFailure {
    /// Create failure without stack
    #[must_use]
    pub fn new(phase: RenderPhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
            stack: None,
        }
    }

    /// Failure of the renderer
    #[must_use]
    pub fn render(message: impl Into<String>) -> Self {
        Self::new(RenderPhase::Render, message)
    }

    /// Failure of story preparation
    #[must_use]
    pub fn prepare(message: impl Into<String>) -> Self {
        Self::new(RenderPhase::Prepare, message)
    }

    /// With stack text
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

impl From<LoadError> for RenderFailure {
    fn from(err: LoadError) -> Self {
        Self::new(RenderPhase::Load, err.to_string())
    }
}

/// Module loader failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("failed to load '{import_path}': {message}")]
pub struct LoadError {
    /// Requested import path
    pub import_path: String,

    /// Loader message
    pub message: String,
}

impl LoadError {
    /// Create load error
    #[must_use]
    pub fn new(import_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            message: message.into(),
        }
    }
}

/// Early exit of a lifecycle step
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Interrupt {
    /// Handle went stale; stop without side effects
    #[error("render aborted: a newer render or teardown superseded it")]
    Aborted,

    /// Step failed; the failure is recorded on the handle
    #[error(transparent)]
    Failed(RenderFailure),
}

impl Interrupt {
    /// Check for silent cancellation
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<StateMachineError> for Interrupt {
    fn from(err: StateMachineError) -> Self {
        tracing::error!(%err, "render lifecycle bug");
        Self::Failed(RenderFailure::prepare(err.to_string()))
    }
}

/// Illegal handle state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed set
    #[error("illegal render state transition {from:?} -> {to:?}")]
    IllegalTransition {
        /// Current state
        from: RenderState,
        /// Requested state
        to: RenderState,
    },
}

/// Caller errors of the preview controller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    /// Id is not a story entry of the current index
    #[error("no story with id '{0}' in the index")]
    MissingStory(String),

    /// Args store rejected the operation
    #[error(transparent)]
    Args(#[from] ArgsError),
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse failure
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
