//! Render handle states and their legal transitions

use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};

/// Phase of a render handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderState {
    /// Loading the module and preparing the story
    Preparing,
    /// Renderer call in flight
    Rendering,
    /// Renderer succeeded
    Rendered,
    /// Load, prepare or render failed
    Errored,
    /// Teardown in progress
    TearingDown,
    /// Terminal
    TornDown,
}

impl RenderState {
    /// Check if the handle has been torn down or is being torn down
    #[inline]
    #[must_use]
    pub fn is_closing(self) -> bool {
        matches!(self, Self::TearingDown | Self::TornDown)
    }

    /// Check if the handle has settled after a render attempt
    #[inline]
    #[must_use]
    pub fn is_settled(self) -> bool {
        matches!(self, Self::Rendered | Self::Errored)
    }
}

/// Validate a state transition
///
/// # Errors
/// Returns [`StateMachineError::IllegalTransition`] when `to` is not reachable
/// from `from` in one step.
pub fn validate_transition(from: RenderState, to: RenderState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RenderState) -> Vec<RenderState> {
    use RenderState::{Errored, Preparing, Rendered, Rendering, TearingDown, TornDown};
    match from {
        Preparing => vec![Rendering, Errored, TearingDown],
        Rendering => vec![Rendered, Errored, TearingDown],
        Rendered | Errored => vec![Rendering, TearingDown],
        TearingDown => vec![TornDown],
        TornDown => vec![],
    }
}

fn allowed(from: RenderState, to: RenderState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
