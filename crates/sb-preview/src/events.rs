//! Preview events broadcast to subscribers

use crate::error::RenderFailure;
use sb_args::Args;
use serde::Serialize;

/// Lifecycle and state-change notification
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PreviewEvent {
    /// Story prepared and args seeded
    #[serde(rename_all = "camelCase")]
    StoryPrepared {
        /// Story id
        story_id: String,
        /// Args the first render uses
        args: Args,
    },

    /// Render pass finished
    #[serde(rename_all = "camelCase")]
    StoryRendered {
        /// Story id
        story_id: String,
    },

    /// Load, prepare or render failed
    #[serde(rename_all = "camelCase")]
    StoryErrored {
        /// Story id
        story_id: String,
        /// Failure
        failure: RenderFailure,
    },

    /// Current args changed
    #[serde(rename_all = "camelCase")]
    ArgsUpdated {
        /// Story id
        story_id: String,
        /// New current args
        args: Args,
    },

    /// Globals changed
    GlobalsUpdated {
        /// New globals
        globals: Args,
    },

    /// Handle torn down
    #[serde(rename_all = "camelCase")]
    StoryTornDown {
        /// Story id
        story_id: String,
    },
}

impl PreviewEvent {
    /// Story the event concerns, if any
    #[must_use]
    pub fn story_id(&self) -> Option<&str> {
        match self {
            Self::StoryPrepared { story_id, .. }
            | Self::StoryRendered { story_id }
            | Self::StoryErrored { story_id, .. }
            | Self::ArgsUpdated { story_id, .. }
            | Self::StoryTornDown { story_id } => Some(story_id),
            Self::GlobalsUpdated { .. } => None,
        }
    }
}
