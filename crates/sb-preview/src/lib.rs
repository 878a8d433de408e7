//! Storyboard Preview
//!
//! Render lifecycle for stories: load the module, prepare the story, seed
//! its args, render, and tear down. Every render handle is guarded by a
//! generation counter so a newer selection or a teardown cancels in-flight
//! work without side effects.
//!
//! # Overview
//!
//! - **PreviewController**: selection, args and globals updates, unmount
//! - **RenderHandle**: per-selection state machine with generation guard
//! - **prepare_story**: project, component and story annotation merge
//! - **ModuleLoader / Renderer**: host-supplied async collaborators
//!
//! # Example
//!
//! ```rust
//! use sb_preview::{RenderState, validate_transition};
//!
//! assert!(validate_transition(RenderState::Preparing, RenderState::Rendering).is_ok());
//! assert!(validate_transition(RenderState::TornDown, RenderState::Rendering).is_err());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod annotations;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod handle;
pub mod prepare;
pub mod state_machine;

// Re-exports
pub use annotations::{ComponentAnnotations, CsfModule, ProjectAnnotations, StoryAnnotations};
pub use collaborators::{ModuleLoader, RenderContext, Renderer, Teardown};
pub use config::{PreviewConfig, DEFAULT_MOUNT_POINT};
pub use controller::{PreviewController, RenderOutcome};
pub use error::{
    ConfigError, Interrupt, LoadError, PreviewError, RenderFailure, RenderPhase, StateMachineError,
};
pub use events::PreviewEvent;
pub use handle::{HandleGuard, RenderHandle, Rerender};
pub use prepare::{prepare_story, PreparedStory};
pub use state_machine::{allowed_transitions, validate_transition, RenderState};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving a preview
    pub use crate::{
        CsfModule, LoadError, ModuleLoader, PreviewConfig, PreviewController, PreviewEvent,
        ProjectAnnotations, RenderContext, RenderFailure, RenderOutcome, RenderState, Renderer,
        StoryAnnotations, Teardown,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
