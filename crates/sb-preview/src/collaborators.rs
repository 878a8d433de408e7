//! Host-supplied collaborators: module loading and rendering

use crate::annotations::CsfModule;
use crate::error::{LoadError, RenderFailure};
use crate::prepare::PreparedStory;
use sb_args::Args;
use std::sync::Arc;

/// Cleanup returned by a successful render
pub type Teardown = Box<dyn FnOnce() + Send>;

/// Module loader
///
/// Implement this trait to resolve an import path to its story module.
#[async_trait::async_trait]
pub trait ModuleLoader: Send + Sync {
    /// Load the module at `import_path`
    async fn load(&self, import_path: &str) -> Result<CsfModule, LoadError>;
}

/// Story renderer
///
/// Implement this trait to draw a prepared story into the mount point.
#[async_trait::async_trait]
pub trait Renderer: Send + Sync {
    /// Render once; may return a teardown to run before the next render
    /// of another story or on unmount
    async fn render(&self, context: RenderContext) -> Result<Option<Teardown>, RenderFailure>;
}

/// Everything a single render call needs
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Prepared story
    pub story: Arc<PreparedStory>,

    /// Current args
    pub args: Args,

    /// Current globals
    pub globals: Args,

    /// Opaque mount point
    pub mount_point: String,

    /// Discard previous output instead of updating it in place
    pub force_remount: bool,
}

impl RenderContext {
    /// Story id
    #[inline]
    #[must_use]
    pub fn story_id(&self) -> &str {
        &self.story.id
    }
}
