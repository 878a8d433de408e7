//! Storyboard Index
//!
//! Builds the story index: the ordered catalog of stories and docs pages
//! with stable ids.
//!
//! # Overview
//!
//! - **IndexBuilder**: incremental builder over story file descriptors
//! - **StoryIndex**: versioned, serializable index
//! - **naming**: id sanitization, export names, tag combination
//! - **title**: title derivation from import paths
//!
//! # Example
//!
//! ```rust
//! use sb_index::{build_index, CsfFile, CsfMeta, CsfStory, IndexerConfig};
//!
//! let file = CsfFile::new("./Button.stories.ts", CsfMeta::titled("Button"))
//!     .with_story(CsfStory::new("Primary"));
//!
//! let build = build_index(IndexerConfig::default(), [file]);
//! assert!(build.is_clean());
//! assert_eq!(build.index.get("button--primary").unwrap().name, "Primary");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod builder;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod index;
pub mod naming;
pub mod parameters;
pub mod title;

// Re-exports
pub use builder::{build_index, IndexBuild, IndexBuilder};
pub use config::{AutodocsMode, IndexSort, IndexerConfig, DEFAULT_DOCS_NAME};
pub use descriptor::{CsfFile, CsfMeta, CsfStory, MdxFile, Parameters, StoryFileDescriptor};
pub use error::{ConfigError, IndexError};
pub use index::{EntryType, StoryIndex, StoryIndexEntry, INDEX_VERSION};
pub use naming::{combine_tags, is_export_story, sanitize, story_name_from_export, to_id, ExportFilter, StoryFilter};
pub use title::{auto_title_from_specifier, StoriesSpecifier};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for index building
    pub use crate::{
        build_index, CsfFile, CsfMeta, CsfStory, IndexBuild, IndexBuilder, IndexError, IndexerConfig,
        MdxFile, StoryFileDescriptor, StoryIndex, StoryIndexEntry,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
