//! Runtime annotations: project-wide, component (meta) and story level
//!
//! A loaded story module is represented by [`CsfModule`]. Project
//! annotations are the preview-wide defaults every story starts from.

use crate::error::ConfigError;
use indexmap::IndexMap;
use sb_args::{ArgTypes, Args};
use sb_index::Parameters;
use serde::{Deserialize, Serialize};

/// Project-wide annotations
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectAnnotations {
    /// Args shared by every story
    pub args: Args,

    /// Arg types shared by every story
    pub arg_types: ArgTypes,

    /// Parameters shared by every story
    pub parameters: Parameters,

    /// Initial globals
    pub globals: Args,

    /// Global types; their defaults seed missing globals
    pub global_types: ArgTypes,
}

impl ProjectAnnotations {
    /// Create empty annotations
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from TOML
    ///
    /// # Errors
    /// Returns [`ConfigError::Toml`] on malformed input
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    /// Parse from JSON
    ///
    /// # Errors
    /// Returns [`ConfigError::Json`] on malformed input
    pub fn from_json_str(input: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(input)?)
    }

    /// With project args
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// With project arg types
    #[must_use]
    pub fn with_arg_types(mut self, arg_types: ArgTypes) -> Self {
        self.arg_types = arg_types;
        self
    }

    /// With project parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    /// With globals and global types
    #[must_use]
    pub fn with_globals(mut self, globals: Args, global_types: ArgTypes) -> Self {
        self.globals = globals;
        self.global_types = global_types;
        self
    }
}

/// Component-level annotations (the module's default export)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComponentAnnotations {
    /// Declared title, if any
    pub title: Option<String>,

    /// Args for every story of the component
    pub args: Args,

    /// Arg types for every story of the component
    pub arg_types: ArgTypes,

    /// Parameters for every story of the component
    pub parameters: Parameters,
}

/// Story-level annotations (one named export)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoryAnnotations {
    /// Explicit display name
    pub name: Option<String>,

    /// Story args
    pub args: Args,

    /// Story arg types
    pub arg_types: ArgTypes,

    /// Story parameters
    pub parameters: Parameters,
}

impl StoryAnnotations {
    /// Create empty story annotations
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With args
    #[must_use]
    pub fn with_args(mut self, args: Args) -> Self {
        self.args = args;
        self
    }

    /// With arg types
    #[must_use]
    pub fn with_arg_types(mut self, arg_types: ArgTypes) -> Self {
        self.arg_types = arg_types;
        self
    }

    /// With parameters
    #[must_use]
    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Loaded story module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsfModule {
    /// Default export
    pub meta: ComponentAnnotations,

    /// Named exports, keyed by export name
    pub stories: IndexMap<String, StoryAnnotations>,
}

impl CsfModule {
    /// Create module with meta and no stories
    #[must_use]
    pub fn new(meta: ComponentAnnotations) -> Self {
        Self {
            meta,
            stories: IndexMap::new(),
        }
    }

    /// With a story export
    #[must_use]
    pub fn with_story(mut self, export_name: impl Into<String>, story: StoryAnnotations) -> Self {
        self.stories.insert(export_name.into(), story);
        self
    }

    /// Story annotations for an export
    #[inline]
    #[must_use]
    pub fn story(&self, export_name: &str) -> Option<&StoryAnnotations> {
        self.stories.get(export_name)
    }
}
