//! Story preparation
//!
//! Combines project, component and story annotations into a
//! [`PreparedStory`]. Args merge shallowly in that order, arg types merge
//! per field, parameters deep-merge. Args without a declared type get one
//! inferred from their value.

use crate::annotations::{CsfModule, ProjectAnnotations};
use crate::error::RenderFailure;
use sb_args::{infer_arg_types, merge_arg_types, ArgTypes, Args, StoryArgs};
use sb_index::parameters::merge_layers;
use sb_index::{Parameters, StoryIndexEntry};

/// Story ready to render
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedStory {
    /// Story id
    pub id: String,
    /// Display name
    pub name: String,
    /// Component title
    pub title: String,
    /// Module import path
    pub import_path: String,
    /// Export name inside the module
    pub export_name: String,
    /// Combined tags
    pub tags: Vec<String>,
    /// Declared args after merging
    pub initial_args: Args,
    /// Arg types after merging and inference
    pub arg_types: ArgTypes,
    /// Parameters after deep merge
    pub parameters: Parameters,
}

impl StoryArgs for PreparedStory {
    fn id(&self) -> &str {
        &self.id
    }

    fn initial_args(&self) -> &Args {
        &self.initial_args
    }

    fn arg_types(&self) -> &ArgTypes {
        &self.arg_types
    }
}

/// Prepare the story an index entry points at
///
/// # Errors
/// Returns a prepare-phase [`RenderFailure`] when the entry has no export
/// name or the module does not export it.
pub fn prepare_story(
    entry: &StoryIndexEntry,
    module: &CsfModule,
    project: &ProjectAnnotations,
) -> Result<PreparedStory, RenderFailure> {
    let export_name = entry.export_name.as_deref().ok_or_else(|| {
        RenderFailure::prepare(format!("index entry '{}' has no export name", entry.id))
    })?;
    let story = module.story(export_name).ok_or_else(|| {
        RenderFailure::prepare(format!(
            "module '{}' does not export '{export_name}'",
            entry.import_path
        ))
    })?;

    let mut initial_args = project.args.clone();
    initial_args.extend(module.meta.args.iter().map(|(k, v)| (k.clone(), v.clone())));
    initial_args.extend(story.args.iter().map(|(k, v)| (k.clone(), v.clone())));

    let declared = merge_arg_types([&project.arg_types, &module.meta.arg_types, &story.arg_types]);
    let arg_types = infer_arg_types(&initial_args, &declared);

    let parameters = merge_layers([&project.parameters, &module.meta.parameters, &story.parameters]);

    tracing::debug!(
        story = %entry.id,
        args = initial_args.len(),
        arg_types = arg_types.len(),
        "prepared story"
    );

    Ok(PreparedStory {
        id: entry.id.clone(),
        name: story.name.clone().unwrap_or_else(|| entry.name.clone()),
        title: entry.title.clone(),
        import_path: entry.import_path.clone(),
        export_name: export_name.to_string(),
        tags: entry.tags.clone(),
        initial_args,
        arg_types,
        parameters,
    })
}
