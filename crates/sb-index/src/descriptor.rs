//! Story file descriptors
//!
//! Static metadata extracted from story files by the file enumeration and
//! parsing collaborators. The builder treats them as normalized input.

use crate::naming::ExportFilter;
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Parameters as a JSON object
pub type Parameters = JsonMap<String, JsonValue>;

/// One discovered story file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoryFileDescriptor {
    /// Component story format module
    Csf(CsfFile),

    /// Standalone MDX docs page
    Mdx(MdxFile),
}

impl StoryFileDescriptor {
    /// Import path of the file
    #[inline]
    #[must_use]
    pub fn import_path(&self) -> &str {
        match self {
            Self::Csf(file) => &file.import_path,
            Self::Mdx(file) => &file.import_path,
        }
    }
}

impl From<CsfFile> for StoryFileDescriptor {
    fn from(file: CsfFile) -> Self {
        Self::Csf(file)
    }
}

impl From<MdxFile> for StoryFileDescriptor {
    fn from(file: MdxFile) -> Self {
        Self::Mdx(file)
    }
}

/// CSF module: a default export (meta) plus named story exports
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsfFile {
    /// Logical module path
    pub import_path: String,

    /// Default export; `None` when the module has none
    #[serde(default)]
    pub meta: Option<CsfMeta>,

    /// Named exports in source order
    #[serde(default)]
    pub stories: Vec<CsfStory>,
}

impl CsfFile {
    /// Create file with a meta and no stories
    #[must_use]
    pub fn new(import_path: impl Into<String>, meta: CsfMeta) -> Self {
        Self {
            import_path: import_path.into(),
            meta: Some(meta),
            stories: Vec::new(),
        }
    }

    /// With an additional story export
    #[must_use]
    pub fn with_story(mut self, story: CsfStory) -> Self {
        self.stories.push(story);
        self
    }
}

/// Default export of a CSF module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CsfMeta {
    /// Explicit title
    pub title: Option<String>,

    /// Explicit component id, replacing the sanitized title in story ids
    pub id: Option<String>,

    /// Meta tags
    pub tags: Vec<String>,

    /// Only these exports are stories
    pub include_stories: Option<ExportFilter>,

    /// These exports are not stories
    pub exclude_stories: Option<ExportFilter>,

    /// Component parameters
    pub parameters: Parameters,
}

impl CsfMeta {
    /// Meta with an explicit title
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// With component id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// With tags
    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(ToString::to_string).collect();
        self
    }

    /// With exclusion filter
    #[must_use]
    pub fn with_exclude(mut self, filter: ExportFilter) -> Self {
        self.exclude_stories = Some(filter);
        self
    }

    /// With inclusion filter
    #[must_use]
    pub fn with_include(mut self, filter: ExportFilter) -> Self {
        self.include_stories = Some(filter);
        self
    }
}

/// Named export of a CSF module
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsfStory {
    /// Export name
    pub export_name: String,

    /// Display name override
    #[serde(default)]
    pub name: Option<String>,

    /// Story tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Story parameters
    #[serde(default)]
    pub parameters: Parameters,
}

impl CsfStory {
    /// Story for an export
    #[must_use]
    pub fn new(export_name: impl Into<String>) -> Self {
        Self {
            export_name: export_name.into(),
            ..Self::default()
        }
    }

    /// With display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With tags
    #[must_use]
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(ToString::to_string).collect();
        self
    }
}

/// MDX docs file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MdxFile {
    /// Logical module path
    pub import_path: String,

    /// Explicit title
    #[serde(default)]
    pub title: Option<String>,

    /// Explicit name
    #[serde(default)]
    pub name: Option<String>,

    /// Import path of the CSF file this page documents
    #[serde(default)]
    pub of: Option<String>,

    /// Page tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Imports of stories embedded in the page
    #[serde(default)]
    pub stories_imports: Vec<String>,
}

impl MdxFile {
    /// Unattached page
    #[must_use]
    pub fn new(import_path: impl Into<String>) -> Self {
        Self {
            import_path: import_path.into(),
            ..Self::default()
        }
    }

    /// Attached to a CSF file
    #[must_use]
    pub fn of(mut self, csf_import_path: impl Into<String>) -> Self {
        self.of = Some(csf_import_path.into());
        self
    }

    /// With explicit title
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With explicit name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// With embedded story imports
    #[must_use]
    pub fn with_stories_imports(mut self, imports: &[&str]) -> Self {
        self.stories_imports = imports.iter().map(ToString::to_string).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn descriptors_deserialize_from_json() {
        let files: Vec<StoryFileDescriptor> = serde_json::from_value(json!([
            {
                "kind": "csf",
                "importPath": "./Button.stories.ts",
                "meta": {"title": "Button", "excludeStories": ["helper"], "includeStories": "^[A-Z]"},
                "stories": [{"exportName": "Primary"}]
            },
            {"kind": "mdx", "importPath": "./Intro.mdx", "storiesImports": ["./Button.stories.ts"]}
        ]))
        .unwrap();

        let StoryFileDescriptor::Csf(csf) = &files[0] else {
            panic!("expected csf");
        };
        let meta = csf.meta.as_ref().unwrap();
        assert_eq!(meta.exclude_stories, Some(ExportFilter::List(vec!["helper".into()])));
        assert_eq!(meta.include_stories, Some(ExportFilter::Pattern("^[A-Z]".into())));
        assert_eq!(files[1].import_path(), "./Intro.mdx");
    }
}
