//! Story index model
//!
//! Provides [`StoryIndex`], the ordered catalog of story and docs entries.
//! Serializes as `{"v": 4, "entries": {...}}` with entries in index order.

use crate::descriptor::Parameters;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Current index schema version
pub const INDEX_VERSION: u32 = 4;

/// Entry kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Renderable story
    Story,

    /// Docs page
    Docs,
}

/// One story or docs page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryIndexEntry {
    /// Stable id, unique within the index
    pub id: String,

    /// Hierarchical `/`-separated title, lower-cased
    pub title: String,

    /// Title as authored, when its casing differs from `title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authored_title: Option<String>,

    /// Display name
    pub name: String,

    /// Logical module path
    pub import_path: String,

    /// Entry kind
    #[serde(rename = "type")]
    pub entry_type: EntryType,

    /// Ordered tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Export the story comes from (stories only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,

    /// Imports of stories the page embeds (docs only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stories_imports: Vec<String>,

    /// Merged component and story parameters
    #[serde(default, skip_serializing_if = "Parameters::is_empty")]
    pub parameters: Parameters,
}

impl StoryIndexEntry {
    /// Check if this is a story
    #[inline]
    #[must_use]
    pub fn is_story(&self) -> bool {
        self.entry_type == EntryType::Story
    }

    /// Check if this is a docs page
    #[inline]
    #[must_use]
    pub fn is_docs(&self) -> bool {
        self.entry_type == EntryType::Docs
    }

    /// Title for navigation labels, in authored casing
    #[inline]
    #[must_use]
    pub fn display_title(&self) -> &str {
        self.authored_title.as_deref().unwrap_or(&self.title)
    }

    /// Check for a tag
    #[inline]
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Story index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryIndex {
    /// Schema version
    #[serde(rename = "v")]
    pub version: u32,

    /// Entries by id, in index order
    pub entries: IndexMap<String, StoryIndexEntry>,
}

impl Default for StoryIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            entries: IndexMap::new(),
        }
    }
}

impl StoryIndex {
    /// Create empty index
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from entries, keeping their order
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = StoryIndexEntry>) -> Self {
        Self {
            version: INDEX_VERSION,
            entries: entries.into_iter().map(|e| (e.id.clone(), e)).collect(),
        }
    }

    /// Entry by id
    #[inline]
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&StoryIndexEntry> {
        self.entries.get(id)
    }

    /// Check if id is indexed
    #[inline]
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in order
    pub fn iter(&self) -> impl Iterator<Item = &StoryIndexEntry> {
        self.entries.values()
    }

    /// Story entries in order
    pub fn stories(&self) -> impl Iterator<Item = &StoryIndexEntry> {
        self.iter().filter(|e| e.is_story())
    }

    /// Docs entries in order
    pub fn docs(&self) -> impl Iterator<Item = &StoryIndexEntry> {
        self.iter().filter(|e| e.is_docs())
    }

    /// Entries grouped under `title`
    pub fn entries_for_title<'a>(&'a self, title: &'a str) -> impl Iterator<Item = &'a StoryIndexEntry> {
        self.iter().filter(move |e| e.title == title)
    }

    /// Entries loaded from `import_path`
    pub fn entries_for_import_path<'a>(
        &'a self,
        import_path: &'a str,
    ) -> impl Iterator<Item = &'a StoryIndexEntry> {
        self.iter().filter(move |e| e.import_path == import_path)
    }

    /// First story entry, the default selection
    #[must_use]
    pub fn first_story(&self) -> Option<&StoryIndexEntry> {
        self.stories().next()
    }

    /// Serialize to JSON
    ///
    /// # Errors
    /// Returns the serializer error (not expected for well-formed entries)
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
