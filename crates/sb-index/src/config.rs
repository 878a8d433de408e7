//! Indexer configuration

use crate::error::ConfigError;
use crate::title::StoriesSpecifier;
use serde::{Deserialize, Serialize};

/// Default name of docs entries
pub const DEFAULT_DOCS_NAME: &str = "Docs";

/// When autodocs entries are synthesized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutodocsMode {
    /// Never
    Off,

    /// For files whose meta or stories carry the `autodocs` tag
    #[default]
    Tag,

    /// For every file with at least one story
    On,
}

/// Entry ordering of the built index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexSort {
    /// Order files were added in
    #[default]
    Discovery,

    /// By title, stable within a title
    Alphabetical,
}

/// Indexer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Story file locations, first match wins
    pub specifiers: Vec<StoriesSpecifier>,

    /// Autodocs policy
    pub autodocs: AutodocsMode,

    /// Name given to docs entries without an explicit one
    pub docs_name: String,

    /// Tags applied to every entry before meta and story tags
    pub default_tags: Vec<String>,

    /// Legacy separator rewritten to `/` in titles
    pub hierarchy_separator: Option<String>,

    /// Entry ordering
    pub sort: IndexSort,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            specifiers: Vec::new(),
            autodocs: AutodocsMode::default(),
            docs_name: DEFAULT_DOCS_NAME.to_string(),
            default_tags: vec!["dev".to_string(), "test".to_string()],
            hierarchy_separator: None,
            sort: IndexSort::default(),
        }
    }
}

impl IndexerConfig {
    /// Create default configuration
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

    /// With an additional stories specifier
    #[must_use]
    pub fn with_specifier(mut self, specifier: StoriesSpecifier) -> Self {
        self.specifiers.push(specifier);
        self
    }

    /// With autodocs policy
    #[inline]
    #[must_use]
    pub fn with_autodocs(mut self, mode: AutodocsMode) -> Self {
        self.autodocs = mode;
        self
    }

    /// With docs entry name
    #[must_use]
    pub fn with_docs_name(mut self, name: impl Into<String>) -> Self {
        self.docs_name = name.into();
        self
    }

    /// With project default tags
    #[must_use]
    pub fn with_default_tags(mut self, tags: Vec<String>) -> Self {
        self.default_tags = tags;
        self
    }

    /// With legacy hierarchy separator
    #[must_use]
    pub fn with_hierarchy_separator(mut self, separator: impl Into<String>) -> Self {
        self.hierarchy_separator = Some(separator.into());
        self
    }

    /// With entry ordering
    #[inline]
    #[must_use]
    pub fn with_sort(mut self, sort: IndexSort) -> Self {
        self.sort = sort;
        self
    }

    /// First specifier covering `import_path`
    ///
    /// Without configured specifiers every path is covered by the project
    /// root.
    #[must_use]
    pub fn specifier_for(&self, import_path: &str) -> Option<StoriesSpecifier> {
        if self.specifiers.is_empty() {
            return Some(StoriesSpecifier::default());
        }
        self.specifiers
            .iter()
            .find(|s| s.relative_path(import_path).is_some())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = IndexerConfig::default();
        assert_eq!(config.autodocs, AutodocsMode::Tag);
        assert_eq!(config.docs_name, "Docs");
        assert_eq!(config.sort, IndexSort::Discovery);
    }

    #[test]
    fn loads_from_toml() {
        let config = IndexerConfig::from_toml_str(
            r#"
            autodocs = "on"
            docs_name = "Overview"
            sort = "alphabetical"

            [[specifiers]]
            directory = "./src"
            title_prefix = "Library"
            "#,
        )
        .unwrap();

        assert_eq!(config.autodocs, AutodocsMode::On);
        assert_eq!(config.docs_name, "Overview");
        assert_eq!(config.sort, IndexSort::Alphabetical);
        assert_eq!(config.specifiers[0].title_prefix, "Library");
        assert_eq!(config.default_tags, vec!["dev", "test"]);
    }

    #[test]
    fn loads_from_json() {
        let config = IndexerConfig::from_json_str(r#"{"autodocs": "off"}"#).unwrap();
        assert_eq!(config.autodocs, AutodocsMode::Off);
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(IndexerConfig::from_json_str(r#"{"autodocs": "sometimes"}"#).is_err());
    }

    #[test]
    fn first_matching_specifier_wins() {
        let config = IndexerConfig::new()
            .with_specifier(StoriesSpecifier::new("./src").with_title_prefix("A"))
            .with_specifier(StoriesSpecifier::new("./src/deep").with_title_prefix("B"));

        let spec = config.specifier_for("./src/deep/X.stories.ts").unwrap();
        assert_eq!(spec.title_prefix, "A");
        assert!(config.specifier_for("./lib/X.stories.ts").is_none());
    }
}
