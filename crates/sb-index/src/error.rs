//! Error types for index building
//!
//! Index errors never abort a build. They are collected per file into
//! [`IndexBuild::errors`](crate::builder::IndexBuild).

/// Index build error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// Story file could not be indexed
    #[error("malformed story file '{import_path}': {reason}")]
    MalformedStoryFile {
        /// File import path
        import_path: String,
        /// What is wrong with it
        reason: String,
    },

    /// Two entries resolved to the same id
    #[error("duplicate id '{id}' ({}): {message}", .import_paths.join(", "))]
    DuplicateId {
        /// Colliding id
        id: String,
        /// Import paths involved, first-seen first
        import_paths: Vec<String>,
        /// Resolution applied
        message: String,
    },

    /// Title, name or id sanitized to an empty identifier
    #[error("invalid {kind} '{value}': it must contain at least one alphanumeric character")]
    InvalidIdentifier {
        /// `title`, `name` or `id`
        kind: &'static str,
        /// Value as authored
        value: String,
    },
}

impl IndexError {
    /// Check whether this error dropped every entry of its file
    ///
    /// Duplicates inside a single file fail that file; duplicates across
    /// files drop only the losing entry.
    #[must_use]
    pub fn is_fatal_for_file(&self) -> bool {
        match self {
            Self::MalformedStoryFile { .. } | Self::InvalidIdentifier { .. } => true,
            Self::DuplicateId { import_paths, .. } => {
                import_paths.windows(2).all(|pair| pair[0] == pair[1])
            }
        }
    }

    /// Import path the error is attributed to
    #[must_use]
    pub fn import_path(&self) -> Option<&str> {
        match self {
            Self::MalformedStoryFile { import_path, .. } => Some(import_path),
            Self::DuplicateId { import_paths, .. } => import_paths.last().map(String::as_str),
            Self::InvalidIdentifier { .. } => None,
        }
    }

    pub(crate) fn malformed(import_path: &str, reason: impl Into<String>) -> Self {
        Self::MalformedStoryFile {
            import_path: import_path.to_string(),
            reason: reason.into(),
        }
    }
}

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure
    #[error("invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse failure
    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
