//! Title derivation from import paths
//!
//! A story file without an explicit title gets one from its path relative
//! to the stories specifier that matched it:
//!
//! ```text
//! ./src/components/Button/Button.stories.tsx   (directory ./src)
//!   -> components/Button/Button     strip extension
//!   -> components/Button            drop repeated trailing segment
//! ```

/// Where story files live, and how their titles are prefixed
#[derive(Debug, Clone, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StoriesSpecifier {
    /// Directory the specifier covers, relative to the project root
    pub directory: String,

    /// Prefix prepended to every title from this directory
    pub title_prefix: String,
}

impl StoriesSpecifier {
    /// Create specifier for a directory
    #[must_use]
    pub fn new(directory: impl Into<String>) -> Self {
        Self {
            directory: directory.into(),
            title_prefix: String::new(),
        }
    }

    /// With title prefix
    #[must_use]
    pub fn with_title_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.title_prefix = prefix.into();
        self
    }

    /// Path of `import_path` relative to this specifier's directory
    #[must_use]
    pub fn relative_path<'a>(&self, import_path: &'a str) -> Option<&'a str> {
        let dir = normalize_path(&self.directory);
        let path = normalize_path(import_path);
        if dir.is_empty() {
            return Some(path);
        }
        path.strip_prefix(dir)?.strip_prefix('/')
    }

    /// Prefix an explicit title
    #[must_use]
    pub fn prefix_title(&self, title: &str) -> String {
        let prefix = self.title_prefix.trim_matches('/');
        if prefix.is_empty() {
            title.to_string()
        } else {
            format!("{prefix}/{title}")
        }
    }
}

fn normalize_path(path: &str) -> &str {
    let path = path.strip_prefix("./").unwrap_or(path);
    let path = if path == "." { "" } else { path };
    path.trim_end_matches('/')
}

/// Derive a title from an import path
///
/// Returns `None` when the specifier does not cover the path or nothing
/// remains after stripping.
#[must_use]
pub fn auto_title_from_specifier(import_path: &str, specifier: &StoriesSpecifier) -> Option<String> {
    let relative = specifier.relative_path(import_path)?;

    let mut segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let file = segments.pop()?;
    let stem = file.split('.').next().unwrap_or(file);
    if !stem.is_empty() {
        segments.push(stem);
    }

    if let [.., parent, last] = segments.as_slice() {
        if last.eq_ignore_ascii_case("index") || last.eq_ignore_ascii_case(parent) {
            segments.pop();
        }
    } else if segments.len() == 1 && segments[0].eq_ignore_ascii_case("index") {
        segments.pop();
    }

    let prefix = specifier.title_prefix.trim_matches('/');
    let title = std::iter::once(prefix)
        .filter(|p| !p.is_empty())
        .chain(segments)
        .collect::<Vec<_>>()
        .join("/");

    (!title.is_empty()).then_some(title)
}

/// Rewrite a legacy hierarchy separator to `/`
#[must_use]
pub fn normalize_title(title: &str, hierarchy_separator: Option<&str>) -> String {
    match hierarchy_separator {
        Some(sep) if !sep.is_empty() && sep != "/" => title.replace(sep, "/"),
        _ => title.to_string(),
    }
}
