//! Id, name and tag helpers
//!
//! Ids are `sanitize(component) + "--" + sanitize(name)`; they are stable
//! across rebuilds as long as titles and export names are.

use crate::error::IndexError;
use once_cell::sync::Lazy;
use regex::Regex;

/// Export key that never produces a story
pub const ES_MODULE_MARKER: &str = "__esModule";

static SEPARATOR_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\p{P}\p{S}]+").expect("invalid separator regex"));

/// Lower-case, collapse punctuation and whitespace runs into single hyphens,
/// trim hyphens from both ends
#[must_use]
pub fn sanitize(value: &str) -> String {
    let lowered = value.to_lowercase();
    SEPARATOR_RUN
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}

/// Build an entry id from its component part and name
///
/// # Errors
/// Returns [`IndexError::InvalidIdentifier`] if either part sanitizes to an
/// empty string
pub fn to_id(component: &str, name: &str) -> Result<String, IndexError> {
    let component_id = sanitize(component);
    if component_id.is_empty() {
        return Err(IndexError::InvalidIdentifier {
            kind: "component",
            value: component.to_string(),
        });
    }
    let name_id = sanitize(name);
    if name_id.is_empty() {
        return Err(IndexError::InvalidIdentifier {
            kind: "name",
            value: name.to_string(),
        });
    }
    Ok(format!("{component_id}--{name_id}"))
}

/// Display name for an export key: `PrimaryButton` -> `Primary Button`
#[must_use]
pub fn story_name_from_export(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            flush_word(&mut current, &mut words);
            continue;
        }
        if let Some(&prev) = i.checked_sub(1).and_then(|p| chars.get(p)) {
            let next = chars.get(i + 1).copied();
            let boundary = (prev.is_lowercase() && c.is_uppercase())
                || (prev.is_alphabetic() && c.is_numeric())
                || (prev.is_numeric() && c.is_alphabetic())
                || (prev.is_uppercase() && c.is_uppercase() && next.is_some_and(char::is_lowercase));
            if boundary {
                flush_word(&mut current, &mut words);
            }
        }
        current.push(c);
    }
    flush_word(&mut current, &mut words);

    words
        .iter()
        .map(|word| capitalize(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn flush_word(current: &mut String, words: &mut Vec<String>) {
    if !current.is_empty() {
        words.push(std::mem::take(current));
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `includeStories` / `excludeStories` filter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum ExportFilter {
    /// Exact export names
    List(Vec<String>),

    /// Regular expression over export names
    Pattern(String),
}

impl ExportFilter {
    fn compile(&self) -> Result<Matcher, regex::Error> {
        Ok(match self {
            Self::List(names) => Matcher::List(names.clone()),
            Self::Pattern(pattern) => Matcher::Pattern(Regex::new(pattern)?),
        })
    }
}

#[derive(Debug, Clone)]
enum Matcher {
    List(Vec<String>),
    Pattern(Regex),
}

impl Matcher {
    fn matches(&self, key: &str) -> bool {
        match self {
            Self::List(names) => names.iter().any(|n| n == key),
            Self::Pattern(regex) => regex.is_match(key),
        }
    }
}

/// Compiled `includeStories` / `excludeStories` pair for one file
#[derive(Debug, Clone, Default)]
pub struct StoryFilter {
    include: Option<Matcher>,
    exclude: Option<Matcher>,
}

impl StoryFilter {
    /// Compile both filters
    ///
    /// # Errors
    /// Returns the regex error of an invalid filter pattern
    pub fn new(include: Option<&ExportFilter>, exclude: Option<&ExportFilter>) -> Result<Self, regex::Error> {
        Ok(Self {
            include: include.map(ExportFilter::compile).transpose()?,
            exclude: exclude.map(ExportFilter::compile).transpose()?,
        })
    }

    /// Decide whether an export produces a story
    #[must_use]
    pub fn is_story(&self, key: &str) -> bool {
        key != ES_MODULE_MARKER
            && self.include.as_ref().map_or(true, |include| include.matches(key))
            && !self.exclude.as_ref().is_some_and(|exclude| exclude.matches(key))
    }
}

/// Decide whether an export produces a story
///
/// # Errors
/// Returns the regex error of an invalid filter pattern
pub fn is_export_story(
    key: &str,
    include: Option<&ExportFilter>,
    exclude: Option<&ExportFilter>,
) -> Result<bool, regex::Error> {
    Ok(StoryFilter::new(include, exclude)?.is_story(key))
}

/// Combine tag layers, outermost first
///
/// A `!tag` in any layer removes `tag` from the result. The result keeps the
/// first occurrence of each tag.
#[must_use]
pub fn combine_tags(layers: &[&[String]]) -> Vec<String> {
    let all = layers.iter().flat_map(|layer| layer.iter());
    let removed: Vec<&str> = all
        .clone()
        .filter_map(|tag| tag.strip_prefix('!'))
        .collect();

    let mut combined: Vec<String> = Vec::new();
    for tag in all {
        if tag.starts_with('!') || removed.contains(&tag.as_str()) || combined.contains(tag) {
            continue;
        }
        combined.push(tag.clone());
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn sanitize_collapses_punctuation() {
        assert_eq!(sanitize("Button"), "button");
        assert_eq!(sanitize("Example/Button Group"), "example-button-group");
        assert_eq!(sanitize("  --Hello,  World!--  "), "hello-world");
        assert_eq!(sanitize("a_b.c"), "a-b-c");
        assert_eq!(sanitize("!!!"), "");
    }

    #[test]
    fn to_id_joins_parts() {
        assert_eq!(to_id("Button", "Primary").unwrap(), "button--primary");
        assert_eq!(to_id("Forms/Input", "With Label").unwrap(), "forms-input--with-label");
    }

    #[test]
    fn to_id_rejects_empty_parts() {
        assert!(matches!(
            to_id("???", "Primary"),
            Err(IndexError::InvalidIdentifier { kind: "component", .. })
        ));
        assert!(matches!(
            to_id("Button", "--"),
            Err(IndexError::InvalidIdentifier { kind: "name", .. })
        ));
    }

    #[test]
    fn export_names_are_start_cased() {
        assert_eq!(story_name_from_export("Primary"), "Primary");
        assert_eq!(story_name_from_export("PrimaryButton"), "Primary Button");
        assert_eq!(story_name_from_export("primary_button"), "Primary Button");
        assert_eq!(story_name_from_export("WithIcon2"), "With Icon 2");
        assert_eq!(story_name_from_export("someXMLThing"), "Some XML Thing");
    }

    #[test]
    fn export_filters() {
        let include = ExportFilter::List(tags(&["Primary", "Secondary"]));
        let exclude = ExportFilter::Pattern("^Secondary$".into());

        assert!(is_export_story("Primary", Some(&include), Some(&exclude)).unwrap());
        assert!(!is_export_story("Secondary", Some(&include), Some(&exclude)).unwrap());
        assert!(!is_export_story("Other", Some(&include), None).unwrap());
        assert!(!is_export_story(ES_MODULE_MARKER, None, None).unwrap());
        assert!(is_export_story("Any", None, None).unwrap());
    }

    #[test]
    fn compiled_filter_is_reusable() {
        let filter = StoryFilter::new(None, Some(&ExportFilter::Pattern("Data$".into()))).unwrap();

        assert!(filter.is_story("Primary"));
        assert!(!filter.is_story("mockData"));
        assert!(!filter.is_story(ES_MODULE_MARKER));
        assert!(StoryFilter::default().is_story("Any"));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        let bad = ExportFilter::Pattern("(".into());
        assert!(is_export_story("Primary", Some(&bad), None).is_err());
    }

    #[test]
    fn combine_tags_applies_removals_across_layers() {
        let project = tags(&["dev", "test"]);
        let meta = tags(&["autodocs", "!test"]);
        let story = tags(&["!autodocs", "new", "dev"]);

        assert_eq!(combine_tags(&[&project, &meta, &story]), tags(&["dev", "new"]));
    }
}
