//! Story index builder
//!
//! Turns story file descriptors into one [`StoryIndex`]:
//!
//! 1. CSF files produce story entries, plus an autodocs entry when the
//!    autodocs policy selects them
//! 2. MDX files produce docs entries, resolving `of` against CSF files
//! 3. Duplicates are resolved across files, keeping the first-seen position
//!
//! Per-file failures are collected; a broken file never blocks the rest of
//! the index.

use crate::config::{AutodocsMode, IndexSort, IndexerConfig};
use crate::descriptor::{CsfFile, MdxFile, Parameters, StoryFileDescriptor};
use crate::error::IndexError;
use crate::index::{EntryType, StoryIndex, StoryIndexEntry, INDEX_VERSION};
use crate::naming::{combine_tags, sanitize, story_name_from_export, to_id, StoryFilter};
use crate::parameters::merge_layers;
use crate::title::{auto_title_from_specifier, normalize_title};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Tag requesting an autodocs entry
pub const AUTODOCS_TAG: &str = "autodocs";

/// Tag carried by every docs entry
pub const DOCS_TAG: &str = "docs";

/// Tag of MDX pages documenting a CSF file
pub const ATTACHED_MDX_TAG: &str = "attached-mdx";

/// Tag of standalone MDX pages
pub const UNATTACHED_MDX_TAG: &str = "unattached-mdx";

/// Result of a build
#[derive(Debug, Clone, Default)]
pub struct IndexBuild {
    /// Built index
    pub index: StoryIndex,

    /// Per-file errors and duplicate diagnostics
    pub errors: Vec<IndexError>,
}

impl IndexBuild {
    /// Check if the build produced no errors
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors attributed to `import_path`
    pub fn errors_for<'a>(&'a self, import_path: &'a str) -> impl Iterator<Item = &'a IndexError> {
        self.errors
            .iter()
            .filter(move |e| e.import_path() == Some(import_path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Story,
    Autodocs { explicit: bool },
    Mdx,
}

#[derive(Debug, Clone)]
struct Candidate {
    entry: StoryIndexEntry,
    origin: Origin,
}

/// What MDX pages need from the CSF file they document
#[derive(Debug, Clone)]
struct CsfSummary {
    title: String,
    component: String,
    meta_tags: Vec<String>,
}

/// Incremental index builder
///
/// Files are kept in discovery order. Re-adding a file replaces it in place;
/// invalidating removes it.
#[derive(Debug, Default)]
pub struct IndexBuilder {
    config: IndexerConfig,
    files: IndexMap<String, StoryFileDescriptor>,
}

impl IndexBuilder {
    /// Create builder
    #[must_use]
    pub fn new(config: IndexerConfig) -> Self {
        Self {
            config,
            files: IndexMap::new(),
        }
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    /// Add or replace a file; returns `true` if it replaced one
    pub fn add_file(&mut self, file: impl Into<StoryFileDescriptor>) -> bool {
        let file = file.into();
        let replaced = self
            .files
            .insert(file.import_path().to_string(), file)
            .is_some();
        tracing::debug!(replaced, files = self.files.len(), "story file added");
        replaced
    }

    /// Add several files in order
    pub fn add_files<I>(&mut self, files: I)
    where
        I: IntoIterator,
        I::Item: Into<StoryFileDescriptor>,
    {
        for file in files {
            self.add_file(file);
        }
    }

    /// Forget a file; returns `true` if it was known
    pub fn invalidate(&mut self, import_path: &str) -> bool {
        self.files.shift_remove(import_path).is_some()
    }

    /// Number of known files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if no files are known
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Build the index from the current files
    #[must_use]
    pub fn build(&self) -> IndexBuild {
        let mut errors = Vec::new();

        // CSF first, so MDX `of` resolves regardless of discovery order
        let mut summaries: HashMap<&str, CsfSummary> = HashMap::new();
        let mut csf_results: HashMap<&str, Result<Vec<Candidate>, IndexError>> = HashMap::new();
        for file in self.files.values() {
            if let StoryFileDescriptor::Csf(csf) = file {
                let result = self.index_csf(csf).map(|(summary, candidates)| {
                    summaries.insert(&csf.import_path, summary);
                    candidates
                });
                csf_results.insert(&csf.import_path, result);
            }
        }

        let mut merged: IndexMap<String, Candidate> = IndexMap::new();
        for file in self.files.values() {
            let result = match file {
                StoryFileDescriptor::Csf(csf) => csf_results
                    .remove(csf.import_path.as_str())
                    .unwrap_or_else(|| Ok(Vec::new())),
                StoryFileDescriptor::Mdx(mdx) => self.index_mdx(mdx, &summaries),
            };
            let candidates = match result.and_then(|c| check_file_duplicates(file.import_path(), c)) {
                Ok(candidates) => candidates,
                Err(err) => {
                    tracing::warn!(import_path = file.import_path(), %err, "story file skipped");
                    errors.push(err);
                    continue;
                }
            };

            for candidate in candidates {
                match merged.get_mut(&candidate.entry.id) {
                    Some(existing) => {
                        if let Some(diagnostic) = resolve_duplicate(existing, candidate, self.config.autodocs) {
                            tracing::warn!(%diagnostic, "duplicate story index id");
                            errors.push(diagnostic);
                        }
                    }
                    None => {
                        merged.insert(candidate.entry.id.clone(), candidate);
                    }
                }
            }
        }

        aggregate_autodocs_imports(&mut merged);

        if self.config.sort == IndexSort::Alphabetical {
            merged.sort_by(|_, a, _, b| a.entry.title.cmp(&b.entry.title));
        }

        let index = StoryIndex {
            version: INDEX_VERSION,
            entries: merged
                .into_iter()
                .map(|(id, candidate)| (id, candidate.entry))
                .collect(),
        };
        tracing::info!(
            files = self.files.len(),
            entries = index.len(),
            errors = errors.len(),
            "story index built"
        );
        IndexBuild { index, errors }
    }

    fn index_csf(&self, csf: &CsfFile) -> Result<(CsfSummary, Vec<Candidate>), IndexError> {
        let path = csf.import_path.as_str();
        let meta = csf
            .meta
            .as_ref()
            .ok_or_else(|| IndexError::malformed(path, "missing default export (meta)"))?;

        let title = self.resolve_title(path, meta.title.as_deref())?;
        let component = meta.id.clone().unwrap_or_else(|| title.clone());
        let meta_tags = combine_tags(&[&self.config.default_tags, &meta.tags]);
        let mut autodocs_tagged = has_tag(&meta_tags, AUTODOCS_TAG);

        let filter = StoryFilter::new(meta.include_stories.as_ref(), meta.exclude_stories.as_ref())
            .map_err(|e| IndexError::malformed(path, format!("invalid story filter: {e}")))?;

        let mut candidates = Vec::new();
        for story in &csf.stories {
            if !filter.is_story(&story.export_name) {
                continue;
            }

            let name = story
                .name
                .clone()
                .unwrap_or_else(|| story_name_from_export(&story.export_name));
            let id = to_id(&component, &name).map_err(|e| IndexError::malformed(path, e.to_string()))?;
            let tags = combine_tags(&[&self.config.default_tags, &meta.tags, &story.tags]);
            autodocs_tagged |= has_tag(&tags, AUTODOCS_TAG);

            candidates.push(Candidate {
                entry: StoryIndexEntry {
                    id,
                    title: title.to_lowercase(),
                    authored_title: authored_title(&title),
                    name,
                    import_path: path.to_string(),
                    entry_type: EntryType::Story,
                    tags,
                    export_name: Some(story.export_name.clone()),
                    stories_imports: Vec::new(),
                    parameters: merge_layers([&meta.parameters, &story.parameters]),
                },
                origin: Origin::Story,
            });
        }

        let autodocs = match self.config.autodocs {
            AutodocsMode::Off => None,
            AutodocsMode::On => Some(false),
            AutodocsMode::Tag => autodocs_tagged.then_some(true),
        };
        if let (Some(explicit), false) = (autodocs, candidates.is_empty()) {
            let name = self.config.docs_name.clone();
            let id = to_id(&component, &name).map_err(|e| IndexError::malformed(path, e.to_string()))?;
            let markers = [DOCS_TAG.to_string(), AUTODOCS_TAG.to_string()];
            candidates.push(Candidate {
                entry: StoryIndexEntry {
                    id,
                    title: title.to_lowercase(),
                    authored_title: authored_title(&title),
                    name,
                    import_path: path.to_string(),
                    entry_type: EntryType::Docs,
                    tags: combine_tags(&[&meta_tags, &markers]),
                    export_name: None,
                    stories_imports: vec![path.to_string()],
                    parameters: meta.parameters.clone(),
                },
                origin: Origin::Autodocs { explicit },
            });
        }

        tracing::debug!(import_path = path, title = %title, entries = candidates.len(), "indexed csf file");
        let summary = CsfSummary {
            title,
            component,
            meta_tags,
        };
        Ok((summary, candidates))
    }

    fn index_mdx(
        &self,
        mdx: &MdxFile,
        summaries: &HashMap<&str, CsfSummary>,
    ) -> Result<Vec<Candidate>, IndexError> {
        let path = mdx.import_path.as_str();
        let attached = match mdx.of.as_deref() {
            Some(of) => Some((
                of,
                summaries.get(of).ok_or_else(|| {
                    IndexError::malformed(path, format!("could not resolve 'of' import '{of}'"))
                })?,
            )),
            None => None,
        };

        let (title, component) = match (mdx.title.as_deref(), attached) {
            (Some(explicit), _) => {
                let title = self.resolve_title(path, Some(explicit))?;
                (title.clone(), title)
            }
            (None, Some((_, csf))) => (csf.title.clone(), csf.component.clone()),
            (None, None) => {
                let title = self.resolve_title(path, None)?;
                (title.clone(), title)
            }
        };
        let name = mdx.name.clone().unwrap_or_else(|| self.config.docs_name.clone());
        let id = to_id(&component, &name).map_err(|e| IndexError::malformed(path, e.to_string()))?;

        let marker = if attached.is_some() {
            ATTACHED_MDX_TAG
        } else {
            UNATTACHED_MDX_TAG
        };
        let markers = [DOCS_TAG.to_string(), marker.to_string()];
        let base_tags = attached.map_or(&self.config.default_tags, |(_, csf)| &csf.meta_tags);
        let tags = combine_tags(&[base_tags, &mdx.tags, &markers]);

        let mut stories_imports: Vec<String> = Vec::new();
        let imports = attached
            .map(|(of, _)| of)
            .into_iter()
            .chain(mdx.stories_imports.iter().map(String::as_str));
        for import in imports {
            if !stories_imports.iter().any(|i| i == import) {
                stories_imports.push(import.to_string());
            }
        }

        Ok(vec![Candidate {
            entry: StoryIndexEntry {
                id,
                title: title.to_lowercase(),
                authored_title: authored_title(&title),
                name,
                import_path: path.to_string(),
                entry_type: EntryType::Docs,
                tags,
                export_name: None,
                stories_imports,
                parameters: Parameters::new(),
            },
            origin: Origin::Mdx,
        }])
    }

    fn resolve_title(&self, path: &str, explicit: Option<&str>) -> Result<String, IndexError> {
        let specifier = self.config.specifier_for(path);
        let title = match (explicit, specifier) {
            (Some(title), Some(specifier)) => specifier.prefix_title(title),
            (Some(title), None) => title.to_string(),
            (None, Some(specifier)) => auto_title_from_specifier(path, &specifier)
                .ok_or_else(|| IndexError::malformed(path, "could not derive a title from the import path"))?,
            (None, None) => {
                return Err(IndexError::malformed(
                    path,
                    "no title and no stories specifier covers the import path",
                ))
            }
        };

        let title = normalize_title(&title, self.config.hierarchy_separator.as_deref());
        if sanitize(&title).is_empty() {
            return Err(IndexError::malformed(
                path,
                format!("title '{title}' has no alphanumeric characters"),
            ));
        }
        Ok(title)
    }
}

/// Build an index in one call
#[must_use]
pub fn build_index<I>(config: IndexerConfig, files: I) -> IndexBuild
where
    I: IntoIterator,
    I::Item: Into<StoryFileDescriptor>,
{
    let mut builder = IndexBuilder::new(config);
    builder.add_files(files);
    builder.build()
}

fn authored_title(title: &str) -> Option<String> {
    (title.to_lowercase() != title).then(|| title.to_string())
}

fn has_tag(tags: &[String], tag: &str) -> bool {
    tags.iter().any(|t| t == tag)
}

/// Autodocs pages list every file contributing a story with their title
fn aggregate_autodocs_imports(merged: &mut IndexMap<String, Candidate>) {
    let mut by_title: HashMap<String, Vec<String>> = HashMap::new();
    for candidate in merged.values().filter(|c| c.origin == Origin::Story) {
        let imports = by_title.entry(candidate.entry.title.clone()).or_default();
        if !imports.contains(&candidate.entry.import_path) {
            imports.push(candidate.entry.import_path.clone());
        }
    }

    for candidate in merged.values_mut() {
        if !matches!(candidate.origin, Origin::Autodocs { .. }) {
            continue;
        }
        let Some(imports) = by_title.get(&candidate.entry.title) else {
            continue;
        };
        for import in imports {
            if !candidate.entry.stories_imports.contains(import) {
                candidate.entry.stories_imports.push(import.clone());
            }
        }
    }
}

fn check_file_duplicates(path: &str, candidates: Vec<Candidate>) -> Result<Vec<Candidate>, IndexError> {
    {
        let mut seen: HashMap<&str, &StoryIndexEntry> = HashMap::new();
        for candidate in &candidates {
            let entry = &candidate.entry;
            if let Some(first) = seen.insert(&entry.id, entry) {
                let message = if candidate.origin == Origin::Story {
                    format!("stories '{}' and '{}' resolve to the same id", first.name, entry.name)
                } else {
                    format!(
                        "story '{}' has the same name as the docs entry; rename it or change the docs name",
                        first.name
                    )
                };
                return Err(IndexError::DuplicateId {
                    id: entry.id.clone(),
                    import_paths: vec![path.to_string()],
                    message,
                });
            }
        }
    }
    Ok(candidates)
}

fn resolve_duplicate(existing: &mut Candidate, incoming: Candidate, mode: AutodocsMode) -> Option<IndexError> {
    let id = incoming.entry.id.clone();
    let import_paths = vec![
        existing.entry.import_path.clone(),
        incoming.entry.import_path.clone(),
    ];
    let diagnostic = |message: &str| IndexError::DuplicateId {
        id,
        import_paths,
        message: message.to_string(),
    };

    match (existing.origin, incoming.origin) {
        (Origin::Story, Origin::Story) => Some(diagnostic("duplicate story id, keeping the first")),
        (Origin::Story, _) => Some(diagnostic("docs entry collides with a story, keeping the story")),
        (_, Origin::Story) => {
            *existing = incoming;
            Some(diagnostic("story collides with a docs entry, keeping the story"))
        }
        (Origin::Autodocs { .. }, Origin::Autodocs { .. }) => {
            for import in incoming.entry.stories_imports {
                if !existing.entry.stories_imports.contains(&import) {
                    existing.entry.stories_imports.push(import);
                }
            }
            None
        }
        (Origin::Mdx, Origin::Autodocs { explicit }) => (explicit && mode != AutodocsMode::On)
            .then(|| diagnostic("MDX docs entry supersedes the autodocs entry")),
        (Origin::Autodocs { explicit }, Origin::Mdx) => {
            *existing = incoming;
            (explicit && mode != AutodocsMode::On)
                .then(|| diagnostic("MDX docs entry supersedes the autodocs entry"))
        }
        (Origin::Mdx, Origin::Mdx) => Some(diagnostic("duplicate MDX docs id, keeping the first")),
    }
}
