//! Per-story args state
//!
//! [`ArgsStore`] is the single owner of every rendered story's initial and
//! current args. All mutation goes through its methods; readers get shared
//! references.

use crate::arg_types::ArgTypes;
use crate::delta::{self, ArgsPatch, Change, Delta};
use crate::error::ArgsError;
use crate::validation;
use crate::value::{ArgValue, Args};
use indexmap::IndexMap;
use std::collections::HashMap;

/// What the store needs to know about a story
pub trait StoryArgs {
    /// Story id
    fn id(&self) -> &str;

    /// Args declared by the story's static metadata
    fn initial_args(&self) -> &Args;

    /// Declared arg types
    fn arg_types(&self) -> &ArgTypes;
}

/// Shallow update for a single arg
#[derive(Debug, Clone, PartialEq)]
pub enum ArgUpdate {
    /// Set the arg
    Set(ArgValue),

    /// Remove the arg
    Unset,
}

impl ArgUpdate {
    /// Set update from anything convertible to a value
    #[inline]
    #[must_use]
    pub fn set(value: impl Into<ArgValue>) -> Self {
        Self::Set(value.into())
    }
}

/// Shallow update for several args
pub type ArgsUpdate = IndexMap<String, ArgUpdate>;

/// Initial and current args for one story
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ArgsState {
    /// Args as declared at last observation
    pub initial: Args,

    /// Live args, including user edits
    pub current: Args,
}

/// Args store
#[derive(Debug, Default)]
pub struct ArgsStore {
    states: HashMap<String, ArgsState>,
}

impl ArgsStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if the story has been seeded
    #[inline]
    #[must_use]
    pub fn has(&self, story_id: &str) -> bool {
        self.states.contains_key(story_id)
    }

    /// Current args
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn get(&self, story_id: &str) -> Result<&Args, ArgsError> {
        self.state(story_id).map(|s| &s.current)
    }

    /// Initial args
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn get_initial(&self, story_id: &str) -> Result<&Args, ArgsError> {
        self.state(story_id).map(|s| &s.initial)
    }

    /// Full state
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn state(&self, story_id: &str) -> Result<&ArgsState, ArgsError> {
        self.states
            .get(story_id)
            .ok_or_else(|| ArgsError::NotRendered(story_id.to_string()))
    }

    /// Record an observation of the story's definition
    ///
    /// On first observation both maps are seeded. When the declared args
    /// changed since the last observation, the user's edits relative to the
    /// old initial args are replayed onto the new ones.
    pub fn set_initial<S: StoryArgs + ?Sized>(&mut self, story: &S) {
        let id = story.id();
        let Some(state) = self.states.get_mut(id) else {
            self.states.insert(
                id.to_string(),
                ArgsState {
                    initial: story.initial_args().clone(),
                    current: story.initial_args().clone(),
                },
            );
            return;
        };

        if state.initial == *story.initial_args() {
            return;
        }

        let edits = delta::diff(&state.initial, &state.current);
        state.initial = story.initial_args().clone();
        state.current = story.initial_args().clone();

        if let Delta::Patch(patch) = edits {
            tracing::debug!(story = id, edits = patch.len(), "replaying arg edits onto reloaded story");
            self.apply_validated(story, &patch);
        }
    }

    /// Validate `patch` against the story's arg types and apply it
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn update_from_delta<S: StoryArgs + ?Sized>(
        &mut self,
        story: &S,
        patch: &ArgsPatch,
    ) -> Result<&Args, ArgsError> {
        if !self.has(story.id()) {
            return Err(ArgsError::NotRendered(story.id().to_string()));
        }
        self.apply_validated(story, patch);
        self.get(story.id())
    }

    /// Apply persisted raw values (URL, saved session)
    ///
    /// Values are coerced to declared types first.
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn update_from_persisted<S: StoryArgs + ?Sized>(
        &mut self,
        story: &S,
        persisted: &Args,
    ) -> Result<&Args, ArgsError> {
        let mapped = validation::map_to_declared_types(persisted, story.arg_types());
        self.update_from_delta(story, &Change::set_all(&mapped))
    }

    /// Shallow-merge an update into current args
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn update(&mut self, story_id: &str, update: &ArgsUpdate) -> Result<&Args, ArgsError> {
        let state = self
            .states
            .get_mut(story_id)
            .ok_or_else(|| ArgsError::NotRendered(story_id.to_string()))?;

        for (key, change) in update {
            match change {
                ArgUpdate::Set(value) => {
                    state.current.insert(key.clone(), value.clone());
                }
                ArgUpdate::Unset => {
                    state.current.shift_remove(key);
                }
            }
        }
        Ok(&state.current)
    }

    /// Shallow-merge an update, dropping set values the story's arg types
    /// reject
    ///
    /// Unsets always apply.
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn update_validated<S: StoryArgs + ?Sized>(
        &mut self,
        story: &S,
        update: &ArgsUpdate,
    ) -> Result<&Args, ArgsError> {
        let sets: ArgsPatch = update
            .iter()
            .filter_map(|(key, change)| match change {
                ArgUpdate::Set(value) => Some((key.clone(), Change::Set(value.clone()))),
                ArgUpdate::Unset => None,
            })
            .collect();
        let legal = validation::validate(&sets, story.arg_types());

        let checked: ArgsUpdate = update
            .iter()
            .filter(|(key, change)| matches!(change, ArgUpdate::Unset) || legal.contains_key(key.as_str()))
            .map(|(key, change)| (key.clone(), change.clone()))
            .collect();
        self.update(story.id(), &checked)
    }

    /// Restore initial values, for all args or only `keys`
    ///
    /// # Errors
    /// Returns [`ArgsError::NotRendered`] if the story was never seeded
    pub fn reset(&mut self, story_id: &str, keys: Option<&[String]>) -> Result<&Args, ArgsError> {
        let state = self
            .states
            .get_mut(story_id)
            .ok_or_else(|| ArgsError::NotRendered(story_id.to_string()))?;

        match keys {
            None => state.current = state.initial.clone(),
            Some(keys) => {
                for key in keys {
                    match state.initial.get(key) {
                        Some(value) => {
                            state.current.insert(key.clone(), value.clone());
                        }
                        None => {
                            state.current.shift_remove(key);
                        }
                    }
                }
            }
        }
        Ok(&state.current)
    }

    /// Drop a story's state
    pub fn remove(&mut self, story_id: &str) -> Option<ArgsState> {
        self.states.remove(story_id)
    }

    /// Ids of all seeded stories
    pub fn story_ids(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Number of seeded stories
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Check if store is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn apply_validated<S: StoryArgs + ?Sized>(&mut self, story: &S, patch: &ArgsPatch) {
        let validated = validation::validate(patch, story.arg_types());
        if let Some(state) = self.states.get_mut(story.id()) {
            state.current = delta::apply_patch(&state.current, &validated);
        }
    }
}

/// Minimal [`StoryArgs`] implementation
#[derive(Debug, Clone, Default)]
pub struct StoryArgsDef {
    /// Story id
    pub id: String,
    /// Declared args
    pub initial_args: Args,
    /// Declared arg types
    pub arg_types: ArgTypes,
}

impl StoryArgsDef {
    /// Create definition without arg types
    #[must_use]
    pub fn new(id: impl Into<String>, initial_args: Args) -> Self {
        Self {
            id: id.into(),
            initial_args,
            arg_types: ArgTypes::new(),
        }
    }

    /// With arg types
    #[must_use]
    pub fn with_arg_types(mut self, arg_types: ArgTypes) -> Self {
        self.arg_types = arg_types;
        self
    }
}

impl StoryArgs for StoryArgsDef {
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
