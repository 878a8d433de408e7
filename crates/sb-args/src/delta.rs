//! Structural deltas between arg sets
//!
//! Provides [`diff`] and [`combine`]: a delta records what changed between
//! two [`Args`] so the same relative edits can be replayed onto a different
//! base (user edits surviving a story reload).
//!
//! NOT text patches - a delta mirrors the shape of the args it was computed
//! from. Mappings recurse per key, sequences per index.

use crate::value::{ArgValue, Args};
use indexmap::IndexMap;

/// Result of comparing two arg sets
#[derive(Debug, Clone, PartialEq)]
pub enum Delta {
    /// Nothing differs
    DeeplyEqual,

    /// At least one key differs
    Patch(ArgsPatch),
}

impl Delta {
    /// Check for the deeply-equal sentinel
    #[inline]
    #[must_use]
    pub fn is_deeply_equal(&self) -> bool {
        matches!(self, Self::DeeplyEqual)
    }

    /// Patch content, if any
    #[inline]
    #[must_use]
    pub fn as_patch(&self) -> Option<&ArgsPatch> {
        match self {
            Self::DeeplyEqual => None,
            Self::Patch(patch) => Some(patch),
        }
    }

    /// Consume into a patch; the sentinel becomes an empty patch
    #[inline]
    #[must_use]
    pub fn into_patch(self) -> ArgsPatch {
        match self {
            Self::DeeplyEqual => ArgsPatch::new(),
            Self::Patch(patch) => patch,
        }
    }
}

impl From<ArgsPatch> for Delta {
    fn from(patch: ArgsPatch) -> Self {
        if patch.is_empty() {
            Self::DeeplyEqual
        } else {
            Self::Patch(patch)
        }
    }
}

/// Per-key changes, in key order
pub type ArgsPatch = IndexMap<String, Change>;

/// Change to a single value
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Replace with this value
    Set(ArgValue),

    /// Remove the value
    Unset,

    /// Patch the fields of a mapping
    Mapping(ArgsPatch),

    /// Patch a sequence index by index
    Sequence(Vec<Slot>),
}

/// One index of a sequence patch
///
/// `Keep` is a hole: the base element at that index is used unchanged. It is
/// distinct from `Patch(Change::Unset)`, which removes the element.
#[derive(Debug, Clone, PartialEq)]
pub enum Slot {
    /// Base element unchanged
    Keep,

    /// Base element changed
    Patch(Change),
}

impl Change {
    /// Build a patch that sets every value in `args`
    #[must_use]
    pub fn set_all(args: &Args) -> ArgsPatch {
        args.iter()
            .map(|(k, v)| (k.clone(), Self::Set(v.clone())))
            .collect()
    }
}

/// Compute the delta turning `old` into `new`
#[must_use]
pub fn diff(old: &Args, new: &Args) -> Delta {
    Delta::from(diff_mapping(old, new))
}

/// Apply `delta` over `base`
#[must_use]
pub fn combine(base: &Args, delta: &Delta) -> Args {
    match delta {
        Delta::DeeplyEqual => base.clone(),
        Delta::Patch(patch) => apply_patch(base, patch),
    }
}

/// Apply `patch` over `base`
///
/// Keys already present keep their position; new keys are appended.
#[must_use]
pub fn apply_patch(base: &Args, patch: &ArgsPatch) -> Args {
    let mut result = base.clone();
    for (key, change) in patch {
        match apply_change(result.get(key), change) {
            Some(value) => {
                result.insert(key.clone(), value);
            }
            None => {
                result.shift_remove(key);
            }
        }
    }
    result
}

fn diff_mapping(old: &Args, new: &Args) -> ArgsPatch {
    let mut patch = ArgsPatch::new();
    let keys = old.keys().chain(new.keys().filter(|k| !old.contains_key(*k)));
    for key in keys {
        if let Some(change) = diff_value(old.get(key), new.get(key)) {
            patch.insert(key.clone(), change);
        }
    }
    patch
}

fn diff_value(old: Option<&ArgValue>, new: Option<&ArgValue>) -> Option<Change> {
    match (old, new) {
        (None, None) => None,
        (Some(_), None) => Some(Change::Unset),
        (None, Some(new)) => Some(Change::Set(new.clone())),
        (Some(old), Some(new)) if old == new => None,
        (Some(ArgValue::Mapping(old)), Some(ArgValue::Mapping(new))) => {
            Some(Change::Mapping(diff_mapping(old, new)))
        }
        (Some(ArgValue::Sequence(old)), Some(ArgValue::Sequence(new))) => {
            Some(Change::Sequence(diff_sequence(old, new)))
        }
        (Some(_), Some(new)) => Some(Change::Set(new.clone())),
    }
}

fn diff_sequence(old: &[ArgValue], new: &[ArgValue]) -> Vec<Slot> {
    let len = old.len().max(new.len());
    let mut slots: Vec<Slot> = (0..len)
        .map(|i| match diff_value(old.get(i), new.get(i)) {
            Some(change) => Slot::Patch(change),
            None => Slot::Keep,
        })
        .collect();

    // trailing holes carry no information
    while matches!(slots.last(), Some(Slot::Keep)) {
        slots.pop();
    }
    slots
}

fn apply_change(base: Option<&ArgValue>, change: &Change) -> Option<ArgValue> {
    match change {
        Change::Set(value) => Some(value.clone()),
        Change::Unset => None,
        Change::Mapping(patch) => {
            let empty = Args::new();
            let fields = base.and_then(ArgValue::as_mapping).unwrap_or(&empty);
            Some(ArgValue::Mapping(apply_patch(fields, patch)))
        }
        Change::Sequence(slots) => {
            let items = base.and_then(ArgValue::as_sequence).unwrap_or(&[]);
            let len = items.len().max(slots.len());
            let combined = (0..len)
                .filter_map(|i| match slots.get(i) {
                    None | Some(Slot::Keep) => items.get(i).cloned(),
                    Some(Slot::Patch(change)) => apply_change(items.get(i), change),
                })
                .collect();
            Some(ArgValue::Sequence(combined))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::args_from_json;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(value: serde_json::Value) -> Args {
        args_from_json(value)
    }

    #[test]
    fn diff_of_equal_args_is_sentinel() {
        let a = args(json!({"x": 1, "nested": {"y": [1, 2]}}));
        assert_eq!(diff(&a, &a), Delta::DeeplyEqual);
    }

    #[test]
    fn diff_of_nan_args_is_sentinel() {
        let mut a = Args::new();
        a.insert("x".into(), ArgValue::from(f64::NAN));
        a.insert("seq".into(), ArgValue::Sequence(vec![ArgValue::Number(f64::NAN)]));
        assert_eq!(diff(&a, &a.clone()), Delta::DeeplyEqual);
    }

    #[test]
    fn diff_records_replacements_and_unsets() {
        let old = args(json!({"x": 1, "gone": true}));
        let new = args(json!({"x": 2, "added": "yes"}));

        let patch = diff(&old, &new).into_patch();
        assert_eq!(patch["x"], Change::Set(ArgValue::from(2)));
        assert_eq!(patch["gone"], Change::Unset);
        assert_eq!(patch["added"], Change::Set(ArgValue::from("yes")));
    }

    #[test]
    fn diff_recurses_into_mappings() {
        let old = args(json!({"style": {"color": "red", "size": 1}}));
        let new = args(json!({"style": {"color": "blue", "size": 1}}));

        let patch = diff(&old, &new).into_patch();
        let Change::Mapping(inner) = &patch["style"] else {
            panic!("expected nested patch");
        };
        assert_eq!(inner.len(), 1);
        assert_eq!(inner["color"], Change::Set(ArgValue::from("blue")));
    }

    #[test]
    fn diff_sequences_are_sparse() {
        let old = args(json!({"list": [1, 2, 3]}));
        let new = args(json!({"list": [1, 5, 3]}));

        let patch = diff(&old, &new).into_patch();
        assert_eq!(
            patch["list"],
            Change::Sequence(vec![Slot::Keep, Slot::Patch(Change::Set(ArgValue::from(5)))])
        );
    }

    #[test]
    fn type_change_is_full_replacement() {
        let old = args(json!({"v": {"a": 1}}));
        let new = args(json!({"v": [1]}));

        let patch = diff(&old, &new).into_patch();
        assert_eq!(patch["v"], Change::Set(ArgValue::from(vec![ArgValue::from(1)])));
    }

    #[test]
    fn combine_applies_unset_as_deletion() {
        let base = args(json!({"x": 1, "y": 2}));
        let mut patch = ArgsPatch::new();
        patch.insert("x".into(), Change::Unset);

        let merged = combine(&base, &Delta::Patch(patch));
        assert_eq!(merged, args(json!({"y": 2})));
    }

    #[test]
    fn combine_holes_fall_back_to_base() {
        let base = args(json!({"list": ["a", "b", "c"]}));
        let mut patch = ArgsPatch::new();
        patch.insert(
            "list".into(),
            Change::Sequence(vec![Slot::Keep, Slot::Patch(Change::Set("B".into()))]),
        );

        let merged = combine(&base, &Delta::Patch(patch));
        assert_eq!(merged, args(json!({"list": ["a", "B", "c"]})));
    }

    #[test]
    fn combine_shrinks_sequences() {
        let old = args(json!({"list": [1, 2, 3]}));
        let new = args(json!({"list": [1]}));

        assert_eq!(combine(&old, &diff(&old, &new)), new);
    }

    #[test]
    fn replays_edit_onto_new_base() {
        let old_initial = args(json!({"x": 1, "label": "a"}));
        let old_current = args(json!({"x": 2, "label": "a"}));
        let new_initial = args(json!({"x": 5, "label": "b"}));

        let delta = diff(&old_initial, &old_current);
        let replayed = combine(&new_initial, &delta);
        assert_eq!(replayed, args(json!({"x": 2, "label": "b"})));
    }

    #[test]
    fn nested_patch_onto_scalar_base_builds_container() {
        let base = args(json!({"style": "none"}));
        let mut inner = ArgsPatch::new();
        inner.insert("color".into(), Change::Set("red".into()));
        let mut patch = ArgsPatch::new();
        patch.insert("style".into(), Change::Mapping(inner));

        let merged = apply_patch(&base, &patch);
        assert_eq!(merged, args(json!({"style": {"color": "red"}})));
    }
}
