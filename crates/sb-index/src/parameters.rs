//! Parameter merging

use crate::descriptor::Parameters;
use serde_json::Value as JsonValue;

/// Deep-merge `overlay` into `base`
///
/// Objects merge per key; any other value (arrays included) replaces.
pub fn deep_merge(base: &mut Parameters, overlay: &Parameters) {
    for (key, value) in overlay {
        if let (Some(JsonValue::Object(existing)), JsonValue::Object(incoming)) =
            (base.get_mut(key), value)
        {
            deep_merge(existing, incoming);
            continue;
        }
        base.insert(key.clone(), value.clone());
    }
}

/// Merge layers, outermost first
#[must_use]
pub fn merge_layers<'a>(layers: impl IntoIterator<Item = &'a Parameters>) -> Parameters {
    let mut merged = Parameters::new();
    for layer in layers {
        deep_merge(&mut merged, layer);
    }
    merged
}
